//! The local store contract.
//!
//! bridgesync never owns persistence. Everything it needs from the store
//! (lookup by uniquing ID, object creation and deletion, attribute and
//! relationship writes, identity finalization, transactions) goes through
//! [`LocalStore`]. Serialized access is provided by the store crate's
//! `StoreContext`.

use crate::ids::{EntityName, ObjectHandle, UniquingId};
use crate::merge::RelationshipUpdate;
use crate::schema::Schema;
use std::collections::HashSet;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entity is not part of the store schema.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityName),

    /// The entity has no such attribute.
    #[error("entity {entity} has no attribute {attribute}")]
    UnknownAttribute { entity: EntityName, attribute: String },

    /// The entity has no such relationship.
    #[error("entity {entity} has no relationship {relationship}")]
    UnknownRelationship {
        entity: EntityName,
        relationship: String,
    },

    /// No live object for the handle.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectHandle),

    /// The update does not fit the relationship's cardinality.
    #[error("invalid relationship update on {relationship}: {reason}")]
    InvalidUpdate { relationship: String, reason: String },

    /// A previous holder of the store context panicked.
    #[error("store context poisoned")]
    ContextPoisoned,

    /// The blocking task running store work failed.
    #[error("store task failed: {0}")]
    Task(String),

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Everything the import pipeline needs from a local object store.
///
/// Implementations are not required to be thread-safe beyond `Send`: all
/// calls happen while holding the store context.
pub trait LocalStore: Send {
    /// The schema the store enforces.
    fn schema(&self) -> &Schema;

    /// Returns the objects of `entity` (or a sub-entity) whose `attribute`
    /// holds one of `ids`.
    fn lookup_by_uniquing_ids(
        &self,
        entity: &EntityName,
        attribute: &str,
        ids: &HashSet<UniquingId>,
    ) -> StoreResult<Vec<(UniquingId, ObjectHandle)>>;

    /// Inserts a new, empty object. Its identity is provisional until
    /// [`LocalStore::assign_permanent_identities`] or a save.
    fn create_object(&mut self, entity: &EntityName) -> StoreResult<ObjectHandle>;

    /// Deletes an object and removes it from every relationship.
    fn delete_object(&mut self, handle: ObjectHandle) -> StoreResult<()>;

    /// Whether the handle refers to a live object.
    fn contains(&self, handle: ObjectHandle) -> bool;

    /// The entity of a live object.
    fn entity_of(&self, handle: ObjectHandle) -> StoreResult<EntityName>;

    /// Reads an attribute. `None` when it was never set.
    fn attribute(&self, handle: ObjectHandle, key: &str) -> StoreResult<Option<serde_json::Value>>;

    /// Writes an attribute.
    fn set_attribute(
        &mut self,
        handle: ObjectHandle,
        key: &str,
        value: serde_json::Value,
    ) -> StoreResult<()>;

    /// Reads the members of a relationship (zero or one for to-one).
    fn related(&self, handle: ObjectHandle, key: &str) -> StoreResult<Vec<ObjectHandle>>;

    /// Applies a relationship mutation.
    fn set_relationship(
        &mut self,
        handle: ObjectHandle,
        key: &str,
        update: RelationshipUpdate,
    ) -> StoreResult<()>;

    /// Gives stable identities to objects created with a provisional one.
    fn assign_permanent_identities(&mut self, handles: &[ObjectHandle]) -> StoreResult<()>;

    /// Whether the object still carries a provisional identity.
    fn is_provisional(&self, handle: ObjectHandle) -> StoreResult<bool>;

    /// Number of live objects of `entity` and its sub-entities.
    fn count(&self, entity: &EntityName) -> StoreResult<usize>;

    /// Whether there are unsaved changes.
    fn has_changes(&self) -> bool;

    /// Commits pending changes.
    fn save(&mut self) -> StoreResult<()>;

    /// Discards pending changes.
    fn rollback(&mut self);
}
