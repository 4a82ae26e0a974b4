//! Core data model for bridgesync.
//!
//! Defines the types every other bridgesync crate depends on:
//! - identifiers ([`ObjectHandle`], [`EntityName`], [`UniquingId`])
//! - the store [`Schema`] (entities, attributes, relationships, inheritance)
//! - [`MergePolicy`] and the mechanical [`RelationshipUpdate`]
//! - the representation trees: [`MixedRepresentation`] (translated remote
//!   records) and [`GenericLocalObject`] (resolved, ready for import)
//! - [`ImportChangeSet`], the record of what an import did
//! - [`LocalStore`], the contract a local object store must fulfil

mod changes;
mod ids;
mod merge;
mod representation;
mod schema;
mod store;

pub use changes::{ImportChangeSet, ImportedObject};
pub use ids::{AttributeKey, EntityName, ObjectHandle, RelationshipKey, UniquingId};
pub use merge::{CustomMergeHandler, MergePolicy, RelationshipUpdate};
pub use representation::{
    Attributes, GenericLocalObject, MixedRelationship, MixedRepresentation, RelationshipValue,
};
pub use schema::{Cardinality, EntitySchema, RelationshipSchema, Schema};
pub use store::{LocalStore, StoreError, StoreResult};

/// Type-erased error crossing an extension point (bridge, helper, remote
/// operation).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
