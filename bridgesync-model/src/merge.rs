use crate::ids::ObjectHandle;
use crate::store::{LocalStore, StoreResult};
use std::fmt;
use std::sync::Arc;

/// Handler for [`MergePolicy::Custom`].
///
/// Receives the store, the parent object, the relationship key and the
/// resolved children. It is solely responsible for mutating the relationship.
pub type CustomMergeHandler = Arc<
    dyn Fn(&mut dyn LocalStore, ObjectHandle, &str, &[ObjectHandle]) -> StoreResult<()>
        + Send
        + Sync,
>;

/// How the children of an imported relationship combine with the existing ones.
///
/// Only meaningful for to-many relationships; a to-one relationship always
/// behaves as `Replace`.
#[derive(Clone, Default)]
pub enum MergePolicy {
    /// The relationship becomes exactly the imported children.
    #[default]
    Replace,
    /// Imported children are added after the existing ones.
    Append,
    /// Imported children are added before the existing ones. Same as
    /// `Append` on an unordered relationship.
    InsertAtBeginning,
    /// A handler performs the merge.
    Custom(CustomMergeHandler),
}

impl MergePolicy {
    /// Builds a custom policy from a closure.
    pub fn custom<F>(handler: F) -> Self
    where
        F: Fn(&mut dyn LocalStore, ObjectHandle, &str, &[ObjectHandle]) -> StoreResult<()>
            + Send
            + Sync
            + 'static,
    {
        Self::Custom(Arc::new(handler))
    }

    pub fn is_replace(&self) -> bool {
        matches!(self, Self::Replace)
    }
}

impl fmt::Debug for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => f.write_str("Replace"),
            Self::Append => f.write_str("Append"),
            Self::InsertAtBeginning => f.write_str("InsertAtBeginning"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A mechanical relationship mutation, applied by the store as-is.
///
/// The importer resolves cardinality and merge policy into one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipUpdate {
    /// Empties the relationship (to-one or to-many).
    Clear,
    /// Sets a to-one relationship.
    ToOne(Option<ObjectHandle>),
    /// Sets the members of a to-many relationship.
    Replace(Vec<ObjectHandle>),
    /// Adds members at the end of a to-many relationship.
    Append(Vec<ObjectHandle>),
    /// Adds members at the start of an ordered to-many relationship.
    Prepend(Vec<ObjectHandle>),
}
