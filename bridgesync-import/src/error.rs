//! Error types for translation, graph building and import.

use bridgesync_model::{BoxError, EntityName, StoreError};
use thiserror::Error;

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that can occur between remote records and store mutations.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The work was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// A record mapper failed on a record.
    #[error("record mapping failed: {0}")]
    Mapping(#[source] BoxError),

    /// An update target was given with more than one representation.
    #[error("{count} representations given to update a single object")]
    TooManyRepresentationsToUpdateObject { count: usize },

    /// The update target cannot hold the representation's entity.
    #[error("update target is a {target}, which is not a kind of {representation}")]
    EntityMismatch {
        target: EntityName,
        representation: EntityName,
    },

    /// A representation breaks the uniquing attribute rules.
    #[error("invalid {entity} representation: {reason}")]
    InvalidRepresentation { entity: EntityName, reason: String },

    /// A representation names a relationship its entity does not have.
    #[error("entity {entity} has no relationship {key}")]
    UnknownRelationship { entity: EntityName, key: String },

    /// The local store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
