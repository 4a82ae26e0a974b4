//! Store execution context and reference store for bridgesync.
//!
//! [`StoreContext`] is the serialized execution domain every store mutation
//! goes through. [`MemoryStore`] is an in-memory [`LocalStore`] with
//! save/rollback transactions and provisional identities, used by the
//! tests and by embedders that do not need persistence.
//!
//! [`LocalStore`]: bridgesync_model::LocalStore

mod context;
mod memory;

pub use bridgesync_model::{LocalStore, StoreError, StoreResult};
pub use context::StoreContext;
pub use memory::MemoryStore;
