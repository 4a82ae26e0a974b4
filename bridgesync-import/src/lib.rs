//! Remote-to-local import for bridgesync.
//!
//! Three stages, each usable on its own:
//! 1. [`translate`] maps raw remote records into [`MixedRepresentation`]
//!    trees through a bridge's [`RecordMapper`].
//! 2. [`build_graph`] resolves them into [`GenericLocalObject`] trees and
//!    collects the uniquing IDs to prefetch.
//! 3. [`UniquingImporter`] writes the objects into a [`LocalStore`] and
//!    reports an [`ImportChangeSet`].
//!
//! Stages 1 and 2 are cooperatively cancellable through a
//! [`CancellationToken`]; stage 3 always runs to completion or to an error.
//!
//! [`MixedRepresentation`]: bridgesync_model::MixedRepresentation
//! [`GenericLocalObject`]: bridgesync_model::GenericLocalObject
//! [`LocalStore`]: bridgesync_model::LocalStore
//! [`ImportChangeSet`]: bridgesync_model::ImportChangeSet
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod cancel;
mod error;
mod graph;
mod importer;
mod translate;

pub use cancel::{check_cancelled, is_cancellation};
pub use error::{ImportError, ImportResult};
pub use graph::{ObjectGraph, UniquingIdsByEntity, build_graph, collect_uniquing_ids};
pub use importer::{ImporterConfig, UniquingImporter};
pub use translate::{RecordMapper, RecordMapping, RelatedRecords, translate};
