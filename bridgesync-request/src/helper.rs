//! The request helper extension point.
//!
//! A helper is told about every step of a request and may veto parts of
//! it. Hooks whose name does not end in `failed` may fail; the failure aborts
//! the request at the matching [`FailureStep`](crate::FailureStep). The
//! `*_failed` hooks are notifications only.
//!
//! Hooks that take a store are called inside the store context: the
//! request's store for the local-to-remote part, the import context for the
//! remote-to-local part.

use bridgesync_model::{BoxError, ImportChangeSet, LocalStore};
use bridgesync_store::StoreContext;
use tokio_util::sync::CancellationToken;

/// Where the results of a request are imported.
#[derive(Debug, Clone, Default)]
pub enum ImportTarget {
    /// The request's import context.
    #[default]
    Default,
    /// Another store context.
    Redirect(StoreContext),
    /// Do not import.
    Skip,
}

impl ImportTarget {
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

/// Hooks into the lifecycle of a request. Every method has a default that
/// lets the request proceed.
pub trait RequestHelper<M>: Send + Sync {
    // ── Local request to remote operation ────────────────────────

    /// Whether the request needs to go remote at all.
    fn prepare_remote_conversion(
        &self,
        _store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<bool, BoxError> {
        Ok(true)
    }

    /// The request finished without going remote.
    fn local_to_remote_skipped(&self, _store: &mut dyn LocalStore) {}

    /// Called right before the remote operation is started.
    fn will_go_remote(
        &self,
        _store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    fn local_to_remote_failed(&self, _error: &BoxError, _store: &mut dyn LocalStore) {}

    // ── Remote results ───────────────────────────────────────────

    /// The remote operation, translation or importer creation failed.
    /// Not called inside a store context.
    fn remote_failed(&self, _error: &BoxError) {}

    // ── Remote results to local store ────────────────────────────

    fn import_target(&self) -> ImportTarget {
        ImportTarget::Default
    }

    /// Whether the results should be imported.
    fn will_import(
        &self,
        _store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<bool, BoxError> {
        Ok(true)
    }

    fn did_import(
        &self,
        _changes: &ImportChangeSet<M>,
        _store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    fn remote_to_local_failed(&self, _error: &BoxError, _store: &mut dyn LocalStore) {}
}
