//! Fan-out over several request helpers.

use crate::helper::{ImportTarget, RequestHelper};
use bridgesync_model::{BoxError, ImportChangeSet, LocalStore};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Several helper errors reported as one.
#[derive(Debug, Error)]
#[error("{} request helpers failed: {}", .errors.len(), summary(.errors))]
pub struct AggregateError {
    pub errors: Vec<BoxError>,
}

fn summary(errors: &[BoxError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AggregateError {
    /// `Ok` for no error, the error itself for one, an aggregate otherwise.
    pub fn from_errors(mut errors: Vec<BoxError>) -> Result<(), BoxError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Box::new(AggregateError { errors })),
        }
    }
}

/// Whether `err` is a cancellation, alone or inside an [`AggregateError`].
pub fn is_cancellation(err: &(dyn Error + 'static)) -> bool {
    if bridgesync_import::is_cancellation(err) {
        return true;
    }
    err.downcast_ref::<AggregateError>()
        .is_some_and(|agg| agg.errors.iter().any(|e| is_cancellation(e.as_ref())))
}

/// An ordered list of helpers acting as one.
///
/// Every helper is called for every hook, even after one of them failed.
/// Gates combine with AND (an empty collection proceeds). Failures are
/// collected with [`AggregateError::from_errors`]. For the import target the
/// first helper that does not answer [`ImportTarget::Default`] wins.
pub struct HelperCollection<M> {
    helpers: Vec<Arc<dyn RequestHelper<M>>>,
}

impl<M> HelperCollection<M> {
    pub fn new(helpers: Vec<Arc<dyn RequestHelper<M>>>) -> Self {
        Self { helpers }
    }

    pub fn push(&mut self, helper: Arc<dyn RequestHelper<M>>) {
        self.helpers.push(helper);
    }

    /// Appends every helper of `other`, after the current ones.
    pub fn extend(&mut self, other: HelperCollection<M>) {
        self.helpers.extend(other.helpers);
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }

    fn all(
        &self,
        mut gate: impl FnMut(&dyn RequestHelper<M>) -> Result<bool, BoxError>,
    ) -> Result<bool, BoxError> {
        let mut proceed = true;
        let mut errors = Vec::new();
        for helper in &self.helpers {
            match gate(helper.as_ref()) {
                Ok(answer) => proceed &= answer,
                Err(e) => {
                    debug!(error = %e, "request helper failed");
                    errors.push(e);
                }
            }
        }
        AggregateError::from_errors(errors).map(|()| proceed)
    }

    fn each(
        &self,
        mut hook: impl FnMut(&dyn RequestHelper<M>) -> Result<(), BoxError>,
    ) -> Result<(), BoxError> {
        self.all(|helper| hook(helper).map(|()| true)).map(|_| ())
    }
}

impl<M> Clone for HelperCollection<M> {
    fn clone(&self) -> Self {
        Self {
            helpers: self.helpers.clone(),
        }
    }
}

impl<M> Default for HelperCollection<M> {
    fn default() -> Self {
        Self {
            helpers: Vec::new(),
        }
    }
}

impl<M> fmt::Debug for HelperCollection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperCollection")
            .field("helpers", &self.helpers.len())
            .finish()
    }
}

impl<M> FromIterator<Arc<dyn RequestHelper<M>>> for HelperCollection<M> {
    fn from_iter<I: IntoIterator<Item = Arc<dyn RequestHelper<M>>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<M> RequestHelper<M> for HelperCollection<M> {
    fn prepare_remote_conversion(
        &self,
        store: &mut dyn LocalStore,
        cancel: &CancellationToken,
    ) -> Result<bool, BoxError> {
        self.all(|helper| helper.prepare_remote_conversion(store, cancel))
    }

    fn local_to_remote_skipped(&self, store: &mut dyn LocalStore) {
        for helper in &self.helpers {
            helper.local_to_remote_skipped(store);
        }
    }

    fn will_go_remote(
        &self,
        store: &mut dyn LocalStore,
        cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.each(|helper| helper.will_go_remote(store, cancel))
    }

    fn local_to_remote_failed(&self, error: &BoxError, store: &mut dyn LocalStore) {
        for helper in &self.helpers {
            helper.local_to_remote_failed(error, store);
        }
    }

    fn remote_failed(&self, error: &BoxError) {
        for helper in &self.helpers {
            helper.remote_failed(error);
        }
    }

    fn import_target(&self) -> ImportTarget {
        self.helpers
            .iter()
            .map(|helper| helper.import_target())
            .find(|target| !target.is_default())
            .unwrap_or_default()
    }

    fn will_import(
        &self,
        store: &mut dyn LocalStore,
        cancel: &CancellationToken,
    ) -> Result<bool, BoxError> {
        self.all(|helper| helper.will_import(store, cancel))
    }

    fn did_import(
        &self,
        changes: &ImportChangeSet<M>,
        store: &mut dyn LocalStore,
        cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.each(|helper| helper.did_import(changes, store, cancel))
    }

    fn remote_to_local_failed(&self, error: &BoxError, store: &mut dyn LocalStore) {
        for helper in &self.helpers {
            helper.remote_to_local_failed(error, store);
        }
    }
}
