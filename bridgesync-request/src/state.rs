//! Request operation state tracking.
//!
//! The state lives behind a mutex shared by every clone of an
//! [`OperationHandle`], so progress and completion can be observed from any
//! thread while the operation runs.

use crate::error::FailureStep;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How a finished operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    NoopSuccess,
    NoopFromRemote,
    Success,
    Failure(FailureStep),
    Cancelled,
}

/// Where an operation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    NotStarted,
    PreparingRemote,
    RemoteRunning,
    Translating,
    /// The import has started; it is no longer interrupted by cancellation.
    Importing,
    Finished(Completion),
}

impl OperationState {
    pub fn is_executing(self) -> bool {
        !matches!(self, Self::NotStarted | Self::Finished(_))
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<OperationState>,
    cancel: CancellationToken,
}

/// Cloneable view on a running operation: its state, and its cancellation.
#[derive(Debug, Clone, Default)]
pub struct OperationHandle {
    shared: Arc<Shared>,
}

impl OperationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, OperationState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests cancellation.
    ///
    /// Honoured at every stage boundary before the import starts. Once the
    /// import has started, the request is only recorded.
    pub fn cancel(&self) {
        let state = self.lock();
        if *state == OperationState::Importing {
            info!("cancellation requested while importing; the import will complete");
        }
        self.shared.cancel.cancel();
    }

    pub fn state(&self) -> OperationState {
        *self.lock()
    }

    pub fn is_executing(&self) -> bool {
        self.state().is_executing()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// The token cancelled by [`OperationHandle::cancel`].
    pub fn token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    pub(crate) fn transition(&self, next: OperationState) {
        let mut state = self.lock();
        debug!(from = ?*state, to = ?next, "operation state changed");
        *state = next;
    }

    /// Enters [`OperationState::Importing`] unless cancellation was
    /// requested first. The check and the transition are atomic with
    /// respect to [`OperationHandle::cancel`].
    pub(crate) fn begin_import(&self) -> bool {
        let mut state = self.lock();
        if self.shared.cancel.is_cancelled() {
            return false;
        }
        debug!(from = ?*state, "operation state changed to Importing");
        *state = OperationState::Importing;
        true
    }
}
