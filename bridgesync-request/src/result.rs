use crate::state::Completion;
use bridgesync_model::ImportChangeSet;

/// Outcome of a request that did not fail.
#[derive(Debug)]
pub enum RequestResult<R, M> {
    /// No remote call was needed.
    NoopSuccess,
    /// The remote call ran but nothing was imported.
    NoopFromRemote(R),
    /// The remote results were imported.
    Success {
        changes: ImportChangeSet<M>,
        remote_operation: R,
    },
}

impl<R, M> RequestResult<R, M> {
    pub fn changes(&self) -> Option<&ImportChangeSet<M>> {
        match self {
            Self::Success { changes, .. } => Some(changes),
            _ => None,
        }
    }

    pub fn remote_operation(&self) -> Option<&R> {
        match self {
            Self::NoopSuccess => None,
            Self::NoopFromRemote(op) => Some(op),
            Self::Success {
                remote_operation, ..
            } => Some(remote_operation),
        }
    }

    pub fn completion(&self) -> Completion {
        match self {
            Self::NoopSuccess => Completion::NoopSuccess,
            Self::NoopFromRemote(_) => Completion::NoopFromRemote,
            Self::Success { .. } => Completion::Success,
        }
    }
}
