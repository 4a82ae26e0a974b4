//! Error types for request and import operations.

use bridgesync_model::{BoxError, GenericLocalObject};
use std::fmt;

/// The stage at which a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStep {
    HelperPrepareRemote,
    BridgeGetRemoteOperation,
    HelperWillGoRemote,
    RemoteOperation,
    BridgeTranslate,
    BridgeBuildGraph,
    BridgeGetImporter,
    HelperWillImport,
    ImporterImport,
    HelperDidImport,
}

impl FailureStep {
    /// Whether the failure happened after the store started being written.
    pub fn is_during_import(self) -> bool {
        matches!(
            self,
            Self::HelperWillImport | Self::ImporterImport | Self::HelperDidImport
        )
    }
}

impl fmt::Display for FailureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HelperPrepareRemote => "helper_prepare_remote",
            Self::BridgeGetRemoteOperation => "bridge_get_remote_operation",
            Self::HelperWillGoRemote => "helper_will_go_remote",
            Self::RemoteOperation => "remote_operation",
            Self::BridgeTranslate => "bridge_translate",
            Self::BridgeBuildGraph => "bridge_build_graph",
            Self::BridgeGetImporter => "bridge_get_importer",
            Self::HelperWillImport => "helper_will_import",
            Self::ImporterImport => "importer_import",
            Self::HelperDidImport => "helper_did_import",
        };
        f.write_str(name)
    }
}

/// Why a request did not produce a result.
///
/// `R` is the bridge's remote operation, `M` its relationship metadata.
pub enum RequestError<R, M> {
    /// Cancellation was requested before the import started.
    Cancelled,
    /// A stage failed.
    Failed {
        step: FailureStep,
        source: BoxError,
        /// The finished remote operation, when the failure came after it.
        remote_operation: Option<R>,
        /// The objects that were being imported, when the failure came
        /// from the import stage.
        objects: Option<Vec<GenericLocalObject<M>>>,
        /// Cancellation was requested while the import was running.
        cancel_requested: bool,
    },
}

impl<R, M> RequestError<R, M> {
    pub fn failed(step: FailureStep, source: BoxError) -> Self {
        Self::Failed {
            step,
            source,
            remote_operation: None,
            objects: None,
            cancel_requested: false,
        }
    }

    /// Attaches the finished remote operation to a failure.
    pub fn with_remote_operation(self, operation: R) -> Self {
        match self {
            Self::Cancelled => Self::Cancelled,
            Self::Failed {
                step,
                source,
                objects,
                cancel_requested,
                ..
            } => Self::Failed {
                step,
                source,
                remote_operation: Some(operation),
                objects,
                cancel_requested,
            },
        }
    }

    pub fn step(&self) -> Option<FailureStep> {
        match self {
            Self::Cancelled => None,
            Self::Failed { step, .. } => Some(*step),
        }
    }

    /// Whether the request ended because of a cancellation request,
    /// including an import that failed after cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Failed {
                cancel_requested, ..
            } => *cancel_requested,
        }
    }

    pub fn remote_operation(&self) -> Option<&R> {
        match self {
            Self::Cancelled => None,
            Self::Failed {
                remote_operation, ..
            } => remote_operation.as_ref(),
        }
    }

    pub fn objects(&self) -> Option<&[GenericLocalObject<M>]> {
        match self {
            Self::Cancelled => None,
            Self::Failed { objects, .. } => objects.as_deref(),
        }
    }
}

impl<R: fmt::Debug, M: fmt::Debug> fmt::Debug for RequestError<R, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("Cancelled"),
            Self::Failed {
                step,
                source,
                remote_operation,
                objects,
                cancel_requested,
            } => f
                .debug_struct("Failed")
                .field("step", step)
                .field("source", source)
                .field("remote_operation", remote_operation)
                .field("objects", &objects.as_ref().map(Vec::len))
                .field("cancel_requested", cancel_requested)
                .finish(),
        }
    }
}

impl<R, M> fmt::Display for RequestError<R, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("request cancelled"),
            Self::Failed { step, source, .. } => write!(f, "request failed at {step}: {source}"),
        }
    }
}

impl<R: fmt::Debug, M: fmt::Debug> std::error::Error for RequestError<R, M> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cancelled => None,
            Self::Failed { source, .. } => Some(source.as_ref()),
        }
    }
}
