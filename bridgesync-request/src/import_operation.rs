//! The remote-to-local half of a request.
//!
//! [`ImportOperation`] takes remote output (or an already translated or
//! built object tree), turns it into local objects and imports them inside
//! a store context. [`RequestOperation`](crate::RequestOperation) runs one
//! after its remote stage; it can also be used on its own to import data
//! obtained some other way.

use crate::bridge::{Bridge, Translation};
use crate::collection::{HelperCollection, is_cancellation};
use crate::error::{FailureStep, RequestError};
use crate::helper::{ImportTarget, RequestHelper};
use crate::queues::ExecutionQueues;
use crate::remote::RemoteOperation;
use crate::state::{Completion, OperationHandle, OperationState};
use bridgesync_import::{UniquingIdsByEntity, UniquingImporter, build_graph, collect_uniquing_ids};
use bridgesync_model::{BoxError, GenericLocalObject, ImportChangeSet, LocalStore, ObjectHandle};
use bridgesync_store::StoreContext;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type RemoteOf<B> = <B as Bridge>::Remote;
type MetadataOf<B> = <B as Bridge>::Metadata;

/// Error type of the operations of bridge `B`.
pub type BridgeError<B> = RequestError<RemoteOf<B>, MetadataOf<B>>;

/// What an [`ImportOperation`] starts from.
pub enum ImportSource<B: Bridge> {
    /// The output of a finished remote operation, still to translate.
    FinishedRemote {
        output: <RemoteOf<B> as RemoteOperation>::Output,
        user_info: B::UserInfo,
    },
    /// Translated representations, still to build into a graph.
    Translation(Translation<MetadataOf<B>>),
    /// A built object tree.
    Objects {
        objects: Vec<GenericLocalObject<MetadataOf<B>>>,
        root_metadata: Option<MetadataOf<B>>,
    },
}

struct Prepared<M> {
    objects: Vec<GenericLocalObject<M>>,
    root_metadata: Option<M>,
    uniquing_ids: UniquingIdsByEntity,
}

enum ImportOutcome<M> {
    Cancelled,
    Vetoed,
    Imported(ImportChangeSet<M>),
    Failed(FailureStep, BoxError),
}

/// Translates, builds and imports remote results.
pub struct ImportOperation<B: Bridge> {
    bridge: Arc<B>,
    source: ImportSource<B>,
    store: StoreContext,
    helpers: HelperCollection<MetadataOf<B>>,
    update_target: Option<ObjectHandle>,
    queues: ExecutionQueues,
    handle: OperationHandle,
}

impl<B: Bridge> ImportOperation<B> {
    pub fn new(
        bridge: Arc<B>,
        source: ImportSource<B>,
        store: StoreContext,
        queues: ExecutionQueues,
    ) -> Self {
        Self {
            bridge,
            source,
            store,
            helpers: HelperCollection::default(),
            update_target: None,
            queues,
            handle: OperationHandle::new(),
        }
    }

    pub fn with_helpers(mut self, helpers: HelperCollection<MetadataOf<B>>) -> Self {
        self.helpers = helpers;
        self
    }

    pub fn with_update_target(mut self, target: Option<ObjectHandle>) -> Self {
        self.update_target = target;
        self
    }

    /// Shares state and cancellation with an enclosing operation.
    pub(crate) fn with_handle(mut self, handle: OperationHandle) -> Self {
        self.handle = handle;
        self
    }

    pub fn handle(&self) -> OperationHandle {
        self.handle.clone()
    }

    /// Runs the import. `Ok(None)` when there was nothing to import or a
    /// helper vetoed the import.
    pub async fn run(self) -> Result<Option<ImportChangeSet<MetadataOf<B>>>, BridgeError<B>> {
        let handle = self.handle.clone();
        let result = self.execute().await;
        let completion = match &result {
            Ok(Some(_)) => Completion::Success,
            Ok(None) => Completion::NoopSuccess,
            Err(e) => completion_of(e),
        };
        handle.transition(OperationState::Finished(completion));
        result
    }

    pub(crate) async fn execute(
        self,
    ) -> Result<Option<ImportChangeSet<MetadataOf<B>>>, BridgeError<B>> {
        let Self {
            bridge,
            source,
            store,
            helpers,
            update_target,
            queues,
            handle,
        } = self;

        if handle.is_cancelled() {
            return Err(RequestError::Cancelled);
        }
        handle.transition(OperationState::Translating);

        let token = handle.token();
        let prepared = match source {
            ImportSource::FinishedRemote { output, user_info } => {
                let bridge = Arc::clone(&bridge);
                queues
                    .compute
                    .spawn_blocking(move || translate_and_build(&*bridge, output, user_info, &token))
                    .await
                    .unwrap_or_else(|e| Err((FailureStep::BridgeTranslate, Box::new(e) as BoxError)))
            }
            ImportSource::Translation(translation) => queues
                .compute
                .spawn_blocking(move || build(translation, &token).map(Some))
                .await
                .unwrap_or_else(|e| Err((FailureStep::BridgeBuildGraph, Box::new(e) as BoxError))),
            ImportSource::Objects {
                objects,
                root_metadata,
            } => {
                let uniquing_ids = collect_uniquing_ids(&objects);
                Ok(Some(Prepared {
                    objects,
                    root_metadata,
                    uniquing_ids,
                }))
            }
        };

        let prepared = match prepared {
            Ok(Some(prepared)) => prepared,
            Ok(None) => {
                debug!("bridge returned nothing to import");
                return Ok(None);
            }
            Err((step, e)) => {
                helpers.remote_failed(&e);
                return Err(settle(RequestError::failed(step, e), &handle));
            }
        };
        if handle.is_cancelled() {
            return Err(RequestError::Cancelled);
        }

        let store = match helpers.import_target() {
            ImportTarget::Default => store,
            ImportTarget::Redirect(context) => context,
            ImportTarget::Skip => {
                debug!("request helpers skipped the import");
                return Ok(None);
            }
        };

        let importer = match bridge.importer(
            prepared.objects,
            prepared.root_metadata,
            prepared.uniquing_ids,
            update_target,
        ) {
            Ok(importer) => importer,
            Err(e) => {
                helpers.remote_failed(&e);
                return Err(settle(
                    RequestError::failed(FailureStep::BridgeGetImporter, e),
                    &handle,
                ));
            }
        };

        let import_handle = handle.clone();
        let performed = store
            .perform_on(&queues.compute, move |store| {
                let outcome = import(&importer, &helpers, &import_handle, store);
                (importer, outcome)
            })
            .await;

        let (importer, outcome) = match performed {
            Ok(performed) => performed,
            Err(e) => {
                return Err(RequestError::Failed {
                    step: FailureStep::ImporterImport,
                    source: Box::new(e),
                    remote_operation: None,
                    objects: None,
                    cancel_requested: handle.is_cancelled(),
                });
            }
        };
        match outcome {
            ImportOutcome::Cancelled => Err(RequestError::Cancelled),
            ImportOutcome::Vetoed => {
                debug!("request helpers declined the import");
                Ok(None)
            }
            ImportOutcome::Imported(changes) => Ok(Some(changes)),
            ImportOutcome::Failed(step, source) => Err(RequestError::Failed {
                step,
                source,
                remote_operation: None,
                objects: Some(importer.into_objects()),
                cancel_requested: handle.is_cancelled(),
            }),
        }
    }
}

/// Runs inside the store context. Past `begin_import`, cancellation is
/// ignored.
fn import<M: Clone>(
    importer: &UniquingImporter<M>,
    helpers: &HelperCollection<M>,
    handle: &OperationHandle,
    store: &mut dyn LocalStore,
) -> ImportOutcome<M> {
    if !handle.begin_import() {
        return ImportOutcome::Cancelled;
    }
    let cancel = handle.token();

    match helpers.will_import(store, &cancel) {
        Ok(true) => {}
        Ok(false) => return ImportOutcome::Vetoed,
        Err(e) => return import_failed(helpers, FailureStep::HelperWillImport, e, store),
    }
    let changes = match importer.import(store) {
        Ok(changes) => changes,
        Err(e) => return import_failed(helpers, FailureStep::ImporterImport, Box::new(e), store),
    };
    if let Err(e) = helpers.did_import(&changes, store, &cancel) {
        return import_failed(helpers, FailureStep::HelperDidImport, e, store);
    }
    ImportOutcome::Imported(changes)
}

fn import_failed<M>(
    helpers: &HelperCollection<M>,
    step: FailureStep,
    error: BoxError,
    store: &mut dyn LocalStore,
) -> ImportOutcome<M> {
    helpers.remote_to_local_failed(&error, store);
    ImportOutcome::Failed(step, error)
}

fn translate_and_build<B: Bridge>(
    bridge: &B,
    output: <RemoteOf<B> as RemoteOperation>::Output,
    user_info: B::UserInfo,
    cancel: &CancellationToken,
) -> Result<Option<Prepared<MetadataOf<B>>>, (FailureStep, BoxError)> {
    let translation = bridge
        .translate(output, user_info, cancel)
        .map_err(|e| (FailureStep::BridgeTranslate, e))?;
    match translation {
        Some(translation) => build(translation, cancel).map(Some),
        None => Ok(None),
    }
}

fn build<M>(
    translation: Translation<M>,
    cancel: &CancellationToken,
) -> Result<Prepared<M>, (FailureStep, BoxError)> {
    let graph = build_graph(translation.representations, cancel)
        .map_err(|e| (FailureStep::BridgeBuildGraph, Box::new(e) as BoxError))?;
    Ok(Prepared {
        objects: graph.objects,
        root_metadata: translation.root_metadata,
        uniquing_ids: graph.uniquing_ids,
    })
}

/// Reports a failure that happened before the import as a cancellation
/// when cancellation was requested or caused it.
pub(crate) fn settle<R, M>(error: RequestError<R, M>, handle: &OperationHandle) -> RequestError<R, M> {
    match &error {
        RequestError::Failed { step, source, .. }
            if !step.is_during_import()
                && (handle.is_cancelled() || is_cancellation(source.as_ref())) =>
        {
            debug!(%step, "failure after cancellation reported as cancelled");
            RequestError::Cancelled
        }
        _ => error,
    }
}

pub(crate) fn completion_of<R, M>(error: &RequestError<R, M>) -> Completion {
    match error {
        RequestError::Cancelled => Completion::Cancelled,
        RequestError::Failed { step, source, .. } => {
            warn!(%step, error = %source, "request failed");
            Completion::Failure(*step)
        }
    }
}
