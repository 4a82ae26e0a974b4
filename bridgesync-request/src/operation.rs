//! The request operation state machine.
//!
//! ```text
//! NotStarted -> PreparingRemote -> RemoteRunning -> Translating -> Importing -> Finished
//!                      |                                 |
//!                      +--> Finished(NoopSuccess)        +--> Finished(NoopFromRemote)
//! ```
//!
//! Cancellation is honoured at every arrow up to `Importing`. The remote
//! operation gets a child of the operation's token, so cancelling the
//! operation cancels whatever remote work is outstanding.

use crate::bridge::Bridge;
use crate::collection::HelperCollection;
use crate::error::{FailureStep, RequestError};
use crate::helper::RequestHelper;
use crate::import_operation::{BridgeError, ImportOperation, ImportSource, completion_of, settle};
use crate::queues::ExecutionQueues;
use crate::remote::RemoteOperation;
use crate::request::Request;
use crate::result::RequestResult;
use crate::state::{OperationHandle, OperationState};
use bridgesync_model::{BoxError, LocalStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result type of the operations of bridge `B`.
pub type BridgeResult<B> = Result<RequestResult<<B as Bridge>::Remote, <B as Bridge>::Metadata>, BridgeError<B>>;

/// One request, from the decision to go remote to the import of the results.
pub struct RequestOperation<B: Bridge> {
    bridge: Arc<B>,
    request: Arc<Request<B::Query>>,
    helpers: HelperCollection<B::Metadata>,
    queues: ExecutionQueues,
    handle: OperationHandle,
}

impl<B: Bridge> RequestOperation<B> {
    /// Creates the operation with the helper the bridge picks for `request`.
    pub fn new(bridge: Arc<B>, request: Request<B::Query>, queues: ExecutionQueues) -> Self {
        let helpers = HelperCollection::new(vec![bridge.request_helper(&request)]);
        Self {
            bridge,
            request: Arc::new(request),
            helpers,
            queues,
            handle: OperationHandle::new(),
        }
    }

    /// Adds helpers that run before the bridge's own.
    pub fn with_additional_helpers(mut self, additional: HelperCollection<B::Metadata>) -> Self {
        let mut helpers = additional;
        helpers.extend(self.helpers);
        self.helpers = helpers;
        self
    }

    pub fn request(&self) -> &Request<B::Query> {
        &self.request
    }

    /// A handle to observe or cancel the operation from elsewhere.
    pub fn handle(&self) -> OperationHandle {
        self.handle.clone()
    }

    pub async fn run(self) -> BridgeResult<B> {
        let handle = self.handle.clone();
        let result = self.execute().await;
        let completion = match &result {
            Ok(result) => result.completion(),
            Err(e) => completion_of(e),
        };
        handle.transition(OperationState::Finished(completion));
        result
    }

    async fn execute(self) -> BridgeResult<B> {
        let Self {
            bridge,
            request,
            helpers,
            queues,
            handle,
        } = self;

        if handle.is_cancelled() {
            return Err(RequestError::Cancelled);
        }
        handle.transition(OperationState::PreparingRemote);

        let prepared = {
            let context = request.store.clone();
            let bridge = Arc::clone(&bridge);
            let request = Arc::clone(&request);
            let helpers = helpers.clone();
            let token = handle.token();
            context
                .perform_on(&queues.compute, move |store| {
                    prepare_remote(&*bridge, &request, &helpers, store, &token)
                })
                .await
                .unwrap_or_else(|e| {
                    Err(RequestError::failed(FailureStep::HelperPrepareRemote, Box::new(e)))
                })
        };
        let (mut remote, user_info) = match prepared {
            Ok(Some(remote)) => remote,
            Ok(None) => {
                debug!("request needs no remote operation");
                return Ok(RequestResult::NoopSuccess);
            }
            Err(e) => return Err(settle(e, &handle)),
        };
        if handle.is_cancelled() {
            return Err(RequestError::Cancelled);
        }

        handle.transition(OperationState::RemoteRunning);
        let child = handle.token().child_token();
        let task = queues.remote.spawn(async move {
            let output = remote.run(child).await;
            (remote, output)
        });
        let (remote, output) = match task.await {
            Ok(finished) => finished,
            Err(e) => {
                let e: BoxError = Box::new(e);
                helpers.remote_failed(&e);
                return Err(settle(RequestError::failed(FailureStep::RemoteOperation, e), &handle));
            }
        };
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                helpers.remote_failed(&e);
                let error = RequestError::failed(FailureStep::RemoteOperation, e).with_remote_operation(remote);
                return Err(settle(error, &handle));
            }
        };

        let import = ImportOperation::new(
            bridge,
            ImportSource::FinishedRemote { output, user_info },
            request.import_store().clone(),
            queues,
        )
        .with_helpers(helpers)
        .with_update_target(request.update_target)
        .with_handle(handle);

        match import.execute().await {
            Ok(Some(changes)) => Ok(RequestResult::Success {
                changes,
                remote_operation: remote,
            }),
            Ok(None) => Ok(RequestResult::NoopFromRemote(remote)),
            Err(e) => Err(e.with_remote_operation(remote)),
        }
    }
}

/// The local-to-remote stage. Runs inside the request's store context.
fn prepare_remote<B: Bridge>(
    bridge: &B,
    request: &Request<B::Query>,
    helpers: &HelperCollection<B::Metadata>,
    store: &mut dyn LocalStore,
    cancel: &CancellationToken,
) -> Result<Option<(B::Remote, B::UserInfo)>, BridgeError<B>> {
    let needs_remote = helpers
        .prepare_remote_conversion(store, cancel)
        .map_err(|e| local_to_remote_failed::<B>(helpers, FailureStep::HelperPrepareRemote, e, store))?;
    if !needs_remote {
        helpers.local_to_remote_skipped(store);
        return Ok(None);
    }

    let remote = bridge
        .remote_operation(request, store)
        .map_err(|e| local_to_remote_failed::<B>(helpers, FailureStep::BridgeGetRemoteOperation, e, store))?;
    let Some(remote) = remote else {
        helpers.local_to_remote_skipped(store);
        return Ok(None);
    };

    helpers
        .will_go_remote(store, cancel)
        .map_err(|e| local_to_remote_failed::<B>(helpers, FailureStep::HelperWillGoRemote, e, store))?;
    Ok(Some(remote))
}

fn local_to_remote_failed<B: Bridge>(
    helpers: &HelperCollection<B::Metadata>,
    step: FailureStep,
    error: BoxError,
    store: &mut dyn LocalStore,
) -> BridgeError<B> {
    helpers.local_to_remote_failed(&error, store);
    RequestError::failed(step, error)
}
