//! Request operations for bridgesync.
//!
//! A request asks a [`Bridge`] for a [`RemoteOperation`], runs it, and
//! imports what it returned into a local store.
//!
//! # Components
//!
//! - **Bridge**: creates remote operations, translates their output and
//!   creates the importer
//! - **Request helpers**: lifecycle hooks that can skip the remote call,
//!   veto or redirect the import, and save or roll back the store
//! - **ImportOperation**: translation, graph building and import
//! - **RequestOperation**: the whole request, as a cancellable state machine
//!
//! # Request lifecycle
//!
//! 1. **Prepare** (store context): the helpers decide whether the remote
//!    call is needed, the bridge creates the remote operation
//! 2. **Remote** (remote queue): the remote operation runs
//! 3. **Translate** (compute queue): the bridge translates the output and
//!    the object graph is built
//! 4. **Import** (import store context): the uniquing importer runs,
//!    bracketed by the helpers' `will_import` / `did_import`
//!
//! Cancellation is honoured until step 4 starts. From then on the import
//! runs to completion or to an error.

mod bridge;
mod collection;
mod error;
mod helper;
mod helpers;
mod import_operation;
mod operation;
mod queues;
mod remote;
mod request;
mod result;
mod state;

pub use bridge::{Bridge, Translation};
pub use collection::{AggregateError, HelperCollection, is_cancellation};
pub use error::{FailureStep, RequestError};
pub use helper::{ImportTarget, RequestHelper};
pub use helpers::{FetchRequestHelper, FetchType, NoopRequestHelper, SaveRequestHelper, SaveWorkflow};
pub use import_operation::{BridgeError, ImportOperation, ImportSource};
pub use operation::{BridgeResult, RequestOperation};
pub use queues::ExecutionQueues;
pub use remote::RemoteOperation;
pub use request::Request;
pub use result::RequestResult;
pub use state::{Completion, OperationHandle, OperationState};
