//! The bridge between a remote API and the local store.

use crate::helper::RequestHelper;
use crate::helpers::NoopRequestHelper;
use crate::remote::RemoteOperation;
use crate::request::Request;
use bridgesync_import::{UniquingIdsByEntity, UniquingImporter};
use bridgesync_model::{
    BoxError, GenericLocalObject, LocalStore, MixedRepresentation, ObjectHandle,
};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Translated remote output, ready for the graph builder.
#[derive(Debug, Clone)]
pub struct Translation<M> {
    pub representations: Vec<MixedRepresentation<M>>,
    pub root_metadata: Option<M>,
}

impl<M> Translation<M> {
    pub fn new(representations: Vec<MixedRepresentation<M>>) -> Self {
        Self {
            representations,
            root_metadata: None,
        }
    }

    pub fn with_root_metadata(mut self, metadata: M) -> Self {
        self.root_metadata = Some(metadata);
        self
    }
}

/// Everything a request operation needs to know about one remote API.
pub trait Bridge: Send + Sync + 'static {
    /// Describes what a request asks for.
    type Query: Send + Sync + 'static;
    /// Carried from the creation of the remote operation to its translation.
    type UserInfo: Send + 'static;
    /// Relationship metadata of the imported objects.
    type Metadata: Clone + fmt::Debug + Send + Sync + 'static;
    type Remote: RemoteOperation;

    /// The helper the bridge wants for `request`.
    fn request_helper(&self, _request: &Request<Self::Query>) -> Arc<dyn RequestHelper<Self::Metadata>> {
        Arc::new(NoopRequestHelper)
    }

    /// The remote operation for `request`, or `None` when there is nothing
    /// to do remotely. Called inside the request's store context.
    fn remote_operation(
        &self,
        request: &Request<Self::Query>,
        store: &mut dyn LocalStore,
    ) -> Result<Option<(Self::Remote, Self::UserInfo)>, BoxError>;

    /// Translates the output of a finished remote operation. `None` means
    /// nothing to import.
    fn translate(
        &self,
        output: <Self::Remote as RemoteOperation>::Output,
        user_info: Self::UserInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<Translation<Self::Metadata>>, BoxError>;

    /// The importer for the built object graph.
    fn importer(
        &self,
        objects: Vec<GenericLocalObject<Self::Metadata>>,
        root_metadata: Option<Self::Metadata>,
        uniquing_ids: UniquingIdsByEntity,
        update_target: Option<ObjectHandle>,
    ) -> Result<UniquingImporter<Self::Metadata>, BoxError> {
        let importer = UniquingImporter::new(objects, root_metadata, uniquing_ids)?;
        Ok(importer.with_update_target(update_target))
    }
}
