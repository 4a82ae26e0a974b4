//! Built-in request helpers.

use crate::helper::RequestHelper;
use bridgesync_model::{BoxError, EntityName, ImportChangeSet, LocalStore};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A helper that lets every request proceed and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRequestHelper;

impl<M> RequestHelper<M> for NoopRequestHelper {}

/// When a fetch goes remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchType {
    #[default]
    Always,
    /// Only when the store holds no object of the fetched entity.
    OnlyIfNoLocalResults,
    Never,
}

/// Helper for fetch requests: decides whether the remote call is needed,
/// saves the store after a successful import and rolls it back after a
/// failed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequestHelper {
    pub entity: EntityName,
    pub fetch_type: FetchType,
}

impl FetchRequestHelper {
    pub fn new(entity: impl Into<EntityName>, fetch_type: FetchType) -> Self {
        Self {
            entity: entity.into(),
            fetch_type,
        }
    }
}

impl<M> RequestHelper<M> for FetchRequestHelper {
    fn prepare_remote_conversion(
        &self,
        store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<bool, BoxError> {
        Ok(match self.fetch_type {
            FetchType::Always => true,
            FetchType::Never => false,
            FetchType::OnlyIfNoLocalResults => {
                let local = store.count(&self.entity)?;
                debug!(entity = %self.entity, local, "counted local results");
                local == 0
            }
        })
    }

    fn did_import(
        &self,
        _changes: &ImportChangeSet<M>,
        store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        store.save()?;
        Ok(())
    }

    fn remote_to_local_failed(&self, _error: &BoxError, store: &mut dyn LocalStore) {
        store.rollback();
    }
}

/// What a save request does with the local edits before going remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveWorkflow {
    #[default]
    SaveBeforeRemoteReturns,
    RollbackBeforeRemoteReturns,
    DoNothing,
}

/// Helper for requests pushing local edits to the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveRequestHelper {
    pub workflow: SaveWorkflow,
}

impl SaveRequestHelper {
    pub fn new(workflow: SaveWorkflow) -> Self {
        Self { workflow }
    }
}

impl<M> RequestHelper<M> for SaveRequestHelper {
    fn will_go_remote(
        &self,
        store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        match self.workflow {
            SaveWorkflow::SaveBeforeRemoteReturns => store.save()?,
            SaveWorkflow::RollbackBeforeRemoteReturns => store.rollback(),
            SaveWorkflow::DoNothing => {}
        }
        Ok(())
    }

    fn local_to_remote_failed(&self, _error: &BoxError, store: &mut dyn LocalStore) {
        // The failure may come before will_go_remote, so the edits are still pending.
        if self.workflow != SaveWorkflow::DoNothing {
            store.rollback();
        }
    }

    fn did_import(
        &self,
        _changes: &ImportChangeSet<M>,
        store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        store.save()?;
        Ok(())
    }

    fn remote_to_local_failed(&self, _error: &BoxError, store: &mut dyn LocalStore) {
        store.rollback();
    }
}
