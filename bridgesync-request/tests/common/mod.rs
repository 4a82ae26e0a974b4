//! Shared fixtures for request tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridgesync_import::{ImportError, RecordMapper, RecordMapping, RelatedRecords, translate};
use bridgesync_model::{
    BoxError, EntityName, EntitySchema, ImportChangeSet, LocalStore, MergePolicy, ObjectHandle,
    RelationshipSchema, Schema, UniquingId,
};
use bridgesync_request::{
    Bridge, HelperCollection, ImportTarget, NoopRequestHelper, OperationHandle, RemoteOperation,
    Request, RequestHelper, Translation,
};
use bridgesync_store::{MemoryStore, StoreContext};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn user_schema() -> Schema {
    Schema::new().with_entity(
        EntitySchema::new("User")
            .attribute("remote_id")
            .attribute("name")
            .relationship(RelationshipSchema::ordered("friends", "User")),
    )
}

pub fn user_store() -> StoreContext {
    init_tracing();
    StoreContext::new(MemoryStore::new(user_schema()))
}

pub fn count_users(store: &StoreContext) -> usize {
    store
        .perform(|s| s.count(&EntityName::from("User")))
        .unwrap()
        .unwrap()
}

pub fn find_user(store: &StoreContext, id: &str) -> Option<ObjectHandle> {
    let ids = HashSet::from([UniquingId::from(id)]);
    store
        .perform(|s| s.lookup_by_uniquing_ids(&EntityName::from("User"), "remote_id", &ids))
        .unwrap()
        .unwrap()
        .first()
        .map(|(_, handle)| *handle)
}

/// Creates a saved user, so a later rollback keeps it.
pub fn saved_user(store: &StoreContext, id: &str) -> ObjectHandle {
    store
        .perform(|s| {
            let handle = s.create_object(&EntityName::from("User"))?;
            s.set_attribute(handle, "remote_id", Value::from(id))?;
            s.save()?;
            Ok::<_, bridgesync_model::StoreError>(handle)
        })
        .unwrap()
        .unwrap()
}

pub fn friend_ids(store: &StoreContext, handle: ObjectHandle) -> Vec<String> {
    store
        .perform(|s| {
            s.related(handle, "friends")
                .unwrap()
                .into_iter()
                .map(|friend| s.attribute(friend, "remote_id").unwrap().unwrap())
                .map(|id| id.as_str().unwrap().to_string())
                .collect()
        })
        .unwrap()
}

// ── Remote operation ─────────────────────────────────────────────

/// Returns its records, fails, or waits for cancellation.
#[derive(Debug, Default)]
pub struct MockRemote {
    pub records: Vec<Value>,
    pub fail: bool,
    pub wait_for_cancel: bool,
    pub started: Arc<Notify>,
    pub runs: usize,
}

#[async_trait]
impl RemoteOperation for MockRemote {
    type Output = Vec<Value>;

    async fn run(&mut self, cancel: CancellationToken) -> Result<Vec<Value>, BoxError> {
        self.runs += 1;
        self.started.notify_one();
        if self.wait_for_cancel {
            cancel.cancelled().await;
            return Err(Box::new(ImportError::Cancelled));
        }
        if self.fail {
            return Err("remote unavailable".into());
        }
        Ok(self.records.clone())
    }
}

// ── Bridge ───────────────────────────────────────────────────────

/// What the remote side of a test request does.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub records: Vec<Value>,
    /// The bridge has no remote operation for the request.
    pub local_only: bool,
    /// The bridge fails to create the remote operation.
    pub unroutable: bool,
    pub fail_remote: bool,
    pub wait_for_cancel: bool,
}

impl UserQuery {
    pub fn returning(records: Vec<Value>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }
}

/// Maps `{"id", "name", "friends": [...]}` records to users. A record with a
/// `fail` field cannot be read.
pub struct UserMapper;

impl RecordMapper for UserMapper {
    type Record = Value;
    type UserInfo = usize;
    type Metadata = String;

    fn map_record(
        &self,
        record: &Value,
        expected_entity: &EntityName,
        _depth: &usize,
    ) -> Result<Option<RecordMapping<Value>>, BoxError> {
        if record.get("fail").is_some() {
            return Err("unreadable record".into());
        }
        let Some(id) = record.get("id").and_then(UniquingId::from_value) else {
            return Ok(None);
        };
        let mut mapping = RecordMapping::new(expected_entity.clone());
        mapping.uniquing_id = Some(id);
        if let Some(name) = record.get("name") {
            mapping.attributes.insert("name".to_string(), name.clone());
        }
        if let Some(friends) = record.get("friends").and_then(Value::as_array) {
            mapping.relationships.insert(
                "friends".to_string(),
                Some(RelatedRecords {
                    entity: EntityName::from("User"),
                    records: friends.clone(),
                }),
            );
        }
        Ok(Some(mapping))
    }

    fn sub_user_info(&self, depth: &usize, _relationship: &str) -> usize {
        depth + 1
    }

    fn merge_policy(&self, _entity: &EntityName, _relationship: &str, _depth: &usize) -> MergePolicy {
        MergePolicy::Append
    }

    fn relationship_metadata(&self, _entity: &EntityName, relationship: &str, depth: &usize) -> Option<String> {
        Some(format!("{relationship}@{depth}"))
    }
}

/// A bridge over [`MockRemote`] and [`UserMapper`].
#[derive(Default)]
pub struct UserBridge {
    pub helper: Option<Arc<dyn RequestHelper<String>>>,
    pub started: Arc<Notify>,
    pub translations: AtomicUsize,
}

impl UserBridge {
    pub fn with_helper(helper: Arc<dyn RequestHelper<String>>) -> Self {
        Self {
            helper: Some(helper),
            ..Default::default()
        }
    }

    pub fn translations(&self) -> usize {
        self.translations.load(Ordering::SeqCst)
    }
}

impl Bridge for UserBridge {
    type Query = UserQuery;
    type UserInfo = usize;
    type Metadata = String;
    type Remote = MockRemote;

    fn request_helper(&self, _request: &Request<UserQuery>) -> Arc<dyn RequestHelper<String>> {
        match &self.helper {
            Some(helper) => Arc::clone(helper),
            None => Arc::new(NoopRequestHelper),
        }
    }

    fn remote_operation(
        &self,
        request: &Request<UserQuery>,
        _store: &mut dyn LocalStore,
    ) -> Result<Option<(MockRemote, usize)>, BoxError> {
        let query = &request.query;
        if query.unroutable {
            return Err("no route for request".into());
        }
        if query.local_only {
            return Ok(None);
        }
        let remote = MockRemote {
            records: query.records.clone(),
            fail: query.fail_remote,
            wait_for_cancel: query.wait_for_cancel,
            started: Arc::clone(&self.started),
            runs: 0,
        };
        Ok(Some((remote, 0)))
    }

    fn translate(
        &self,
        output: Vec<Value>,
        depth: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<Translation<String>>, BoxError> {
        self.translations.fetch_add(1, Ordering::SeqCst);
        if output.is_empty() {
            return Ok(None);
        }
        let representations = translate(&UserMapper, &output, &EntityName::from("User"), &depth, cancel)?;
        Ok(Some(Translation::new(representations).with_root_metadata("root".to_string())))
    }
}

// ── Recording helper ─────────────────────────────────────────────

/// Records every hook it sees. Answers and failures are configurable.
#[derive(Debug, Default)]
pub struct RecordingHelper {
    pub calls: Mutex<Vec<&'static str>>,
    pub cancel_on_import: Mutex<Option<OperationHandle>>,
    /// Answer `false` to `prepare_remote_conversion`.
    pub skip_remote: bool,
    /// Answer `false` to `will_import`.
    pub veto_import: bool,
    /// Fail in this hook.
    pub fail_on: Option<&'static str>,
    pub target: Option<ImportTarget>,
}

impl RecordingHelper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(hook: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(hook),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Cancels `handle` from inside `will_import`.
    pub fn cancel_when_importing(&self, handle: OperationHandle) {
        *self.cancel_on_import.lock().unwrap() = Some(handle);
    }

    fn record(&self, hook: &'static str) -> Result<(), BoxError> {
        self.calls.lock().unwrap().push(hook);
        if self.fail_on == Some(hook) {
            return Err(format!("{hook} failed").into());
        }
        Ok(())
    }
}

impl RequestHelper<String> for RecordingHelper {
    fn prepare_remote_conversion(
        &self,
        _store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<bool, BoxError> {
        self.record("prepare_remote_conversion")?;
        Ok(!self.skip_remote)
    }

    fn local_to_remote_skipped(&self, _store: &mut dyn LocalStore) {
        let _ = self.record("local_to_remote_skipped");
    }

    fn will_go_remote(
        &self,
        _store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.record("will_go_remote")
    }

    fn local_to_remote_failed(&self, _error: &BoxError, _store: &mut dyn LocalStore) {
        let _ = self.record("local_to_remote_failed");
    }

    fn remote_failed(&self, _error: &BoxError) {
        let _ = self.record("remote_failed");
    }

    fn import_target(&self) -> ImportTarget {
        let _ = self.record("import_target");
        self.target.clone().unwrap_or_default()
    }

    fn will_import(
        &self,
        _store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<bool, BoxError> {
        if let Some(handle) = self.cancel_on_import.lock().unwrap().as_ref() {
            handle.cancel();
        }
        self.record("will_import")?;
        Ok(!self.veto_import)
    }

    fn did_import(
        &self,
        _changes: &ImportChangeSet<String>,
        _store: &mut dyn LocalStore,
        _cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.record("did_import")
    }

    fn remote_to_local_failed(&self, _error: &BoxError, _store: &mut dyn LocalStore) {
        let _ = self.record("remote_to_local_failed");
    }
}

pub fn collection(helpers: &[&Arc<RecordingHelper>]) -> HelperCollection<String> {
    helpers
        .iter()
        .map(|helper| Arc::clone(*helper) as Arc<dyn RequestHelper<String>>)
        .collect()
}
