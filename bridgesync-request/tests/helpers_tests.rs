mod common;

use bridgesync_model::{BoxError, EntityName, ImportChangeSet, LocalStore};
use bridgesync_request::{
    ExecutionQueues, FetchRequestHelper, FetchType, NoopRequestHelper, Request, RequestHelper,
    RequestOperation, RequestResult, SaveRequestHelper, SaveWorkflow,
};
use bridgesync_store::MemoryStore;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn store_with_unsaved_user() -> MemoryStore {
    init_tracing();
    let mut store = MemoryStore::new(user_schema());
    store.create_object(&EntityName::from("User")).unwrap();
    store
}

fn fetch(fetch_type: FetchType) -> FetchRequestHelper {
    FetchRequestHelper::new("User", fetch_type)
}

fn needs_remote(helper: &dyn RequestHelper<String>, store: &mut MemoryStore) -> bool {
    helper
        .prepare_remote_conversion(store, &CancellationToken::new())
        .unwrap()
}

// ── Noop helper ──────────────────────────────────────────────────

#[test]
fn noop_helper_proceeds() {
    let mut store = store_with_unsaved_user();
    assert!(needs_remote(&NoopRequestHelper, &mut store));
    assert!(
        RequestHelper::<String>::will_import(&NoopRequestHelper, &mut store, &CancellationToken::new())
            .unwrap()
    );
    assert!(store.has_changes());
}

// ── Fetch helper ─────────────────────────────────────────────────

#[test]
fn fetch_types_decide_the_remote_call() {
    init_tracing();
    let mut empty = MemoryStore::new(user_schema());
    let mut populated = store_with_unsaved_user();

    assert!(needs_remote(&fetch(FetchType::Always), &mut populated));
    assert!(!needs_remote(&fetch(FetchType::Never), &mut empty));
    assert!(needs_remote(&fetch(FetchType::OnlyIfNoLocalResults), &mut empty));
    assert!(!needs_remote(&fetch(FetchType::OnlyIfNoLocalResults), &mut populated));
}

#[test]
fn fetch_of_unknown_entity_fails() {
    let helper: &dyn RequestHelper<String> =
        &FetchRequestHelper::new("Ghost", FetchType::OnlyIfNoLocalResults);
    let mut store = store_with_unsaved_user();
    assert!(
        helper
            .prepare_remote_conversion(&mut store, &CancellationToken::new())
            .is_err()
    );
}

#[test]
fn fetch_saves_after_import_and_rolls_back_on_failure() {
    let helper = fetch(FetchType::Always);
    let mut store = store_with_unsaved_user();

    RequestHelper::<String>::did_import(
        &helper,
        &ImportChangeSet::new(None),
        &mut store,
        &CancellationToken::new(),
    )
    .unwrap();
    assert!(!store.has_changes());

    store.create_object(&EntityName::from("User")).unwrap();
    RequestHelper::<String>::remote_to_local_failed(&helper, &"boom".into(), &mut store);
    assert_eq!(store.count(&EntityName::from("User")).unwrap(), 1);
}

#[tokio::test]
async fn fetch_helper_skips_remote_when_local_results_exist() {
    let store = user_store();
    saved_user(&store, "1");
    let bridge = UserBridge::with_helper(Arc::new(fetch(FetchType::OnlyIfNoLocalResults)));
    let request = Request::new(store.clone(), UserQuery::returning(vec![json!({"id": "2"})]));

    let result = RequestOperation::new(Arc::new(bridge), request, ExecutionQueues::current())
        .run()
        .await
        .unwrap();
    assert!(matches!(result, RequestResult::NoopSuccess));
    assert_eq!(count_users(&store), 1);
}

#[tokio::test]
async fn fetch_helper_saves_imported_objects() {
    let store = user_store();
    let bridge = UserBridge::with_helper(Arc::new(fetch(FetchType::OnlyIfNoLocalResults)));
    let request = Request::new(store.clone(), UserQuery::returning(vec![json!({"id": "2"})]));

    RequestOperation::new(Arc::new(bridge), request, ExecutionQueues::current())
        .run()
        .await
        .unwrap();
    assert!(!store.perform(|s| s.has_changes()).unwrap());
    assert_eq!(count_users(&store), 1);
}

#[tokio::test]
async fn fetch_helper_rolls_back_a_failed_import() {
    let store = user_store();
    saved_user(&store, "1");
    store
        .perform(|s| s.create_object(&EntityName::from("User")))
        .unwrap()
        .unwrap();
    let failing = RecordingHelper::failing_on("will_import");
    let bridge = UserBridge::with_helper(Arc::new(fetch(FetchType::Always)));
    let request = Request::new(store.clone(), UserQuery::returning(vec![json!({"id": "2"})]));

    let err = RequestOperation::new(Arc::new(bridge), request, ExecutionQueues::current())
        .with_additional_helpers(collection(&[&failing]))
        .run()
        .await
        .unwrap_err();
    assert!(err.step().is_some_and(|step| step.is_during_import()));
    assert_eq!(count_users(&store), 1);
    assert!(!store.perform(|s| s.has_changes()).unwrap());
}

// ── Save helper ──────────────────────────────────────────────────

fn go_remote(helper: &SaveRequestHelper, store: &mut MemoryStore) {
    RequestHelper::<String>::will_go_remote(helper, store, &CancellationToken::new()).unwrap();
}

#[test]
fn save_workflows_before_going_remote() {
    let mut store = store_with_unsaved_user();
    go_remote(&SaveRequestHelper::new(SaveWorkflow::SaveBeforeRemoteReturns), &mut store);
    assert!(!store.has_changes());
    assert_eq!(store.count(&EntityName::from("User")).unwrap(), 1);

    let mut store = store_with_unsaved_user();
    go_remote(&SaveRequestHelper::new(SaveWorkflow::RollbackBeforeRemoteReturns), &mut store);
    assert_eq!(store.count(&EntityName::from("User")).unwrap(), 0);

    let mut store = store_with_unsaved_user();
    go_remote(&SaveRequestHelper::new(SaveWorkflow::DoNothing), &mut store);
    assert!(store.has_changes());
}

#[test]
fn save_helper_rolls_back_local_edits_on_failure() {
    let error: BoxError = "boom".into();

    let mut store = store_with_unsaved_user();
    let helper = SaveRequestHelper::new(SaveWorkflow::SaveBeforeRemoteReturns);
    RequestHelper::<String>::local_to_remote_failed(&helper, &error, &mut store);
    assert_eq!(store.count(&EntityName::from("User")).unwrap(), 0);

    let mut store = store_with_unsaved_user();
    let helper = SaveRequestHelper::new(SaveWorkflow::DoNothing);
    RequestHelper::<String>::local_to_remote_failed(&helper, &error, &mut store);
    assert_eq!(store.count(&EntityName::from("User")).unwrap(), 1);

    let mut store = store_with_unsaved_user();
    RequestHelper::<String>::remote_to_local_failed(&helper, &error, &mut store);
    assert_eq!(store.count(&EntityName::from("User")).unwrap(), 0);
}

#[tokio::test]
async fn save_helper_discards_edits_when_the_remote_is_unreachable() {
    let store = user_store();
    store
        .perform(|s| s.create_object(&EntityName::from("User")))
        .unwrap()
        .unwrap();
    let bridge = UserBridge::with_helper(Arc::new(SaveRequestHelper::new(
        SaveWorkflow::SaveBeforeRemoteReturns,
    )));
    let query = UserQuery {
        unroutable: true,
        ..Default::default()
    };

    let err = RequestOperation::new(Arc::new(bridge), Request::new(store.clone(), query), ExecutionQueues::current())
        .run()
        .await
        .unwrap_err();
    assert!(err.step().is_some());
    assert_eq!(count_users(&store), 0);
}

#[tokio::test]
async fn save_helper_saves_before_and_after_the_remote() {
    let store = user_store();
    let local = store
        .perform(|s| s.create_object(&EntityName::from("User")))
        .unwrap()
        .unwrap();
    let bridge = UserBridge::with_helper(Arc::new(SaveRequestHelper::default()));
    let request = Request::new(store.clone(), UserQuery::returning(vec![json!({"id": "9"})]));

    RequestOperation::new(Arc::new(bridge), request, ExecutionQueues::current())
        .run()
        .await
        .unwrap();
    assert_eq!(count_users(&store), 2);
    assert!(!store.perform(|s| s.has_changes()).unwrap());
    assert!(!store.perform(|s| s.is_provisional(local)).unwrap().unwrap());
}

// ── Configuration ────────────────────────────────────────────────

#[test]
fn helper_settings_deserialize() {
    let fetch: FetchType = serde_json::from_value(json!("only_if_no_local_results")).unwrap();
    assert_eq!(fetch, FetchType::OnlyIfNoLocalResults);
    let workflow: SaveWorkflow = serde_json::from_value(json!("rollback_before_remote_returns")).unwrap();
    assert_eq!(workflow, SaveWorkflow::RollbackBeforeRemoteReturns);
    assert_eq!(SaveWorkflow::default(), SaveWorkflow::SaveBeforeRemoteReturns);
    assert!(serde_json::from_value::<FetchType>(json!("sometimes")).is_err());
}
