//! Shared fixtures for import tests.

#![allow(dead_code)]

use bridgesync_import::{UniquingImporter, collect_uniquing_ids};
use bridgesync_model::{
    EntitySchema, GenericLocalObject, ImportChangeSet, LocalStore, MergePolicy, ObjectHandle,
    RelationshipSchema, Schema,
};
use bridgesync_store::MemoryStore;

/// Installs a log subscriber once; `RUST_LOG=debug` shows importer logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Users with ordered friends, a to-one best friend and unordered tags.
/// `Admin` is a sub-entity of `User`.
pub fn social_schema() -> Schema {
    Schema::new()
        .with_entity(
            EntitySchema::new("User")
                .attribute("remote_id")
                .attribute("name")
                .relationship(RelationshipSchema::ordered("friends", "User"))
                .relationship(RelationshipSchema::to_one("best_friend", "User"))
                .relationship(RelationshipSchema::to_many("tags", "Tag")),
        )
        .with_entity(EntitySchema::new("Admin").with_parent("User").attribute("level"))
        .with_entity(
            EntitySchema::new("Tag")
                .attribute("remote_id")
                .attribute("label"),
        )
}

pub fn social_store() -> MemoryStore {
    init_tracing();
    MemoryStore::new(social_schema())
}

pub fn user(id: &str) -> GenericLocalObject<String> {
    GenericLocalObject::new("User").with_uniquing_id(id)
}

pub fn tag(id: &str) -> GenericLocalObject<String> {
    GenericLocalObject::new("Tag").with_uniquing_id(id)
}

/// A user whose `friends` are the given users, merged with `policy`.
pub fn user_with_friends(id: &str, friends: &[&str], policy: MergePolicy) -> GenericLocalObject<String> {
    user(id).with_relationship("friends", friends.iter().map(|f| user(f)).collect(), policy)
}

/// Imports `objects` with the default configuration.
pub fn import(
    store: &mut MemoryStore,
    objects: Vec<GenericLocalObject<String>>,
) -> ImportChangeSet<String> {
    try_import(store, objects, None).unwrap()
}

pub fn try_import(
    store: &mut MemoryStore,
    objects: Vec<GenericLocalObject<String>>,
    update_target: Option<ObjectHandle>,
) -> bridgesync_import::ImportResult<ImportChangeSet<String>> {
    let ids = collect_uniquing_ids(&objects);
    UniquingImporter::new(objects, None, ids)?
        .with_update_target(update_target)
        .import(store)
}

/// The `remote_id` values of a relationship's members, in order.
pub fn related_ids(store: &MemoryStore, handle: ObjectHandle, key: &str) -> Vec<String> {
    store
        .related(handle, key)
        .unwrap()
        .into_iter()
        .map(|h| match store.attribute(h, "remote_id").unwrap() {
            Some(serde_json::Value::String(s)) => s,
            other => format!("{other:?}"),
        })
        .collect()
}
