//! Shared fixtures for store tests.

#![allow(dead_code)]

use bridgesync_model::{EntitySchema, RelationshipSchema, Schema};
use bridgesync_store::MemoryStore;

/// A small library schema: `Book` is a sub-entity of `Item`, books have
/// ordered chapters, people have an unordered set of items and a to-one
/// best friend.
pub fn library_schema() -> Schema {
    Schema::new()
        .with_entity(
            EntitySchema::new("Item")
                .attribute("remote_id")
                .attribute("title"),
        )
        .with_entity(
            EntitySchema::new("Book")
                .with_parent("Item")
                .relationship(RelationshipSchema::ordered("chapters", "Chapter")),
        )
        .with_entity(
            EntitySchema::new("Chapter")
                .attribute("remote_id")
                .attribute("title"),
        )
        .with_entity(
            EntitySchema::new("Person")
                .attribute("remote_id")
                .attribute("name")
                .relationship(RelationshipSchema::to_many("items", "Item"))
                .relationship(RelationshipSchema::to_one("best_friend", "Person")),
        )
}

pub fn library_store() -> MemoryStore {
    MemoryStore::new(library_schema())
}
