//! In-memory implementation of [`LocalStore`].
//!
//! Objects live in a hash map keyed by handle. A copy of the map taken at
//! the last save is the rollback target. Objects carry a provisional
//! identity until [`LocalStore::assign_permanent_identities`] or a save
//! gives them a sequential permanent one.

use bridgesync_model::{
    EntityName, LocalStore, ObjectHandle, RelationshipSchema, RelationshipUpdate, Schema,
    StoreError, StoreResult, UniquingId,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredObject {
    entity: EntityName,
    attributes: BTreeMap<String, Value>,
    relationships: BTreeMap<String, Vec<ObjectHandle>>,
    permanent_id: Option<u64>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    objects: HashMap<ObjectHandle, StoredObject>,
    next_permanent_id: u64,
}

/// A [`LocalStore`] held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    schema: Schema,
    objects: HashMap<ObjectHandle, StoredObject>,
    next_permanent_id: u64,
    saved: Snapshot,
    dirty: bool,
}

impl MemoryStore {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            objects: HashMap::new(),
            next_permanent_id: 1,
            saved: Snapshot {
                objects: HashMap::new(),
                next_permanent_id: 1,
            },
            dirty: false,
        }
    }

    /// Handles of the live objects of exactly `entity`, oldest first.
    pub fn handles_of(&self, entity: &EntityName) -> Vec<ObjectHandle> {
        let mut handles: Vec<_> = self
            .objects
            .iter()
            .filter(|(_, o)| &o.entity == entity)
            .map(|(h, _)| *h)
            .collect();
        handles.sort();
        handles
    }

    /// The permanent identity of an object, if it has one.
    pub fn permanent_id(&self, handle: ObjectHandle) -> Option<u64> {
        self.objects.get(&handle).and_then(|o| o.permanent_id)
    }

    fn object(&self, handle: ObjectHandle) -> StoreResult<&StoredObject> {
        self.objects.get(&handle).ok_or(StoreError::ObjectNotFound(handle))
    }

    fn ensure_entity(&self, entity: &EntityName) -> StoreResult<()> {
        if self.schema.contains(entity) {
            Ok(())
        } else {
            Err(StoreError::UnknownEntity(entity.clone()))
        }
    }

    fn ensure_attribute(&self, entity: &EntityName, key: &str) -> StoreResult<()> {
        if self.schema.has_attribute(entity, key) {
            Ok(())
        } else {
            Err(StoreError::UnknownAttribute {
                entity: entity.clone(),
                attribute: key.to_string(),
            })
        }
    }

    fn relationship_schema(&self, entity: &EntityName, key: &str) -> StoreResult<RelationshipSchema> {
        self.schema
            .relationship(entity, key)
            .cloned()
            .ok_or_else(|| StoreError::UnknownRelationship {
                entity: entity.clone(),
                relationship: key.to_string(),
            })
    }

    /// Checks that every member exists and fits the relationship's destination.
    fn check_members(&self, relationship: &RelationshipSchema, members: &[ObjectHandle]) -> StoreResult<()> {
        for member in members {
            let entity = &self.object(*member)?.entity;
            if !self.schema.is_kind_of(entity, &relationship.destination) {
                return Err(StoreError::InvalidUpdate {
                    relationship: relationship.name.clone(),
                    reason: format!(
                        "{entity} is not a kind of {}",
                        relationship.destination
                    ),
                });
            }
        }
        Ok(())
    }

    fn assign_permanent_id(&mut self, handle: ObjectHandle) -> StoreResult<()> {
        let next = self.next_permanent_id;
        let object = self
            .objects
            .get_mut(&handle)
            .ok_or(StoreError::ObjectNotFound(handle))?;
        if object.permanent_id.is_none() {
            object.permanent_id = Some(next);
            self.next_permanent_id += 1;
            self.dirty = true;
        }
        Ok(())
    }
}

fn invalid(relationship: &RelationshipSchema, reason: &str) -> StoreError {
    StoreError::InvalidUpdate {
        relationship: relationship.name.clone(),
        reason: reason.to_string(),
    }
}

/// Distinct members, first occurrence wins.
fn dedup(members: Vec<ObjectHandle>) -> Vec<ObjectHandle> {
    let mut seen = HashSet::new();
    members.into_iter().filter(|h| seen.insert(*h)).collect()
}

impl LocalStore for MemoryStore {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn lookup_by_uniquing_ids(
        &self,
        entity: &EntityName,
        attribute: &str,
        ids: &HashSet<UniquingId>,
    ) -> StoreResult<Vec<(UniquingId, ObjectHandle)>> {
        self.ensure_entity(entity)?;
        self.ensure_attribute(entity, attribute)?;
        let found = self
            .objects
            .iter()
            .filter(|(_, o)| self.schema.is_kind_of(&o.entity, entity))
            .filter_map(|(handle, o)| {
                let id = o.attributes.get(attribute).and_then(UniquingId::from_value)?;
                ids.contains(&id).then_some((id, *handle))
            })
            .collect();
        Ok(found)
    }

    fn create_object(&mut self, entity: &EntityName) -> StoreResult<ObjectHandle> {
        self.ensure_entity(entity)?;
        let handle = ObjectHandle::new();
        self.objects.insert(
            handle,
            StoredObject {
                entity: entity.clone(),
                attributes: BTreeMap::new(),
                relationships: BTreeMap::new(),
                permanent_id: None,
            },
        );
        self.dirty = true;
        Ok(handle)
    }

    fn delete_object(&mut self, handle: ObjectHandle) -> StoreResult<()> {
        self.objects
            .remove(&handle)
            .ok_or(StoreError::ObjectNotFound(handle))?;
        for object in self.objects.values_mut() {
            for members in object.relationships.values_mut() {
                members.retain(|m| *m != handle);
            }
        }
        self.dirty = true;
        Ok(())
    }

    fn contains(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    fn entity_of(&self, handle: ObjectHandle) -> StoreResult<EntityName> {
        Ok(self.object(handle)?.entity.clone())
    }

    fn attribute(&self, handle: ObjectHandle, key: &str) -> StoreResult<Option<Value>> {
        let object = self.object(handle)?;
        self.ensure_attribute(&object.entity, key)?;
        Ok(object.attributes.get(key).cloned())
    }

    fn set_attribute(&mut self, handle: ObjectHandle, key: &str, value: Value) -> StoreResult<()> {
        let entity = self.object(handle)?.entity.clone();
        self.ensure_attribute(&entity, key)?;
        if let Some(object) = self.objects.get_mut(&handle) {
            object.attributes.insert(key.to_string(), value);
        }
        self.dirty = true;
        Ok(())
    }

    fn related(&self, handle: ObjectHandle, key: &str) -> StoreResult<Vec<ObjectHandle>> {
        let object = self.object(handle)?;
        self.relationship_schema(&object.entity, key)?;
        Ok(object.relationships.get(key).cloned().unwrap_or_default())
    }

    fn set_relationship(
        &mut self,
        handle: ObjectHandle,
        key: &str,
        update: RelationshipUpdate,
    ) -> StoreResult<()> {
        let entity = self.object(handle)?.entity.clone();
        let relationship = self.relationship_schema(&entity, key)?;
        let current = self
            .object(handle)?
            .relationships
            .get(key)
            .cloned()
            .unwrap_or_default();

        let members = match update {
            RelationshipUpdate::Clear => Vec::new(),
            RelationshipUpdate::ToOne(member) => {
                if relationship.is_to_many() {
                    return Err(invalid(&relationship, "to-one update on a to-many relationship"));
                }
                member.into_iter().collect()
            }
            RelationshipUpdate::Replace(incoming) => {
                if !relationship.is_to_many() {
                    return Err(invalid(&relationship, "to-many update on a to-one relationship"));
                }
                dedup(incoming)
            }
            RelationshipUpdate::Append(incoming) => {
                if !relationship.is_to_many() {
                    return Err(invalid(&relationship, "to-many update on a to-one relationship"));
                }
                dedup(current.into_iter().chain(incoming).collect())
            }
            RelationshipUpdate::Prepend(incoming) => {
                if !relationship.is_ordered() {
                    return Err(invalid(&relationship, "prepend on an unordered relationship"));
                }
                dedup(incoming.into_iter().chain(current).collect())
            }
        };
        self.check_members(&relationship, &members)?;

        if let Some(object) = self.objects.get_mut(&handle) {
            object.relationships.insert(key.to_string(), members);
        }
        self.dirty = true;
        Ok(())
    }

    fn assign_permanent_identities(&mut self, handles: &[ObjectHandle]) -> StoreResult<()> {
        for handle in handles {
            self.assign_permanent_id(*handle)?;
        }
        Ok(())
    }

    fn is_provisional(&self, handle: ObjectHandle) -> StoreResult<bool> {
        Ok(self.object(handle)?.permanent_id.is_none())
    }

    fn count(&self, entity: &EntityName) -> StoreResult<usize> {
        self.ensure_entity(entity)?;
        Ok(self
            .objects
            .values()
            .filter(|o| self.schema.is_kind_of(&o.entity, entity))
            .count())
    }

    fn has_changes(&self) -> bool {
        self.dirty
    }

    fn save(&mut self) -> StoreResult<()> {
        let mut provisional: Vec<_> = self
            .objects
            .iter()
            .filter(|(_, o)| o.permanent_id.is_none())
            .map(|(h, _)| *h)
            .collect();
        provisional.sort();
        self.assign_permanent_identities(&provisional)?;

        self.saved = Snapshot {
            objects: self.objects.clone(),
            next_permanent_id: self.next_permanent_id,
        };
        self.dirty = false;
        debug!(objects = self.objects.len(), "memory store saved");
        Ok(())
    }

    fn rollback(&mut self) {
        let Snapshot {
            objects,
            next_permanent_id,
        } = self.saved.clone();
        self.objects = objects;
        self.next_permanent_id = next_permanent_id;
        self.dirty = false;
        debug!(objects = self.objects.len(), "memory store rolled back");
    }
}
