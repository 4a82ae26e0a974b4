//! The uniquing importer.
//!
//! Turns a [`GenericLocalObject`] tree into store mutations. Objects are
//! deduplicated by `(entity, uniquing id)` across the whole import: the
//! existing map is prefetched once per entity and shared by every nested
//! relationship import, so two representations of the same record anywhere
//! in the tree resolve to one store object.
//!
//! The importer runs inside the store context and is never interrupted by
//! cancellation. It performs no rollback on failure; the caller owns the
//! store transaction.

use crate::error::{ImportError, ImportResult};
use crate::graph::UniquingIdsByEntity;
use bridgesync_model::{
    EntityName, GenericLocalObject, ImportChangeSet, ImportedObject, LocalStore, MergePolicy,
    ObjectHandle, RelationshipSchema, RelationshipUpdate, Schema, UniquingId,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Importer settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    /// Attribute holding the uniquing ID on every imported entity.
    pub uniquing_attribute: String,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            uniquing_attribute: "remote_id".to_string(),
        }
    }
}

type ExistingObjects = HashMap<(EntityName, UniquingId), ObjectHandle>;

/// Imports one object tree into a local store.
#[derive(Debug)]
pub struct UniquingImporter<M> {
    objects: Vec<GenericLocalObject<M>>,
    root_metadata: Option<M>,
    uniquing_ids: UniquingIdsByEntity,
    update_target: Option<ObjectHandle>,
    config: ImporterConfig,
}

/// State shared by the recursive calls of one import.
struct ImportRun<'a> {
    store: &'a mut dyn LocalStore,
    existing: ExistingObjects,
    /// Everything inserted so far, at any depth.
    inserted: HashSet<ObjectHandle>,
}

impl<M: Clone> UniquingImporter<M> {
    /// Creates an importer with the default configuration.
    pub fn new(
        objects: Vec<GenericLocalObject<M>>,
        root_metadata: Option<M>,
        uniquing_ids: UniquingIdsByEntity,
    ) -> ImportResult<Self> {
        Self::with_config(ImporterConfig::default(), objects, root_metadata, uniquing_ids)
    }

    /// Creates an importer, rejecting representations that misuse the
    /// uniquing attribute.
    pub fn with_config(
        config: ImporterConfig,
        objects: Vec<GenericLocalObject<M>>,
        root_metadata: Option<M>,
        uniquing_ids: UniquingIdsByEntity,
    ) -> ImportResult<Self> {
        validate(&objects, &config.uniquing_attribute)?;
        Ok(Self {
            objects,
            root_metadata,
            uniquing_ids,
            update_target: None,
            config,
        })
    }

    /// Binds the root representation to an existing object.
    pub fn with_update_target(mut self, target: Option<ObjectHandle>) -> Self {
        self.update_target = target;
        self
    }

    pub fn objects(&self) -> &[GenericLocalObject<M>] {
        &self.objects
    }

    pub fn into_objects(self) -> Vec<GenericLocalObject<M>> {
        self.objects
    }

    /// Runs the import. Must be called inside the store context.
    pub fn import(&self, store: &mut dyn LocalStore) -> ImportResult<ImportChangeSet<M>> {
        check_declared(store.schema(), &self.objects, &self.config.uniquing_attribute)?;
        let existing = self.prefetch(store)?;
        let mut run = ImportRun {
            store,
            existing,
            inserted: HashSet::new(),
        };

        let mut changes = ImportChangeSet::new(self.root_metadata.clone());
        let target = match self.update_target {
            Some(target) => self.bind_update_target(&mut run, target, &mut changes)?,
            None => None,
        };
        let level = self.import_level(&mut run, &self.objects, self.root_metadata.clone(), target)?;
        changes.absorb(&level);
        changes.imported_objects = level.imported_objects;

        let mut inserted: Vec<_> = changes.inserted.iter().copied().collect();
        inserted.sort();
        run.store.assign_permanent_identities(&inserted)?;

        debug!(
            inserted = changes.inserted.len(),
            updated = changes.updated.len(),
            deleted = changes.deleted.len(),
            "import finished"
        );
        Ok(changes)
    }

    fn prefetch(&self, store: &dyn LocalStore) -> ImportResult<ExistingObjects> {
        let attribute = &self.config.uniquing_attribute;
        let mut existing = ExistingObjects::new();
        for (entity, ids) in &self.uniquing_ids {
            if ids.is_empty() {
                continue;
            }
            for (id, handle) in store.lookup_by_uniquing_ids(entity, attribute, ids)? {
                existing.insert((entity.clone(), id), handle);
            }
        }
        debug!(
            entities = self.uniquing_ids.len(),
            found = existing.len(),
            "prefetched existing objects"
        );
        Ok(existing)
    }

    /// Applies the update target to the root level. Returns the target if it
    /// is left for a representation without a uniquing ID to claim.
    fn bind_update_target(
        &self,
        run: &mut ImportRun<'_>,
        target: ObjectHandle,
        changes: &mut ImportChangeSet<M>,
    ) -> ImportResult<Option<ObjectHandle>> {
        if self.objects.len() > 1 {
            return Err(ImportError::TooManyRepresentationsToUpdateObject {
                count: self.objects.len(),
            });
        }
        let Some(representation) = self.objects.first() else {
            return Ok(None);
        };
        if !run.store.contains(target) {
            debug!(%target, "update target no longer exists, ignoring it");
            return Ok(None);
        }

        let target_entity = run.store.entity_of(target)?;
        if !run.store.schema().is_kind_of(&target_entity, &representation.entity) {
            return Err(ImportError::EntityMismatch {
                target: target_entity,
                representation: representation.entity.clone(),
            });
        }

        let Some(id) = &representation.uniquing_id else {
            return Ok(Some(target));
        };
        let key = (representation.entity.clone(), id.clone());
        match run.existing.get(&key).copied() {
            Some(bound) if bound != target => {
                info!(%target, uniquing_id = %id, "another object holds the uniquing id, deleting update target");
                run.store.delete_object(target)?;
                changes.deleted.insert(target);
                run.existing.retain(|_, handle| *handle != target);
            }
            _ => {
                let attribute = &self.config.uniquing_attribute;
                let wanted = id.to_value();
                let current = run.store.attribute(target, attribute)?;
                if current.as_ref() != Some(&wanted) {
                    if current.as_ref().is_some_and(|v| !v.is_null()) {
                        warn!(%target, uniquing_id = %id, "rebinding update target to a new uniquing id");
                    }
                    run.store.set_attribute(target, attribute, wanted)?;
                    changes.updated.insert(target);
                }
                run.existing.insert(key, target);
            }
        }
        Ok(None)
    }

    fn import_level(
        &self,
        run: &mut ImportRun<'_>,
        objects: &[GenericLocalObject<M>],
        metadata: Option<M>,
        mut target: Option<ObjectHandle>,
    ) -> ImportResult<ImportChangeSet<M>> {
        let mut changes = ImportChangeSet::new(metadata);
        let sole = objects.len() == 1;

        for object in objects {
            let handle = self.resolve(run, object, sole, &mut target, &mut changes)?;

            for (key, value) in &object.attributes {
                run.store.set_attribute(handle, key, value.clone())?;
            }

            let mut imported = ImportedObject::new(handle);
            for (key, value) in &object.relationships {
                let relationship = run
                    .store
                    .schema()
                    .relationship(&object.entity, key)
                    .cloned()
                    .ok_or_else(|| ImportError::UnknownRelationship {
                        entity: object.entity.clone(),
                        key: key.clone(),
                    })?;

                match value {
                    None => {
                        run.store.set_relationship(handle, key, RelationshipUpdate::Clear)?;
                        imported.relationships.insert(key.clone(), None);
                    }
                    Some(value) => {
                        let nested =
                            self.import_level(run, &value.objects, value.metadata.clone(), None)?;
                        let children = nested.handles();
                        apply_merge(&mut *run.store, handle, &relationship, &value.merge_policy, &children)?;
                        changes.absorb(&nested);
                        imported.relationships.insert(key.clone(), Some(nested));
                    }
                }
            }
            changes.imported_objects.push(imported);
        }
        Ok(changes)
    }

    /// Finds or creates the store object for one representation.
    fn resolve(
        &self,
        run: &mut ImportRun<'_>,
        object: &GenericLocalObject<M>,
        sole: bool,
        target: &mut Option<ObjectHandle>,
        changes: &mut ImportChangeSet<M>,
    ) -> ImportResult<ObjectHandle> {
        if let Some(id) = &object.uniquing_id {
            let key = (object.entity.clone(), id.clone());
            if let Some(handle) = run.existing.get(&key).copied() {
                if object.has_attributes_or_relationships() && !run.inserted.contains(&handle) {
                    changes.updated.insert(handle);
                }
                return Ok(handle);
            }
            let handle = run.store.create_object(&object.entity)?;
            run.store
                .set_attribute(handle, &self.config.uniquing_attribute, id.to_value())?;
            run.existing.insert(key, handle);
            run.inserted.insert(handle);
            changes.inserted.insert(handle);
            return Ok(handle);
        }

        if sole {
            if let Some(handle) = target.take() {
                changes.updated.insert(handle);
                return Ok(handle);
            }
        }
        let handle = run.store.create_object(&object.entity)?;
        run.inserted.insert(handle);
        changes.inserted.insert(handle);
        Ok(handle)
    }
}

/// Writes resolved children into a relationship according to its
/// cardinality and the requested policy.
fn apply_merge(
    store: &mut dyn LocalStore,
    handle: ObjectHandle,
    relationship: &RelationshipSchema,
    policy: &MergePolicy,
    children: &[ObjectHandle],
) -> ImportResult<()> {
    let key = relationship.name.as_str();
    if !relationship.is_to_many() {
        if !policy.is_replace() {
            info!(relationship = key, ?policy, "merge policy ignored on a to-one relationship, replacing");
        }
        if children.len() > 1 {
            info!(relationship = key, count = children.len(), "several values for a to-one relationship, keeping the first");
        }
        store.set_relationship(handle, key, RelationshipUpdate::ToOne(children.first().copied()))?;
        return Ok(());
    }

    let update = match policy {
        MergePolicy::Replace => RelationshipUpdate::Replace(children.to_vec()),
        MergePolicy::Append => RelationshipUpdate::Append(children.to_vec()),
        MergePolicy::InsertAtBeginning if relationship.is_ordered() => {
            RelationshipUpdate::Prepend(children.to_vec())
        }
        MergePolicy::InsertAtBeginning => RelationshipUpdate::Append(children.to_vec()),
        MergePolicy::Custom(handler) => {
            handler(store, handle, key, children)?;
            return Ok(());
        }
    };
    store.set_relationship(handle, key, update)?;
    Ok(())
}

/// Every imported entity must carry the uniquing attribute, possibly
/// through a parent entity.
fn check_declared<M>(schema: &Schema, objects: &[GenericLocalObject<M>], attribute: &str) -> ImportResult<()> {
    for object in objects {
        if !schema.has_attribute(&object.entity, attribute) {
            return Err(ImportError::InvalidRepresentation {
                entity: object.entity.clone(),
                reason: format!("{} does not declare {attribute}", object.entity),
            });
        }
        for value in object.relationships.values().flatten() {
            check_declared(schema, &value.objects, attribute)?;
        }
    }
    Ok(())
}

fn validate<M>(objects: &[GenericLocalObject<M>], attribute: &str) -> ImportResult<()> {
    for object in objects {
        let invalid = |reason: String| ImportError::InvalidRepresentation {
            entity: object.entity.clone(),
            reason,
        };
        if object.relationships.contains_key(attribute) {
            return Err(invalid(format!("{attribute} used as a relationship key")));
        }
        if let Some(value) = object.attributes.get(attribute) {
            match &object.uniquing_id {
                Some(id) if id.to_value() == *value => {}
                Some(id) => {
                    return Err(invalid(format!("{attribute} is {value} but the uniquing id is {id}")));
                }
                None if value.is_null() => {}
                None => return Err(invalid(format!("{attribute} set without a uniquing id"))),
            }
        }
        for value in object.relationships.values().flatten() {
            validate(&value.objects, attribute)?;
        }
    }
    Ok(())
}
