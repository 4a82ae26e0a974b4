use crate::ids::{ObjectHandle, RelationshipKey};
use std::collections::{BTreeMap, HashSet};

/// What one import call did to the store.
///
/// `imported_objects` mirrors the imported tree: only the first level is
/// listed here, deeper objects hang off [`ImportedObject::relationships`].
/// The flat sets hold the objects this call explicitly touched, including
/// those touched by nested relationship imports.
#[derive(Debug, Clone)]
pub struct ImportChangeSet<M> {
    pub metadata: Option<M>,
    pub imported_objects: Vec<ImportedObject<M>>,
    pub inserted: HashSet<ObjectHandle>,
    pub updated: HashSet<ObjectHandle>,
    pub deleted: HashSet<ObjectHandle>,
}

/// One imported object and the relationships written on it.
#[derive(Debug, Clone)]
pub struct ImportedObject<M> {
    pub handle: ObjectHandle,
    /// `None` marks a cleared relationship.
    pub relationships: BTreeMap<RelationshipKey, Option<ImportChangeSet<M>>>,
}

impl<M> ImportChangeSet<M> {
    pub fn new(metadata: Option<M>) -> Self {
        Self {
            metadata,
            imported_objects: Vec::new(),
            inserted: HashSet::new(),
            updated: HashSet::new(),
            deleted: HashSet::new(),
        }
    }

    /// Handles of the first-level imported objects, in import order.
    pub fn handles(&self) -> Vec<ObjectHandle> {
        self.imported_objects.iter().map(|o| o.handle).collect()
    }

    /// Folds the flat sets of a nested change set into this one.
    pub fn absorb(&mut self, nested: &ImportChangeSet<M>) {
        self.inserted.extend(nested.inserted.iter().copied());
        self.updated.extend(nested.updated.iter().copied());
        self.deleted.extend(nested.deleted.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.imported_objects.is_empty()
            && self.inserted.is_empty()
            && self.updated.is_empty()
            && self.deleted.is_empty()
    }
}

impl<M> ImportedObject<M> {
    pub fn new(handle: ObjectHandle) -> Self {
        Self {
            handle,
            relationships: BTreeMap::new(),
        }
    }

    /// The nested change set of a relationship, if it was imported (not cleared).
    pub fn relationship(&self, key: &str) -> Option<&ImportChangeSet<M>> {
        self.relationships.get(key).and_then(Option::as_ref)
    }

    pub fn was_cleared(&self, key: &str) -> bool {
        matches!(self.relationships.get(key), Some(None))
    }
}
