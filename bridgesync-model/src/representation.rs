use crate::ids::{AttributeKey, EntityName, RelationshipKey, UniquingId};
use crate::merge::MergePolicy;
use std::collections::BTreeMap;

/// Attribute values of a representation, last write wins.
pub type Attributes = BTreeMap<AttributeKey, serde_json::Value>;

/// One remote record translated into local-store terms.
///
/// Produced by the bridge translator; immutable once built and holds no
/// reference into the store.
#[derive(Debug, Clone)]
pub struct MixedRepresentation<M> {
    pub entity: EntityName,
    pub uniquing_id: Option<UniquingId>,
    pub attributes: Attributes,
    /// `None` clears the relationship.
    pub relationships: BTreeMap<RelationshipKey, Option<MixedRelationship<M>>>,
}

/// The translated sub-records of one relationship.
#[derive(Debug, Clone)]
pub struct MixedRelationship<M> {
    pub representations: Vec<MixedRepresentation<M>>,
    pub merge_policy: MergePolicy,
    pub metadata: Option<M>,
}

impl<M> MixedRepresentation<M> {
    pub fn new(entity: impl Into<EntityName>) -> Self {
        Self {
            entity: entity.into(),
            uniquing_id: None,
            attributes: Attributes::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn with_uniquing_id(mut self, id: impl Into<UniquingId>) -> Self {
        self.uniquing_id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_relationship(
        mut self,
        key: &str,
        representations: Vec<MixedRepresentation<M>>,
        merge_policy: MergePolicy,
    ) -> Self {
        self.relationships.insert(
            key.to_string(),
            Some(MixedRelationship {
                representations,
                merge_policy,
                metadata: None,
            }),
        );
        self
    }

    pub fn with_cleared_relationship(mut self, key: &str) -> Self {
        self.relationships.insert(key.to_string(), None);
        self
    }
}

/// A fully resolved object tree, ready for import.
///
/// Same shape as [`MixedRepresentation`]; relationship values are nested
/// object lists carrying their merge policy and metadata. Acyclic by
/// construction.
#[derive(Debug, Clone)]
pub struct GenericLocalObject<M> {
    pub entity: EntityName,
    pub uniquing_id: Option<UniquingId>,
    pub attributes: Attributes,
    /// `None` clears the relationship.
    pub relationships: BTreeMap<RelationshipKey, Option<RelationshipValue<M>>>,
}

/// The resolved children of one relationship.
#[derive(Debug, Clone)]
pub struct RelationshipValue<M> {
    pub objects: Vec<GenericLocalObject<M>>,
    pub merge_policy: MergePolicy,
    pub metadata: Option<M>,
}

impl<M> GenericLocalObject<M> {
    pub fn new(entity: impl Into<EntityName>) -> Self {
        Self {
            entity: entity.into(),
            uniquing_id: None,
            attributes: Attributes::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn with_uniquing_id(mut self, id: impl Into<UniquingId>) -> Self {
        self.uniquing_id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_relationship(
        mut self,
        key: &str,
        objects: Vec<GenericLocalObject<M>>,
        merge_policy: MergePolicy,
    ) -> Self {
        self.relationships.insert(
            key.to_string(),
            Some(RelationshipValue {
                objects,
                merge_policy,
                metadata: None,
            }),
        );
        self
    }

    pub fn with_cleared_relationship(mut self, key: &str) -> Self {
        self.relationships.insert(key.to_string(), None);
        self
    }

    /// Whether importing this object writes anything beyond its identity.
    pub fn has_attributes_or_relationships(&self) -> bool {
        !self.attributes.is_empty() || !self.relationships.is_empty()
    }
}
