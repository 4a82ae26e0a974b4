use crate::ids::EntityName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Describes an entity type: its attributes, relationships and parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: EntityName,
    /// Parent entity; attributes and relationships are inherited from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityName>,
    pub attributes: Vec<String>,
    pub relationships: Vec<RelationshipSchema>,
}

impl EntitySchema {
    pub fn new(name: impl Into<EntityName>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Declares the parent entity.
    pub fn with_parent(mut self, parent: impl Into<EntityName>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declares an attribute.
    pub fn attribute(mut self, name: &str) -> Self {
        self.attributes.push(name.to_string());
        self
    }

    /// Declares a relationship.
    pub fn relationship(mut self, relationship: RelationshipSchema) -> Self {
        self.relationships.push(relationship);
        self
    }
}

/// A relationship from one entity to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipSchema {
    pub name: String,
    pub destination: EntityName,
    pub cardinality: Cardinality,
}

impl RelationshipSchema {
    /// Shorthand for a to-one relationship.
    pub fn to_one(name: &str, destination: impl Into<EntityName>) -> Self {
        Self {
            name: name.into(),
            destination: destination.into(),
            cardinality: Cardinality::ToOne,
        }
    }

    /// Shorthand for an unordered to-many relationship.
    pub fn to_many(name: &str, destination: impl Into<EntityName>) -> Self {
        Self {
            name: name.into(),
            destination: destination.into(),
            cardinality: Cardinality::ToMany { ordered: false },
        }
    }

    /// Shorthand for an ordered to-many relationship.
    pub fn ordered(name: &str, destination: impl Into<EntityName>) -> Self {
        Self {
            name: name.into(),
            destination: destination.into(),
            cardinality: Cardinality::ToMany { ordered: true },
        }
    }

    pub fn is_to_many(&self) -> bool {
        matches!(self.cardinality, Cardinality::ToMany { .. })
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self.cardinality, Cardinality::ToMany { ordered: true })
    }
}

/// How many objects a relationship holds, and whether their order matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ToOne,
    ToMany { ordered: bool },
}

/// The full schema of a local store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    entities: HashMap<EntityName, EntitySchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity, replacing any previous entity of the same name.
    pub fn with_entity(mut self, entity: EntitySchema) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    pub fn entity(&self, name: &EntityName) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    pub fn contains(&self, name: &EntityName) -> bool {
        self.entities.contains_key(name)
    }

    /// Iterates over `name` and its ancestors, nearest first.
    /// Stops at the first unknown entity or on a parent cycle.
    pub fn lineage<'a>(&'a self, name: &EntityName) -> impl Iterator<Item = &'a EntitySchema> + use<'a> {
        let mut next = self.entities.get(name);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.parent.as_ref().and_then(|p| self.entities.get(p));
            Some(current)
        })
        .take(self.entities.len())
    }

    /// Whether `entity` is `ancestor` or one of its sub-entities.
    pub fn is_kind_of(&self, entity: &EntityName, ancestor: &EntityName) -> bool {
        self.lineage(entity).any(|e| &e.name == ancestor)
    }

    /// Whether the entity (or one of its ancestors) declares the attribute.
    pub fn has_attribute(&self, entity: &EntityName, attribute: &str) -> bool {
        self.lineage(entity)
            .any(|e| e.attributes.iter().any(|a| a == attribute))
    }

    /// Finds a relationship on the entity or one of its ancestors.
    pub fn relationship(&self, entity: &EntityName, key: &str) -> Option<&RelationshipSchema> {
        self.lineage(entity)
            .find_map(|e| e.relationships.iter().find(|r| r.name == key))
    }
}
