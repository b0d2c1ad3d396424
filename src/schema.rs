//! Entity type definitions and the schema registry.
//!
//! There is no reflection here: each entity type registers a field table
//! (name to declared kind) and its relation declarations up front, and the
//! store resolves type-erased property access through that table at call
//! time. Undeclared names fail with `UnknownProperty`/`UnknownRelation`
//! instead of silently materializing fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult, ValidationError};
use crate::value::{Value, ValueKind};

/// Whether a relation keeps its members in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Unordered membership; iteration order is unspecified but stable.
    Set,
    /// Members keep the order they were added in.
    OrderedSet,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => write!(f, "set"),
            Self::OrderedSet => write!(f, "ordered_set"),
        }
    }
}

/// Declared field: value kind plus whether a committed record must carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Kind of value the field accepts.
    pub kind: ValueKind,
    /// Required fields must be non-null when a new record is saved.
    pub required: bool,
}

/// Declared relation: ordering behavior plus the target entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Set or ordered set.
    pub kind: RelationKind,
    /// Entity type the members must belong to.
    pub target: String,
}

/// One entity type: a named table of fields and relations.
///
/// # Examples
///
/// ```
/// use fetchkit::{EntityDef, RelationKind, ValueKind};
///
/// let track = EntityDef::new("track")
///     .field("isrc", ValueKind::String)
///     .required_field("title", ValueKind::String)
///     .relation("tags", RelationKind::Set, "tag");
/// assert_eq!(track.name(), "track");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    name: String,
    fields: BTreeMap<String, FieldDef>,
    relations: BTreeMap<String, RelationDef>,
}

impl EntityDef {
    /// Creates an empty entity type definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Declares an optional field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.fields
            .insert(name.into(), FieldDef { kind, required: false });
        self
    }

    /// Declares a field that must be present when a new record is saved.
    #[must_use]
    pub fn required_field(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.fields
            .insert(name.into(), FieldDef { kind, required: true });
        self
    }

    /// Declares a relation to records of `target`.
    #[must_use]
    pub fn relation(
        mut self,
        name: impl Into<String>,
        kind: RelationKind,
        target: impl Into<String>,
    ) -> Self {
        self.relations.insert(
            name.into(),
            RelationDef {
                kind,
                target: target.into(),
            },
        );
        self
    }

    /// Name of this entity type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a declared field.
    #[must_use]
    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Looks up a declared relation.
    #[must_use]
    pub fn relation_def(&self, name: &str) -> Option<&RelationDef> {
        self.relations.get(name)
    }

    /// Iterates declared fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolves a field or fails with `UnknownProperty`.
    pub fn expect_field(&self, name: &str) -> StoreResult<&FieldDef> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyFieldName.into());
        }
        self.fields
            .get(name)
            .ok_or_else(|| StoreError::UnknownProperty {
                entity: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Resolves a relation or fails with `UnknownRelation`.
    pub fn expect_relation(&self, name: &str) -> StoreResult<&RelationDef> {
        self.relations
            .get(name)
            .ok_or_else(|| StoreError::UnknownRelation {
                entity: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Checks one value against a field's declared kind.
    pub fn check_value(&self, field: &str, value: &Value) -> StoreResult<()> {
        let def = self.expect_field(field)?;
        if def.kind.accepts(value) {
            Ok(())
        } else {
            Err(ValidationError::TypeMismatch {
                entity: self.name.clone(),
                field: field.to_string(),
                expected: def.kind.to_string(),
                actual: value.type_name().to_string(),
            }
            .into())
        }
    }
}

/// Registry of entity types a store serves.
///
/// # Examples
///
/// ```
/// use fetchkit::{EntityDef, Schema, ValueKind};
///
/// let schema = Schema::new()
///     .entity(EntityDef::new("track").field("isrc", ValueKind::String));
/// assert!(schema.entity_def("track").is_some());
/// assert!(schema.entity_def("album").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    entities: BTreeMap<String, EntityDef>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type, replacing any previous definition of the
    /// same name.
    #[must_use]
    pub fn entity(mut self, def: EntityDef) -> Self {
        self.entities.insert(def.name.clone(), def);
        self
    }

    /// Looks up an entity type.
    #[must_use]
    pub fn entity_def(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Resolves an entity type or fails with `UnknownEntityType`.
    pub fn expect_entity(&self, name: &str) -> StoreResult<&EntityDef> {
        self.entities
            .get(name)
            .ok_or_else(|| StoreError::UnknownEntityType {
                name: name.to_string(),
            })
    }

    /// Number of registered entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entity types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
