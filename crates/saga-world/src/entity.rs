//! Typed world entities
//!
//! Every entity is addressed by a [`TypedId`]: its [`EntityKind`] plus a
//! string id. Ids are only unique within a kind.

use crate::operator::{AttributeError, Operator};
use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attribute key exposing the entity id (read-only)
pub const ATTR_ENTITY_ID: &str = "EntityId";
/// Attribute key exposing the entity kind (read-only)
pub const ATTR_ENTITY_KIND: &str = "EntityType";
/// Attribute key exposing the soft-delete flag
pub const ATTR_DESTROYED: &str = "IsDestroyed";

/// Kind of world entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Objects that can be carried or placed
    Item,
    /// People and creatures
    Character,
    /// Locations
    Place,
}

impl EntityKind {
    /// All kinds, in storage order
    pub const ALL: [EntityKind; 3] = [Self::Item, Self::Character, Self::Place];

    /// Name used on the wire
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Item => "Item",
            Self::Character => "Character",
            Self::Place => "Place",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown entity kind name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for EntityKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "item" => Ok(Self::Item),
            "character" => Ok(Self::Character),
            "place" => Ok(Self::Place),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

/// Entity address: kind plus id
///
/// Two `TypedId`s are equal iff both fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypedId {
    /// Entity kind
    pub kind: EntityKind,
    /// Entity id within its kind
    pub id: String,
}

impl TypedId {
    /// Create from kind and id
    #[inline]
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for TypedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A world entity with free-form attributes and a soft-delete flag
///
/// Destroyed entities stay in the world state for audit and undo, but are
/// skipped by default lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    kind: EntityKind,
    id: String,
    #[serde(default)]
    attributes: ValueMap,
    #[serde(default)]
    destroyed: bool,
}

impl Entity {
    /// Create from kind and id
    #[inline]
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            attributes: ValueMap::new(),
            destroyed: false,
        }
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Id within the kind
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Kind and id together
    #[inline]
    #[must_use]
    pub fn typed_id(&self) -> TypedId {
        TypedId::new(self.kind, self.id.clone())
    }

    /// Soft-deleted flag
    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Dynamic attributes, in insertion order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &ValueMap {
        &self.attributes
    }

    /// Look up a dynamic attribute
    #[inline]
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Check for a core or dynamic attribute
    #[must_use]
    pub fn has_attribute(&self, key: &str) -> bool {
        is_core_field(key) || self.attributes.contains_key(key)
    }

    pub(crate) fn set_destroyed(&mut self, destroyed: bool) {
        self.destroyed = destroyed;
    }

    /// Assign an attribute
    ///
    /// `IsDestroyed` accepts booleans only; `EntityId` and `EntityType` are
    /// read-only.
    pub(crate) fn set_attribute(&mut self, key: &str, value: Value) -> Result<(), AttributeError> {
        if key.eq_ignore_ascii_case(ATTR_ENTITY_ID) || key.eq_ignore_ascii_case(ATTR_ENTITY_KIND) {
            return Err(AttributeError::ReadOnly(key.to_string()));
        }

        if key.eq_ignore_ascii_case(ATTR_DESTROYED) {
            return match value {
                Value::Bool(b) => {
                    self.destroyed = b;
                    Ok(())
                }
                other => Err(AttributeError::TypeMismatch {
                    key: key.to_string(),
                    expected: "bool",
                    found: other.type_name(),
                }),
            };
        }

        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    /// Apply `op` with `value` to the attribute at `key`
    ///
    /// Core fields only support [`Operator::Equal`]. The attribute is left
    /// untouched when the operator fails.
    pub(crate) fn modify_attribute(
        &mut self,
        key: &str,
        op: Operator,
        value: &Value,
    ) -> Result<(), AttributeError> {
        if is_core_field(key) {
            if op != Operator::Equal {
                return Err(AttributeError::CoreOperator {
                    key: key.to_string(),
                    op,
                });
            }
            return self.set_attribute(key, value.clone());
        }

        match op.apply(key, self.attributes.get(key), value)? {
            Some(next) => {
                self.attributes.insert(key.to_string(), next);
            }
            None => {
                tracing::trace!("{}: '{}' unchanged by '{}'", self.typed_id(), key, op);
            }
        }
        Ok(())
    }

    /// Remove a dynamic attribute; core fields are never removed
    pub(crate) fn remove_attribute(&mut self, key: &str) -> bool {
        if is_core_field(key) {
            return false;
        }
        self.attributes.shift_remove(key).is_some()
    }
}

fn is_core_field(key: &str) -> bool {
    [ATTR_ENTITY_ID, ATTR_ENTITY_KIND, ATTR_DESTROYED]
        .iter()
        .any(|core| core.eq_ignore_ascii_case(key))
}
