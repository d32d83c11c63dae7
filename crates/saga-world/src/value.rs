//! Dynamically typed attribute values
//!
//! [`Value`] is the payload stored in entity attributes, game-state settings
//! and block metadata. The modify operators in [`crate::Operator`] are
//! defined over it.

use crate::entity::TypedId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Insertion-ordered string keyed map of values
pub type ValueMap = IndexMap<String, Value>;

/// A dynamically typed value
///
/// Serializes untagged, so `5` reads back as [`Value::Int`] and `5.5` as
/// [`Value::Float`]. References are wrapped as `{"$ref": {kind, id}}`, so a
/// plain map that happens to hold `kind` and `id` stays a [`Value::Map`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent / null
    #[default]
    Null,

    /// Boolean
    Bool(bool),

    /// Signed integer
    Int(i64),

    /// Floating point number
    Float(f64),

    /// Text
    Text(String),

    /// Ordered list
    List(Vec<Value>),

    /// Reference to another entity
    #[serde(
        serialize_with = "ref_form::serialize",
        deserialize_with = "ref_form::deserialize"
    )]
    Ref(TypedId),

    /// Nested map
    Map(ValueMap),
}

mod ref_form {
    use crate::entity::TypedId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Wrapped<T> {
        #[serde(rename = "$ref")]
        target: T,
    }

    pub(super) fn serialize<S>(target: &TypedId, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Wrapped { target }.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<TypedId, D::Error>
    where
        D: Deserializer<'de>,
    {
        Wrapped::<TypedId>::deserialize(deserializer).map(|wrapped| wrapped.target)
    }
}

impl Value {
    /// Check for [`Value::Null`]
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, used in diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Ref(_) => "ref",
            Self::Map(_) => "map",
        }
    }

    /// Boolean payload
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float payload
    #[inline]
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text payload
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// List payload
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map payload
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Ref(target) => write!(f, "@{target}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<TypedId> for Value {
    fn from(target: TypedId) -> Self {
        Self::Ref(target)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Self::Map(map)
    }
}

/// Import loosely typed JSON coming from a collaborator
///
/// Integral numbers become [`Value::Int`]; objects carrying exactly a `kind`
/// and an `id` that parse as a [`TypedId`] become [`Value::Ref`].
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Int(i),
                (None, Some(x)) => Self::Float(x),
                _ => Self::Text(n.to_string()),
            },
            Json::String(s) => Self::Text(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Json::Object(map) => {
                if map.len() == 2 && map.contains_key("kind") && map.contains_key("id") {
                    if let Ok(target) =
                        serde_json::from_value::<TypedId>(Json::Object(map.clone()))
                    {
                        return Self::Ref(target);
                    }
                }
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use serde_json::json;

    #[test]
    fn json_numbers_keep_integer_identity() {
        assert_eq!(Value::from(json!(3)), Value::Int(3));
        assert_eq!(Value::from(json!(2.5)), Value::Float(2.5));
    }

    #[test]
    fn json_typed_id_object_becomes_ref() {
        let v = Value::from(json!({"kind": "Character", "id": "hero"}));
        assert_eq!(v, Value::Ref(TypedId::new(EntityKind::Character, "hero")));

        let v = Value::from(json!({"kind": "Character", "id": "hero", "extra": 1}));
        assert!(v.as_map().is_some());
    }

    #[test]
    fn untagged_round_trip_preserves_variants() {
        let mut map = ValueMap::new();
        map.insert("hp".into(), Value::Int(10));
        map.insert("home".into(), TypedId::new(EntityKind::Place, "inn").into());
        map.insert("tags".into(), Value::List(vec!["brave".into(), 1.5.into()]));

        let text = serde_json::to_string(&Value::Map(map.clone())).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, Value::Map(map));
    }

    #[test]
    fn plain_map_with_kind_and_id_stays_a_map() {
        let mut map = ValueMap::new();
        map.insert("kind".into(), Value::from("Item"));
        map.insert("id".into(), Value::from("x"));

        let text = serde_json::to_string(&Value::Map(map.clone())).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, Value::Map(map));

        let reference = Value::Ref(TypedId::new(EntityKind::Item, "x"));
        let text = serde_json::to_string(&reference).unwrap();
        assert_eq!(text, r#"{"$ref":{"kind":"Item","id":"x"}}"#);
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), reference);
    }

    #[test]
    fn display_is_readable() {
        let v = Value::List(vec![Value::Int(1), Value::Text("a".into())]);
        assert_eq!(v.to_string(), "[1, \"a\"]");
    }
}
