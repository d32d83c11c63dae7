//! Modify operators
//!
//! - `=` replaces the attribute
//! - `+=` adds numbers, concatenates text, unions lists and merges maps
//! - `-=` subtracts numbers, removes list items and removes map keys
//!
//! Mixed numeric pairings (int with float) are rejected rather than
//! silently widened.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operator carried by a `Modify` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Replace the current value
    #[serde(rename = "=")]
    Equal,
    /// Combine with the current value
    #[serde(rename = "+=")]
    Add,
    /// Remove from the current value
    #[serde(rename = "-=")]
    Subtract,
}

impl Operator {
    /// Wire symbol (`=`, `+=`, `-=`)
    #[inline]
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Add => "+=",
            Self::Subtract => "-=",
        }
    }

    /// Compute the next value of attribute `key`
    ///
    /// Returns `Ok(None)` when the attribute stays as it is (subtracting from
    /// an absent attribute).
    pub fn apply(
        self,
        key: &str,
        current: Option<&Value>,
        value: &Value,
    ) -> Result<Option<Value>, AttributeError> {
        let current = current.filter(|v| !v.is_null());

        match self {
            Self::Equal => Ok(Some(value.clone())),
            Self::Add => match current {
                None => Ok(Some(value.clone())),
                Some(current) => add(key, current, value).map(Some),
            },
            Self::Subtract => match current {
                None => Ok(None),
                Some(current) => subtract(key, current, value).map(Some),
            },
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Self::Equal),
            "+=" => Ok(Self::Add),
            "-=" => Ok(Self::Subtract),
            other => Err(AttributeError::UnknownOperator(other.to_string())),
        }
    }
}

/// Failure applying an operator to an attribute
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributeError {
    /// Core field that can never be assigned
    #[error("attribute '{0}' is read-only")]
    ReadOnly(String),

    /// Core field only accepts plain assignment
    #[error("core attribute '{key}' does not support operator '{op}'")]
    CoreOperator {
        /// Attribute key
        key: String,
        /// Rejected operator
        op: Operator,
    },

    /// Operand of the wrong shape
    #[error("attribute '{key}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Attribute key
        key: String,
        /// Expected type name
        expected: &'static str,
        /// Provided type name
        found: &'static str,
    },

    /// Operator undefined for this pairing of types
    #[error("operator '{op}' unsupported for {current} and {operand} on '{key}'")]
    Unsupported {
        /// Attribute key
        key: String,
        /// Operator
        op: Operator,
        /// Type of the current value
        current: &'static str,
        /// Type of the operand
        operand: &'static str,
    },

    /// Integer arithmetic left the i64 range
    #[error("integer overflow on '{0}'")]
    Overflow(String),

    /// Operator symbol not recognized
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
}

impl AttributeError {
    fn unsupported(key: &str, op: Operator, current: &Value, operand: &Value) -> Self {
        Self::Unsupported {
            key: key.to_string(),
            op,
            current: current.type_name(),
            operand: operand.type_name(),
        }
    }
}

fn add(key: &str, current: &Value, value: &Value) -> Result<Value, AttributeError> {
    match (current, value) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| AttributeError::Overflow(key.to_string())),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{a}{b}"))),
        (Value::List(items), operand) => {
            let mut items = items.clone();
            let incoming: &[Value] = match operand {
                Value::List(more) => more,
                single => std::slice::from_ref(single),
            };
            for item in incoming {
                if !items.contains(item) {
                    items.push(item.clone());
                }
            }
            Ok(Value::List(items))
        }
        (Value::Map(map), Value::Map(more)) => {
            let mut map = map.clone();
            for (k, v) in more {
                map.insert(k.clone(), v.clone());
            }
            Ok(Value::Map(map))
        }
        (Value::Map(_), other) => Err(AttributeError::TypeMismatch {
            key: key.to_string(),
            expected: "map",
            found: other.type_name(),
        }),
        (current, operand) => Err(AttributeError::unsupported(
            key,
            Operator::Add,
            current,
            operand,
        )),
    }
}

fn subtract(key: &str, current: &Value, value: &Value) -> Result<Value, AttributeError> {
    match (current, value) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map(Value::Int)
            .ok_or_else(|| AttributeError::Overflow(key.to_string())),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
        (Value::List(items), operand) => {
            let removed: &[Value] = match operand {
                Value::List(more) => more,
                single => std::slice::from_ref(single),
            };
            Ok(Value::List(
                items
                    .iter()
                    .filter(|item| !removed.contains(item))
                    .cloned()
                    .collect(),
            ))
        }
        (Value::Map(map), Value::Text(k)) => {
            let mut map = map.clone();
            map.shift_remove(k);
            Ok(Value::Map(map))
        }
        (Value::Map(map), Value::List(keys)) => {
            let mut map = map.clone();
            for k in keys {
                match k {
                    Value::Text(k) => {
                        map.shift_remove(k);
                    }
                    other => {
                        return Err(AttributeError::TypeMismatch {
                            key: key.to_string(),
                            expected: "text key",
                            found: other.type_name(),
                        })
                    }
                }
            }
            Ok(Value::Map(map))
        }
        (current, operand) => Err(AttributeError::unsupported(
            key,
            Operator::Subtract,
            current,
            operand,
        )),
    }
}
