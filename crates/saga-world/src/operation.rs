//! Atomic operations and their results

use crate::entity::{EntityKind, TypedId};
use crate::operator::{AttributeError, Operator};
use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest unit of change against a [`crate::WorldState`]
///
/// Operations are plain data; rewriting one (see [`AtomicOperation::retarget`])
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum AtomicOperation {
    /// Create an entity with initial attributes
    Create {
        /// Entity kind
        kind: EntityKind,
        /// Entity id
        id: String,
        /// Attributes set on creation
        #[serde(default)]
        initial_attributes: ValueMap,
    },

    /// Change one attribute of a live entity
    Modify {
        /// Entity kind
        kind: EntityKind,
        /// Entity id
        id: String,
        /// Attribute key
        key: String,
        /// How `value` combines with the current attribute
        operator: Operator,
        /// Operand
        #[serde(default)]
        value: Value,
    },

    /// Soft-delete an entity
    Delete {
        /// Entity kind
        kind: EntityKind,
        /// Entity id
        id: String,
    },
}

impl AtomicOperation {
    /// Create an entity with no initial attributes
    #[must_use]
    pub fn create(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Create {
            kind,
            id: id.into(),
            initial_attributes: ValueMap::new(),
        }
    }

    /// Create an entity with initial attributes
    #[must_use]
    pub fn create_with(kind: EntityKind, id: impl Into<String>, initial_attributes: ValueMap) -> Self {
        Self::Create {
            kind,
            id: id.into(),
            initial_attributes,
        }
    }

    /// Modify one attribute
    #[must_use]
    pub fn modify(
        kind: EntityKind,
        id: impl Into<String>,
        key: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Modify {
            kind,
            id: id.into(),
            key: key.into(),
            operator,
            value: value.into(),
        }
    }

    /// Soft-delete an entity
    #[must_use]
    pub fn delete(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Delete { kind, id: id.into() }
    }

    /// Entity this operation addresses
    #[must_use]
    pub fn target(&self) -> TypedId {
        match self {
            Self::Create { kind, id, .. }
            | Self::Modify { kind, id, .. }
            | Self::Delete { kind, id } => TypedId::new(*kind, id.clone()),
        }
    }

    /// Check for [`AtomicOperation::Create`]
    #[inline]
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create { .. })
    }

    /// Attribute key of a `Modify`
    #[must_use]
    pub fn modify_key(&self) -> Option<&str> {
        match self {
            Self::Modify { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Copy of this operation addressed to `new_id` (same kind)
    #[must_use]
    pub fn retarget(&self, new_id: impl Into<String>) -> Self {
        let mut op = self.clone();
        match &mut op {
            Self::Create { id, .. } | Self::Modify { id, .. } | Self::Delete { id, .. } => {
                *id = new_id.into();
            }
        }
        op
    }
}

impl fmt::Display for AtomicOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { kind, id, .. } => write!(f, "create {kind}:{id}"),
            Self::Modify {
                kind,
                id,
                key,
                operator,
                value,
            } => write!(f, "modify {kind}:{id}.{key} {operator} {value}"),
            Self::Delete { kind, id } => write!(f, "delete {kind}:{id}"),
        }
    }
}

/// Why a single operation failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    /// Create over a live entity
    #[error("{0} already exists")]
    AlreadyExists(TypedId),

    /// Modify of a missing or destroyed entity
    #[error("{0} not found")]
    NotFound(TypedId),

    /// Modify missing its key or value
    #[error("invalid modify on {target}: {reason}")]
    InvalidModify {
        /// Addressed entity
        target: TypedId,
        /// What was missing
        reason: String,
    },

    /// Operator rejected the operand
    #[error("{target}: {source}")]
    Attribute {
        /// Addressed entity
        target: TypedId,
        /// Underlying failure
        #[source]
        source: AttributeError,
    },
}

impl OperationError {
    pub(crate) fn invalid_modify(target: TypedId, reason: impl Into<String>) -> Self {
        Self::InvalidModify {
            target,
            reason: reason.into(),
        }
    }
}

/// Outcome of one submitted operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// Operation as submitted
    pub operation: AtomicOperation,
    /// Failure, if any
    pub error: Option<OperationError>,
}

impl OperationResult {
    /// Successful result
    #[inline]
    #[must_use]
    pub fn success(operation: AtomicOperation) -> Self {
        Self {
            operation,
            error: None,
        }
    }

    /// Failed result
    #[inline]
    #[must_use]
    pub fn failure(operation: AtomicOperation, error: OperationError) -> Self {
        Self {
            operation,
            error: Some(error),
        }
    }

    /// Whether the operation applied
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Rendered failure message
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Queries over a batch of results
pub trait OperationResults {
    /// Every operation succeeded
    fn all_succeeded(&self) -> bool;

    /// Failed results, in submission order
    fn failures(&self) -> Vec<&OperationResult>;

    /// Operations that succeeded, in submission order
    fn successful_operations(&self) -> Vec<AtomicOperation>;

    /// Distinct entities addressed by successful operations
    fn touched(&self) -> Vec<TypedId>;
}

impl OperationResults for [OperationResult] {
    fn all_succeeded(&self) -> bool {
        self.iter().all(OperationResult::is_success)
    }

    fn failures(&self) -> Vec<&OperationResult> {
        self.iter().filter(|r| !r.is_success()).collect()
    }

    fn successful_operations(&self) -> Vec<AtomicOperation> {
        self.iter()
            .filter(|r| r.is_success())
            .map(|r| r.operation.clone())
            .collect()
    }

    fn touched(&self) -> Vec<TypedId> {
        let mut seen = Vec::new();
        for target in self
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.operation.target())
        {
            if !seen.contains(&target) {
                seen.push(target);
            }
        }
        seen
    }
}
