//! Shared Block types
//!
//! - [`BlockId`] and [`StatusCode`]
//! - Outcomes returned to the transport layer ([`ApplyOutcome`], [`TransitionOutcome`])
//! - Tree linkage view ([`BlockNode`])

use saga_world::{OperationResult, OperationResults, TypedId};
use serde::{Deserialize, Serialize};

/// Unique Block identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Wrap an existing id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate `{prefix}{uuid v4, simple form}`
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}{}", uuid::Uuid::new_v4().simple()))
    }

    /// Id text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Discriminant of [`crate::BlockStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// Generated; accepts edits and children
    Idle,
    /// Generator running; edits are queued
    Loading,
    /// Waiting for a manual merge decision
    ResolvingConflict,
    /// Generation or merge failed
    Error,
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::ResolvingConflict => "ResolvingConflict",
            Self::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Result of submitting operations to a Block
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Operations ran (Idle) or ran and were queued (Loading)
    Applied {
        /// Status the Block was in
        status: StatusCode,
        /// One result per submitted operation
        results: Vec<OperationResult>,
    },

    /// Block state does not accept edits; nothing changed
    NotApplied {
        /// Status the Block was in
        status: StatusCode,
    },
}

impl ApplyOutcome {
    /// Status of the Block when handled
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Applied { status, .. } | Self::NotApplied { status } => *status,
        }
    }

    /// Check for [`ApplyOutcome::Applied`]
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Per-operation results; empty when not applied
    #[must_use]
    pub fn results(&self) -> &[OperationResult] {
        match self {
            Self::Applied { results, .. } => results,
            Self::NotApplied { .. } => &[],
        }
    }

    /// Entities changed by the submission
    #[must_use]
    pub fn touched(&self) -> Vec<TypedId> {
        self.results().touched()
    }
}

/// A completed state transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Block that moved
    pub block_id: BlockId,
    /// Status before
    pub from: StatusCode,
    /// Status after
    pub to: StatusCode,
    /// Results of the merged operations; empty if none were applied
    pub results: Vec<OperationResult>,
}

impl Transition {
    /// Entities changed by the transition
    #[must_use]
    pub fn touched(&self) -> Vec<TypedId> {
        self.results.touched()
    }
}

/// Result of a completion or resolution callback
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Block changed state
    Transitioned(Transition),

    /// Callback did not fit the Block's state; nothing changed
    NotApplicable {
        /// Status the Block was in
        status: StatusCode,
    },
}

impl TransitionOutcome {
    /// Status after the call
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Transitioned(t) => t.to,
            Self::NotApplicable { status } => *status,
        }
    }

    /// The transition, if one happened
    #[must_use]
    pub fn transition(&self) -> Option<&Transition> {
        match self {
            Self::Transitioned(t) => Some(t),
            Self::NotApplicable { .. } => None,
        }
    }
}

/// Tree linkage of one Block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockNode {
    /// Block id
    pub id: BlockId,
    /// Parent Block
    pub parent: Option<BlockId>,
    /// Children in creation order
    pub children: Vec<BlockId>,
    /// Selected child index
    pub selected_child: Option<usize>,
    /// Current status
    pub status: StatusCode,
}
