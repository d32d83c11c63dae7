//! Error types for Saga Block
//!
//! Operation-level failures never show up here; they are reported through
//! per-operation results. Protocol misuse (a stale completion, an edit to an
//! Error Block) is a no-op outcome, not an error either.

use crate::types::{BlockId, StatusCode};

/// Block manager error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockError {
    /// No Block with this id
    #[error("block '{0}' not found")]
    NotFound(BlockId),

    /// Block exists but its state forbids the action
    #[error("block '{id}' is {status}; cannot {action}")]
    InvalidState {
        /// Block
        id: BlockId,
        /// Current status
        status: StatusCode,
        /// Rejected action
        action: &'static str,
    },

    /// Generated id already registered
    #[error("block '{0}' already exists")]
    DuplicateBlock(BlockId),

    /// Child index outside `0..len`
    #[error("block '{id}' has {len} children; index {index} is out of range")]
    InvalidChildIndex {
        /// Parent Block
        id: BlockId,
        /// Requested index
        index: usize,
        /// Number of children
        len: usize,
    },

    /// Tree snapshot cannot be restored
    #[error("invalid snapshot: {0}")]
    Snapshot(String),
}

impl BlockError {
    #[inline]
    pub(crate) fn invalid_state(id: &BlockId, status: StatusCode, action: &'static str) -> Self {
        Self::InvalidState {
            id: id.clone(),
            status,
            action,
        }
    }

    /// Check if the error means "no such Block"
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Not valid TOML, or unknown/mistyped fields
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed but semantically invalid
    #[error("invalid config: {0}")]
    Invalid(String),
}
