//! Id renaming strategies for colliding user creations

use saga_world::TypedId;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default text placed between the original id and the suffix
pub const DEFAULT_RENAME_INFIX: &str = "_user_created_";

/// Default number of suffix characters
pub const DEFAULT_SUFFIX_LEN: usize = 6;

/// Derives a fresh id for a user-created entity whose id the generator took
///
/// Implementations only propose candidates; the detector rejects candidates
/// that are already in use and asks again.
pub trait IdRenamer: Send + Sync + std::fmt::Debug {
    /// Propose a new id for `original`
    fn propose(&self, original: &TypedId) -> String;

    /// Strategy name (for debugging)
    fn name(&self) -> &'static str;
}

/// `{id}{infix}{random hex}` renaming
#[derive(Debug, Clone)]
pub struct SuffixRenamer {
    infix: String,
    suffix_len: usize,
}

impl SuffixRenamer {
    /// Create renamer; `suffix_len` is clamped to `1..=32`
    #[must_use]
    pub fn new(infix: impl Into<String>, suffix_len: usize) -> Self {
        Self {
            infix: infix.into(),
            suffix_len: suffix_len.clamp(1, 32),
        }
    }

    /// Text between the old id and the suffix
    #[inline]
    #[must_use]
    pub fn infix(&self) -> &str {
        &self.infix
    }

    /// Random suffix length
    #[inline]
    #[must_use]
    pub fn suffix_len(&self) -> usize {
        self.suffix_len
    }
}

impl Default for SuffixRenamer {
    fn default() -> Self {
        Self::new(DEFAULT_RENAME_INFIX, DEFAULT_SUFFIX_LEN)
    }
}

impl IdRenamer for SuffixRenamer {
    fn propose(&self, original: &TypedId) -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        let suffix = hex.get(..self.suffix_len).unwrap_or(&hex);
        format!("{}{}{}", original.id, self.infix, suffix)
    }

    fn name(&self) -> &'static str {
        "suffix"
    }
}

/// `{id}{infix}{n}` renaming with a shared counter
///
/// Deterministic across runs, which keeps tests and replays stable.
#[derive(Debug)]
pub struct SequentialRenamer {
    infix: String,
    next: AtomicUsize,
}

impl SequentialRenamer {
    /// Create a renamer counting from 1
    #[must_use]
    pub fn new(infix: impl Into<String>) -> Self {
        Self {
            infix: infix.into(),
            next: AtomicUsize::new(1),
        }
    }
}

impl Default for SequentialRenamer {
    fn default() -> Self {
        Self::new(DEFAULT_RENAME_INFIX)
    }
}

impl IdRenamer for SequentialRenamer {
    fn propose(&self, original: &TypedId) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}{}", original.id, self.infix, n)
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}
