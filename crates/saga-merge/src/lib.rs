//! Saga Merge
//!
//! Reconciles the operations a generator produced for a Block with the user
//! edits queued while the generator was running.
//!
//! # Core Concepts
//!
//! - [`ConflictDetector`]: Rename pre-pass, then blocking classification
//! - [`ConflictReport`]: Resolved batches plus the blocking pairs, if any
//! - [`classify`]: Pairwise [`Interaction`] of a generator and a user operation
//! - [`IdRenamer`]: Strategy for fresh ids ([`SuffixRenamer`], [`SequentialRenamer`])

mod detector;
mod rename;

pub use detector::{classify, BlockingConflict, ConflictDetector, ConflictReport, Interaction};
pub use rename::{
    IdRenamer, SequentialRenamer, SuffixRenamer, DEFAULT_RENAME_INFIX, DEFAULT_SUFFIX_LEN,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
