//! Per-Block async locks
//!
//! Locks are created on first use and never removed. Acquiring clones the
//! `Arc` out of the map before awaiting, so no map shard is held across an
//! `.await`.

use crate::types::BlockId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed registry of async mutexes
#[derive(Debug, Default)]
pub struct BlockLocks {
    locks: DashMap<BlockId, Arc<Mutex<()>>>,
}

impl BlockLocks {
    /// Create an empty lock table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: &BlockId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(id) {
            return Arc::clone(lock.value());
        }
        Arc::clone(
            self.locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Wait for exclusive access to `id`
    pub async fn acquire(&self, id: &BlockId) -> OwnedMutexGuard<()> {
        self.lock_for(id).lock_owned().await
    }

    /// Number of locks created so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Check whether no lock was created yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
