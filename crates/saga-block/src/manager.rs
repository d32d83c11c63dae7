//! Block manager
//!
//! Owns the Block registry and the per-Block locks:
//! - Every read-decide-write sequence runs under the Block's lock, on a copy
//!   taken out of the registry and stored back when done
//! - The registry map is only touched for single lookups and stores, so work
//!   on one Block never holds up another
//! - Child creation locks the parent, then the new child
//! - [`BlockManager::get_block`] and the tree views take no Block lock

use crate::config::BlockManagerConfig;
use crate::error::BlockError;
use crate::locks::BlockLocks;
use crate::persist::{BlockRecord, TreeSnapshot};
use crate::status::{BlockStatus, Finalized, IdleBlock};
use crate::types::{ApplyOutcome, BlockId, BlockNode, StatusCode, Transition, TransitionOutcome};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexMap;
use saga_merge::ConflictDetector;
use saga_world::{AtomicOperation, Value, ValueMap};
use std::sync::Arc;

/// Registry of every Block in one narrative tree
#[derive(Debug)]
pub struct BlockManager {
    config: BlockManagerConfig,
    root_id: BlockId,
    blocks: DashMap<BlockId, BlockStatus>,
    locks: BlockLocks,
    detector: ConflictDetector,
}

impl Default for BlockManager {
    fn default() -> Self {
        Self::new(BlockManagerConfig::default())
    }
}

impl BlockManager {
    /// Create a manager holding only the idle root Block
    #[must_use]
    pub fn new(config: BlockManagerConfig) -> Self {
        let detector = ConflictDetector::new(Arc::new(config.renamer()));
        Self::with_detector(config, detector)
    }

    /// Create a manager with a custom conflict detector
    #[must_use]
    pub fn with_detector(config: BlockManagerConfig, detector: ConflictDetector) -> Self {
        let root_id = BlockId::new(config.root_id.clone());
        let blocks = DashMap::new();
        blocks.insert(
            root_id.clone(),
            BlockStatus::Idle(IdleBlock::root(root_id.clone())),
        );
        tracing::info!("Block manager created with root '{}'", root_id);

        Self {
            config,
            root_id,
            blocks,
            locks: BlockLocks::new(),
            detector,
        }
    }

    /// Rebuild a manager from a snapshot, every Block forced to Idle
    pub fn restore(config: BlockManagerConfig, snapshot: TreeSnapshot) -> Result<Self, BlockError> {
        let detector = ConflictDetector::new(Arc::new(config.renamer()));
        Self::restore_with_detector(config, detector, snapshot)
    }

    /// [`BlockManager::restore`] with a custom conflict detector
    pub fn restore_with_detector(
        config: BlockManagerConfig,
        detector: ConflictDetector,
        snapshot: TreeSnapshot,
    ) -> Result<Self, BlockError> {
        let root_id = snapshot.root_id.clone();
        let records = snapshot.validate()?;

        let blocks = DashMap::with_capacity(records.len());
        for (id, record) in records {
            if record.status != StatusCode::Idle {
                tracing::debug!("Restoring '{}' from {} as Idle", id, record.status);
            }
            blocks.insert(id, BlockStatus::Idle(record.into_idle()));
        }
        tracing::info!("Restored {} blocks under root '{}'", blocks.len(), root_id);

        Ok(Self {
            config,
            root_id,
            blocks,
            locks: BlockLocks::new(),
            detector,
        })
    }

    /// Id of the world root
    #[inline]
    #[must_use]
    pub fn root_id(&self) -> &BlockId {
        &self.root_id
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BlockManagerConfig {
        &self.config
    }

    /// Number of Blocks, root included
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check whether no Block is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Spawn a Loading child of an Idle Block (the root when `parent` is `None`)
    ///
    /// The child starts from the parent's current world and game state and
    /// becomes the parent's selected child.
    pub async fn create_child(
        &self,
        parent: Option<&BlockId>,
        trigger_params: ValueMap,
    ) -> Result<BlockStatus, BlockError> {
        let parent_id = parent.unwrap_or(&self.root_id).clone();
        let _parent_guard = self.locks.acquire(&parent_id).await;

        let mut parent_status = self.get_block(&parent_id).map_err(|err| {
            tracing::warn!("Cannot create child: parent '{}' not found", parent_id);
            err
        })?;
        let BlockStatus::Idle(idle) = &parent_status else {
            tracing::warn!(
                "Cannot create child: parent '{}' is {}",
                parent_id,
                parent_status.code()
            );
            return Err(BlockError::invalid_state(
                &parent_id,
                parent_status.code(),
                "create child",
            ));
        };
        let child = idle.spawn_child(
            BlockId::generate(&self.config.child_id_prefix),
            trigger_params.clone(),
        );
        let child_id = child.block().id().clone();

        let _child_guard = self.locks.acquire(&child_id).await;
        let created = BlockStatus::Loading(child);
        match self.blocks.entry(child_id.clone()) {
            Entry::Occupied(_) => {
                tracing::error!("Generated block id '{}' is already registered", child_id);
                return Err(BlockError::DuplicateBlock(child_id));
            }
            Entry::Vacant(slot) => {
                slot.insert(created.clone());
            }
        }

        let index = parent_status
            .block_mut()
            .attach_child(child_id.clone(), trigger_params);
        self.store(parent_status);
        tracing::debug!("Block '{}': child '{}' at index {}", parent_id, child_id, index);
        tracing::info!("Block '{}' created under '{}' (Loading)", child_id, parent_id);

        Ok(created)
    }

    /// Apply operations to an Idle Block, or apply and queue them on a
    /// Loading one
    ///
    /// ResolvingConflict and Error Blocks return
    /// [`ApplyOutcome::NotApplied`] and are left untouched.
    pub async fn apply_or_queue_operations(
        &self,
        id: &BlockId,
        operations: &[AtomicOperation],
    ) -> Result<ApplyOutcome, BlockError> {
        let _guard = self.locks.acquire(id).await;
        let mut current = self.get_block(id)?;

        let status = current.code();
        let results = match &mut current {
            BlockStatus::Idle(idle) => idle.apply_operations(operations),
            BlockStatus::Loading(loading) => loading.apply_operations(operations),
            BlockStatus::ResolvingConflict(_) | BlockStatus::Error(_) => {
                tracing::warn!(
                    "Block '{}' is {}; {} operations not applied",
                    id,
                    status,
                    operations.len()
                );
                return Ok(ApplyOutcome::NotApplied { status });
            }
        };
        self.store(current);

        tracing::debug!(
            "Block '{}': {} operations submitted while {}",
            id,
            operations.len(),
            status
        );
        Ok(ApplyOutcome::Applied { status, results })
    }

    /// Generator callback for a Loading Block
    ///
    /// Any other state yields [`TransitionOutcome::NotApplicable`]; a late or
    /// repeated completion is harmless.
    pub async fn handle_generator_completion(
        &self,
        id: &BlockId,
        success: bool,
        raw_content: String,
        operations: Vec<AtomicOperation>,
        output_variables: ValueMap,
    ) -> Result<TransitionOutcome, BlockError> {
        let _guard = self.locks.acquire(id).await;

        self.transition(id, "complete generation", |status| match status {
            BlockStatus::Loading(loading) if !success => {
                tracing::error!("Block '{}': generator failed", id);
                Ok(Finalized {
                    status: BlockStatus::Error(loading.fail()),
                    results: Vec::new(),
                })
            }
            BlockStatus::Loading(mut loading) => {
                loading.record_output_variables(output_variables);
                Ok(loading.finalize_workflow(&self.detector, raw_content, operations))
            }
            other => Err(other),
        })
    }

    /// Finish a ResolvingConflict Block with the resolver's operations
    pub async fn apply_resolved_commands(
        &self,
        id: &BlockId,
        resolved: Vec<AtomicOperation>,
    ) -> Result<TransitionOutcome, BlockError> {
        let _guard = self.locks.acquire(id).await;

        self.transition(id, "apply resolved operations", |status| match status {
            BlockStatus::ResolvingConflict(conflict) => {
                tracing::info!(
                    "Block '{}': applying {} resolved operations",
                    id,
                    resolved.len()
                );
                Ok(conflict.finalize_resolution(&resolved))
            }
            other => Err(other),
        })
    }

    /// Replace the Block's status; the caller holds the Block's lock
    ///
    /// `step` returns `Err(unchanged)` when the callback does not apply, and
    /// the stored status is then left as it was.
    fn transition<F>(
        &self,
        id: &BlockId,
        action: &'static str,
        step: F,
    ) -> Result<TransitionOutcome, BlockError>
    where
        F: FnOnce(BlockStatus) -> Result<Finalized, BlockStatus>,
    {
        let current = self.get_block(id).map_err(|err| {
            tracing::warn!("Cannot {}: block '{}' not found", action, id);
            err
        })?;

        let from = current.code();
        match step(current) {
            Ok(Finalized { status, results }) => {
                let to = status.code();
                self.store(status);
                Ok(TransitionOutcome::Transitioned(Transition {
                    block_id: id.clone(),
                    from,
                    to,
                    results,
                }))
            }
            Err(_) => {
                tracing::warn!("Cannot {}: block '{}' is {}; ignored", action, id, from);
                Ok(TransitionOutcome::NotApplicable { status: from })
            }
        }
    }

    /// Write back a Block copy; the caller holds the Block's lock
    fn store(&self, status: BlockStatus) {
        self.blocks.insert(status.id().clone(), status);
    }

    /// Copy of a Block, taken without its lock
    pub fn get_block(&self, id: &BlockId) -> Result<BlockStatus, BlockError> {
        self.blocks
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BlockError::NotFound(id.clone()))
    }

    /// Status of a Block
    pub fn status(&self, id: &BlockId) -> Result<StatusCode, BlockError> {
        self.blocks
            .get(id)
            .map(|entry| entry.code())
            .ok_or_else(|| BlockError::NotFound(id.clone()))
    }

    /// Edit content and metadata of an Idle Block
    ///
    /// A `None` metadata value removes the key.
    pub async fn update_block_details(
        &self,
        id: &BlockId,
        content: Option<String>,
        metadata_updates: IndexMap<String, Option<Value>>,
    ) -> Result<(), BlockError> {
        let _guard = self.locks.acquire(id).await;
        let mut current = self.get_block(id)?;

        if current.code() != StatusCode::Idle {
            return Err(BlockError::invalid_state(id, current.code(), "update details"));
        }

        let block = current.block_mut();
        if let Some(content) = content {
            block.content = content;
        }
        for (key, value) in metadata_updates {
            match value {
                Some(value) => {
                    block.metadata.insert(key, value);
                }
                None => {
                    block.metadata.shift_remove(&key);
                }
            }
        }
        self.store(current);
        tracing::debug!("Block '{}': details updated", id);
        Ok(())
    }

    /// Merge settings into a Block's game state; allowed in every state
    pub async fn update_game_state(
        &self,
        id: &BlockId,
        settings: ValueMap,
    ) -> Result<StatusCode, BlockError> {
        let _guard = self.locks.acquire(id).await;
        let mut current = self.get_block(id)?;

        let changed = settings.len();
        current.block_mut().game_state.apply(settings);
        let status = current.code();
        self.store(current);
        tracing::debug!("Block '{}': {} game state settings updated", id, changed);
        Ok(status)
    }

    /// Select which child branch continues the story
    pub async fn select_child(&self, id: &BlockId, index: usize) -> Result<(), BlockError> {
        let _guard = self.locks.acquire(id).await;
        let mut current = self.get_block(id)?;

        let block = current.block_mut();
        if !block.select_child(index) {
            return Err(BlockError::InvalidChildIndex {
                id: id.clone(),
                index,
                len: block.children().len(),
            });
        }
        self.store(current);
        Ok(())
    }

    /// Root-to-leaf path through `id`
    ///
    /// Descends from `id` along selected children to a leaf, then walks
    /// parent links back to the root.
    pub fn path_to_root(&self, id: &BlockId) -> Result<Vec<BlockId>, BlockError> {
        let limit = self.blocks.len();

        let mut leaf = id.clone();
        for _ in 0..limit {
            let next = self
                .blocks
                .get(&leaf)
                .ok_or_else(|| BlockError::NotFound(leaf.clone()))?
                .block()
                .selected_child()
                .cloned();
            match next {
                Some(child) => leaf = child,
                None => break,
            }
        }

        let mut path = Vec::new();
        let mut cursor = Some(leaf);
        while let Some(current) = cursor {
            if path.len() >= limit {
                return Err(BlockError::Snapshot(format!(
                    "parent links of '{id}' do not reach the root"
                )));
            }
            cursor = self
                .blocks
                .get(&current)
                .ok_or_else(|| BlockError::NotFound(current.clone()))?
                .block()
                .parent()
                .cloned();
            path.push(current);
        }

        path.reverse();
        Ok(path)
    }

    /// Tree linkage of every Block, root first then by id
    #[must_use]
    pub fn nodes(&self) -> Vec<BlockNode> {
        let mut nodes: Vec<BlockNode> = self
            .blocks
            .iter()
            .map(|entry| {
                let block = entry.block();
                BlockNode {
                    id: block.id().clone(),
                    parent: block.parent().cloned(),
                    children: block.children().to_vec(),
                    selected_child: block.selected_child_index(),
                    status: entry.code(),
                }
            })
            .collect();
        nodes.sort_by(|a, b| {
            (a.id != self.root_id)
                .cmp(&(b.id != self.root_id))
                .then_with(|| a.id.cmp(&b.id))
        });
        nodes
    }

    /// Capture every Block for persistence
    #[must_use]
    pub fn snapshot(&self) -> TreeSnapshot {
        let mut blocks: Vec<BlockRecord> = self
            .blocks
            .iter()
            .map(|entry| BlockRecord::capture(entry.value()))
            .collect();
        blocks.sort_by(|a, b| a.id.cmp(&b.id));
        TreeSnapshot {
            root_id: self.root_id.clone(),
            blocks,
        }
    }
}
