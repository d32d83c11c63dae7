//! Tree snapshots for an external persistence layer
//!
//! A [`TreeSnapshot`] carries every Block with its stable snapshots
//! (`ws_input`, `ws_post_ai`, `ws_post_user`). Scratch worlds and queued
//! edits of in-flight Blocks are not captured: restoring forces every Block
//! to Idle.

use crate::block::Block;
use crate::error::BlockError;
use crate::status::{BlockStatus, IdleBlock};
use crate::types::{BlockId, StatusCode};
use indexmap::IndexMap;
use saga_world::{GameState, ValueMap, WorldState};
use serde::{Deserialize, Serialize};

/// One persisted Block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block id
    pub id: BlockId,
    /// Parent Block
    #[serde(default)]
    pub parent: Option<BlockId>,
    /// Children in creation order
    #[serde(default)]
    pub children: Vec<BlockId>,
    /// Selected child index
    #[serde(default)]
    pub selected_child: Option<usize>,
    /// Status at capture time; informational
    pub status: StatusCode,
    /// Generated or edited text
    #[serde(default)]
    pub content: String,
    /// Block metadata
    #[serde(default)]
    pub metadata: ValueMap,
    /// Params of the last spawned child
    #[serde(default)]
    pub triggered_child_params: ValueMap,
    /// Inherited settings
    #[serde(default)]
    pub game_state: GameState,
    /// World the Block started from
    pub ws_input: WorldState,
    /// World after generation, if any
    #[serde(default)]
    pub ws_post_ai: Option<WorldState>,
    /// World after direct edits, if any
    #[serde(default)]
    pub ws_post_user: Option<WorldState>,
}

impl BlockRecord {
    pub(crate) fn capture(status: &BlockStatus) -> Self {
        let block = status.block();
        Self {
            id: block.id().clone(),
            parent: block.parent().cloned(),
            children: block.children().to_vec(),
            selected_child: block.selected_child_index(),
            status: status.code(),
            content: block.content().to_string(),
            metadata: block.metadata().clone(),
            triggered_child_params: block.triggered_child_params().clone(),
            game_state: block.game_state().clone(),
            ws_input: block.ws_input().clone(),
            ws_post_ai: status.ws_post_ai().cloned(),
            ws_post_user: status.ws_post_user().cloned(),
        }
    }

    pub(crate) fn into_idle(self) -> IdleBlock {
        let block = Block::from_parts(
            self.id,
            self.parent,
            self.children,
            self.selected_child,
            self.ws_input,
            self.game_state,
            self.content,
            self.metadata,
            self.triggered_child_params,
        );
        IdleBlock::restored(block, self.ws_post_ai, self.ws_post_user)
    }
}

/// Every Block of one manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Id of the root record
    pub root_id: BlockId,
    /// Records sorted by id
    pub blocks: Vec<BlockRecord>,
}

impl TreeSnapshot {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, BlockError> {
        serde_json::to_string(self).map_err(|e| BlockError::Snapshot(e.to_string()))
    }

    /// Parse JSON produced by [`TreeSnapshot::to_json`]
    pub fn from_json(text: &str) -> Result<Self, BlockError> {
        serde_json::from_str(text).map_err(|e| BlockError::Snapshot(e.to_string()))
    }

    /// Check tree linkage and index records by id
    pub(crate) fn validate(self) -> Result<IndexMap<BlockId, BlockRecord>, BlockError> {
        let mut records = IndexMap::with_capacity(self.blocks.len());
        for record in self.blocks {
            if let Some(previous) = records.insert(record.id.clone(), record) {
                return Err(BlockError::Snapshot(format!("duplicate block '{}'", previous.id)));
            }
        }

        let root = records
            .get(&self.root_id)
            .ok_or_else(|| BlockError::Snapshot(format!("root '{}' missing", self.root_id)))?;
        if root.parent.is_some() {
            return Err(BlockError::Snapshot(format!("root '{}' has a parent", root.id)));
        }

        for record in records.values() {
            if record.id != self.root_id {
                let parent = record
                    .parent
                    .as_ref()
                    .and_then(|p| records.get(p))
                    .ok_or_else(|| {
                        BlockError::Snapshot(format!("block '{}' has no valid parent", record.id))
                    })?;
                if !parent.children.contains(&record.id) {
                    return Err(BlockError::Snapshot(format!(
                        "block '{}' is not listed by its parent '{}'",
                        record.id, parent.id
                    )));
                }
            }

            for child in &record.children {
                let linked = records
                    .get(child)
                    .is_some_and(|c| c.parent.as_ref() == Some(&record.id));
                if !linked {
                    return Err(BlockError::Snapshot(format!(
                        "child '{}' of '{}' missing or linked elsewhere",
                        child, record.id
                    )));
                }
            }

            match record.selected_child {
                Some(i) if i >= record.children.len() => {
                    return Err(BlockError::Snapshot(format!(
                        "block '{}' selects child {} of {}",
                        record.id,
                        i,
                        record.children.len()
                    )));
                }
                None if !record.children.is_empty() => {
                    return Err(BlockError::Snapshot(format!(
                        "block '{}' has children but none selected",
                        record.id
                    )));
                }
                _ => {}
            }
        }

        let mut reached = 0usize;
        let mut stack = vec![&self.root_id];
        while let Some(id) = stack.pop() {
            reached += 1;
            if reached > records.len() {
                break;
            }
            if let Some(record) = records.get(id) {
                stack.extend(&record.children);
            }
        }
        if reached != records.len() {
            return Err(BlockError::Snapshot(
                "blocks unreachable from the root".to_string(),
            ));
        }

        Ok(records)
    }
}
