//! Transport-facing Block service contract

use crate::error::BlockError;
use crate::manager::BlockManager;
use crate::status::BlockStatus;
use crate::types::{ApplyOutcome, BlockId, TransitionOutcome};
use async_trait::async_trait;
use saga_world::{AtomicOperation, ValueMap};

/// Operations a transport layer (HTTP, real-time hub) exposes to clients
/// and to the generator
#[async_trait]
pub trait BlockService: Send + Sync {
    /// Spawn a Loading child; `None` means the root
    async fn create_child(
        &self,
        parent: Option<&BlockId>,
        trigger_params: ValueMap,
    ) -> Result<BlockStatus, BlockError>;

    /// Submit user operations
    async fn apply_or_queue_operations(
        &self,
        id: &BlockId,
        operations: Vec<AtomicOperation>,
    ) -> Result<ApplyOutcome, BlockError>;

    /// Generator completion callback
    async fn handle_generator_completion(
        &self,
        id: &BlockId,
        success: bool,
        raw_content: String,
        operations: Vec<AtomicOperation>,
        output_variables: ValueMap,
    ) -> Result<TransitionOutcome, BlockError>;

    /// Submit operations resolving a conflict
    async fn apply_resolved_commands(
        &self,
        id: &BlockId,
        resolved: Vec<AtomicOperation>,
    ) -> Result<TransitionOutcome, BlockError>;

    /// Read a Block
    async fn get_block(&self, id: &BlockId) -> Result<BlockStatus, BlockError>;
}

#[async_trait]
impl BlockService for BlockManager {
    async fn create_child(
        &self,
        parent: Option<&BlockId>,
        trigger_params: ValueMap,
    ) -> Result<BlockStatus, BlockError> {
        BlockManager::create_child(self, parent, trigger_params).await
    }

    async fn apply_or_queue_operations(
        &self,
        id: &BlockId,
        operations: Vec<AtomicOperation>,
    ) -> Result<ApplyOutcome, BlockError> {
        BlockManager::apply_or_queue_operations(self, id, &operations).await
    }

    async fn handle_generator_completion(
        &self,
        id: &BlockId,
        success: bool,
        raw_content: String,
        operations: Vec<AtomicOperation>,
        output_variables: ValueMap,
    ) -> Result<TransitionOutcome, BlockError> {
        BlockManager::handle_generator_completion(
            self,
            id,
            success,
            raw_content,
            operations,
            output_variables,
        )
        .await
    }

    async fn apply_resolved_commands(
        &self,
        id: &BlockId,
        resolved: Vec<AtomicOperation>,
    ) -> Result<TransitionOutcome, BlockError> {
        BlockManager::apply_resolved_commands(self, id, resolved).await
    }

    async fn get_block(&self, id: &BlockId) -> Result<BlockStatus, BlockError> {
        BlockManager::get_block(self, id)
    }
}
