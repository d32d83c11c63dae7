//! Per-Block state machine
//!
//! Each [`BlockStatus`] variant owns exactly the snapshots that are valid in
//! that state, so "Loading without a scratch world" cannot be represented.
//!
//! ```text
//! Idle ──spawn──▶ (child) Loading ──finalize──▶ Idle | Error | ResolvingConflict
//!                                   ResolvingConflict ──resolve──▶ Idle | Error
//! ```
//!
//! Transitions consume the old state and return the new one.

use crate::block::{Block, META_ERROR, META_OUTPUT_VARIABLES};
use crate::types::{BlockId, StatusCode};
use saga_merge::{BlockingConflict, ConflictDetector};
use saga_world::{
    apply_operations, AtomicOperation, OperationResult, OperationResults, Value, ValueMap,
    WorldState,
};

/// Generated Block accepting direct edits and children
#[derive(Debug, Clone, PartialEq)]
pub struct IdleBlock {
    block: Block,
    ws_post_ai: Option<WorldState>,
    ws_post_user: WorldState,
}

impl IdleBlock {
    /// Root Block: empty world, idle from the start
    pub(crate) fn root(id: BlockId) -> Self {
        let block = Block::root(id);
        let ws_post_ai = block.ws_input().clone();
        Self {
            ws_post_user: ws_post_ai.clone(),
            ws_post_ai: Some(ws_post_ai),
            block,
        }
    }

    /// Idle Block rebuilt from storage
    ///
    /// A missing `ws_post_user` is rebuilt from `ws_post_ai`, else from the
    /// input snapshot.
    pub(crate) fn restored(
        block: Block,
        ws_post_ai: Option<WorldState>,
        ws_post_user: Option<WorldState>,
    ) -> Self {
        let ws_post_user = ws_post_user
            .or_else(|| ws_post_ai.clone())
            .unwrap_or_else(|| block.ws_input().clone());
        Self {
            block,
            ws_post_ai,
            ws_post_user,
        }
    }

    /// Shared Block data
    #[inline]
    #[must_use]
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// World after generation, before direct edits
    #[inline]
    #[must_use]
    pub fn ws_post_ai(&self) -> Option<&WorldState> {
        self.ws_post_ai.as_ref()
    }

    /// Current world
    #[inline]
    #[must_use]
    pub fn ws_post_user(&self) -> &WorldState {
        &self.ws_post_user
    }

    /// Apply edits directly to the current world
    pub(crate) fn apply_operations(&mut self, ops: &[AtomicOperation]) -> Vec<OperationResult> {
        apply_operations(&mut self.ws_post_user, ops)
    }

    /// Build a Loading child seeded from the current world
    ///
    /// The parent is not modified; the caller registers the child once it is
    /// stored.
    pub(crate) fn spawn_child(&self, id: BlockId, trigger_params: ValueMap) -> LoadingBlock {
        let block = Block::child(id, &self.block, self.ws_post_user.clone(), trigger_params);
        LoadingBlock::new(block)
    }
}

/// Generator running; direct edits go to a scratch world and are queued
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingBlock {
    block: Block,
    ws_temp: WorldState,
    pending_user: Vec<AtomicOperation>,
}

impl LoadingBlock {
    pub(crate) fn new(block: Block) -> Self {
        Self {
            ws_temp: block.ws_input().clone(),
            pending_user: Vec::new(),
            block,
        }
    }

    /// Shared Block data
    #[inline]
    #[must_use]
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Scratch world with queued edits applied
    #[inline]
    #[must_use]
    pub fn ws_temp(&self) -> &WorldState {
        &self.ws_temp
    }

    /// Successfully applied edits, in submission order
    #[inline]
    #[must_use]
    pub fn pending_user(&self) -> &[AtomicOperation] {
        &self.pending_user
    }

    /// Apply to the scratch world and queue what succeeded
    pub(crate) fn apply_operations(&mut self, ops: &[AtomicOperation]) -> Vec<OperationResult> {
        let results = apply_operations(&mut self.ws_temp, ops);
        self.pending_user.extend(results.successful_operations());
        results
    }

    pub(crate) fn record_output_variables(&mut self, variables: ValueMap) {
        self.block
            .metadata
            .insert(META_OUTPUT_VARIABLES.to_string(), Value::Map(variables));
    }

    /// Generator reported failure
    pub(crate) fn fail(self) -> ErrorBlock {
        ErrorBlock {
            block: self.block,
            ws_post_user: None,
            cause: ErrorCause::GeneratorFailed,
        }
    }

    /// Merge the generator batch with the queued edits
    pub(crate) fn finalize_workflow(
        mut self,
        detector: &ConflictDetector,
        raw_content: String,
        ai_operations: Vec<AtomicOperation>,
    ) -> Finalized {
        let report =
            detector.detect_against(self.block.ws_input(), &ai_operations, &self.pending_user);

        match report.conflict {
            None => {
                let merged = report
                    .resolved_ai
                    .into_iter()
                    .chain(report.resolved_user)
                    .collect::<Vec<_>>();
                commit(self.block, raw_content, &merged)
            }
            Some(conflict) => {
                tracing::info!(
                    "Block '{}': entering conflict resolution ({} generator / {} user operations)",
                    self.block.id(),
                    conflict.ai.len(),
                    conflict.user.len()
                );
                self.block.content = raw_content;
                Finalized {
                    status: BlockStatus::ResolvingConflict(ConflictBlock {
                        block: self.block,
                        ws_temp: self.ws_temp,
                        pending_user: self.pending_user,
                        ai_operations: report.resolved_ai,
                        user_operations: report.resolved_user,
                        conflict,
                    }),
                    results: Vec::new(),
                }
            }
        }
    }
}

/// Generator and user edits collided; waiting for resolved operations
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictBlock {
    block: Block,
    ws_temp: WorldState,
    pending_user: Vec<AtomicOperation>,
    ai_operations: Vec<AtomicOperation>,
    user_operations: Vec<AtomicOperation>,
    conflict: BlockingConflict,
}

impl ConflictBlock {
    /// Shared Block data
    #[inline]
    #[must_use]
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Scratch world as it was when the conflict was found; read-only
    #[inline]
    #[must_use]
    pub fn ws_temp(&self) -> &WorldState {
        &self.ws_temp
    }

    /// Queued user edits, renames not yet applied
    #[inline]
    #[must_use]
    pub fn pending_user(&self) -> &[AtomicOperation] {
        &self.pending_user
    }

    /// Full generator batch
    #[inline]
    #[must_use]
    pub fn ai_operations(&self) -> &[AtomicOperation] {
        &self.ai_operations
    }

    /// Full user batch after renames
    #[inline]
    #[must_use]
    pub fn user_operations(&self) -> &[AtomicOperation] {
        &self.user_operations
    }

    /// Colliding operations from both sides
    #[inline]
    #[must_use]
    pub fn conflict(&self) -> &BlockingConflict {
        &self.conflict
    }

    /// Finalize with the operations chosen by the resolver
    pub(crate) fn finalize_resolution(self, resolved: &[AtomicOperation]) -> Finalized {
        let content = self.block.content.clone();
        commit(self.block, content, resolved)
    }
}

/// Why a Block ended in [`BlockStatus::Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCause {
    /// Generator reported failure
    GeneratorFailed,
    /// Some merged operation failed; see the `Error` metadata entry
    OperationsFailed,
}

/// Failed Block; readable, rejects edits
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBlock {
    block: Block,
    ws_post_user: Option<WorldState>,
    cause: ErrorCause,
}

impl ErrorBlock {
    /// Shared Block data
    #[inline]
    #[must_use]
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// World after direct edits
    #[inline]
    #[must_use]
    pub fn ws_post_user(&self) -> Option<&WorldState> {
        self.ws_post_user.as_ref()
    }

    /// Why the Block failed
    #[inline]
    #[must_use]
    pub fn cause(&self) -> ErrorCause {
        self.cause
    }
}

/// A Block in one of its four states
#[derive(Debug, Clone, PartialEq)]
pub enum BlockStatus {
    /// See [`IdleBlock`]
    Idle(IdleBlock),
    /// See [`LoadingBlock`]
    Loading(LoadingBlock),
    /// See [`ConflictBlock`]
    ResolvingConflict(ConflictBlock),
    /// See [`ErrorBlock`]
    Error(ErrorBlock),
}

impl BlockStatus {
    /// Status discriminant
    #[must_use]
    pub fn code(&self) -> StatusCode {
        match self {
            Self::Idle(_) => StatusCode::Idle,
            Self::Loading(_) => StatusCode::Loading,
            Self::ResolvingConflict(_) => StatusCode::ResolvingConflict,
            Self::Error(_) => StatusCode::Error,
        }
    }

    /// Shared Block data
    #[must_use]
    pub fn block(&self) -> &Block {
        match self {
            Self::Idle(b) => &b.block,
            Self::Loading(b) => &b.block,
            Self::ResolvingConflict(b) => &b.block,
            Self::Error(b) => &b.block,
        }
    }

    pub(crate) fn block_mut(&mut self) -> &mut Block {
        match self {
            Self::Idle(b) => &mut b.block,
            Self::Loading(b) => &mut b.block,
            Self::ResolvingConflict(b) => &mut b.block,
            Self::Error(b) => &mut b.block,
        }
    }

    /// Block id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &BlockId {
        self.block().id()
    }

    /// The authoritative world for this state
    ///
    /// `None` only for an Error Block whose merge was discarded.
    #[must_use]
    pub fn current_world(&self) -> Option<&WorldState> {
        match self {
            Self::Idle(b) => Some(&b.ws_post_user),
            Self::Loading(b) => Some(&b.ws_temp),
            Self::ResolvingConflict(b) => Some(&b.ws_temp),
            Self::Error(b) => b.ws_post_user.as_ref(),
        }
    }

    /// World after generation; Idle only
    #[must_use]
    pub fn ws_post_ai(&self) -> Option<&WorldState> {
        match self {
            Self::Idle(b) => b.ws_post_ai.as_ref(),
            _ => None,
        }
    }

    /// World after direct edits
    #[must_use]
    pub fn ws_post_user(&self) -> Option<&WorldState> {
        match self {
            Self::Idle(b) => Some(&b.ws_post_user),
            Self::Error(b) => b.ws_post_user.as_ref(),
            _ => None,
        }
    }

    /// Scratch world; Loading and ResolvingConflict only
    #[must_use]
    pub fn ws_temp(&self) -> Option<&WorldState> {
        match self {
            Self::Loading(b) => Some(&b.ws_temp),
            Self::ResolvingConflict(b) => Some(&b.ws_temp),
            _ => None,
        }
    }

    /// Queued user edits; empty outside Loading and ResolvingConflict
    #[must_use]
    pub fn pending_user(&self) -> &[AtomicOperation] {
        match self {
            Self::Loading(b) => &b.pending_user,
            Self::ResolvingConflict(b) => &b.pending_user,
            _ => &[],
        }
    }
}

/// New state plus the results of the operations applied to reach it
#[derive(Debug)]
pub(crate) struct Finalized {
    pub(crate) status: BlockStatus,
    pub(crate) results: Vec<OperationResult>,
}

/// Rebuild the post-generation world from the input snapshot
///
/// All-or-nothing: one failed operation discards the partial world and
/// sends the Block to Error with the failures recorded in metadata.
fn commit(mut block: Block, content: String, ops: &[AtomicOperation]) -> Finalized {
    let mut ws_post_ai = block.ws_input().clone();
    let results = apply_operations(&mut ws_post_ai, ops);
    block.content = content;

    if results.all_succeeded() {
        tracing::info!("Block '{}': finalized with {} operations", block.id(), ops.len());
        let ws_post_user = ws_post_ai.clone();
        return Finalized {
            status: BlockStatus::Idle(IdleBlock {
                block,
                ws_post_ai: Some(ws_post_ai),
                ws_post_user,
            }),
            results,
        };
    }

    let failures: Vec<Value> = results
        .failures()
        .into_iter()
        .map(|r| {
            let mut entry = ValueMap::new();
            entry.insert("operation".into(), Value::Text(r.operation.to_string()));
            entry.insert(
                "error".into(),
                Value::Text(r.error_message().unwrap_or_default()),
            );
            Value::Map(entry)
        })
        .collect();
    tracing::error!(
        "Block '{}': finalization failed, {} of {} operations rejected",
        block.id(),
        failures.len(),
        ops.len()
    );
    block.metadata.insert(META_ERROR.to_string(), Value::List(failures));

    Finalized {
        status: BlockStatus::Error(ErrorBlock {
            block,
            ws_post_user: None,
            cause: ErrorCause::OperationsFailed,
        }),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga_merge::SequentialRenamer;
    use saga_world::{EntityKind, Operator, TypedId};
    use std::sync::Arc;

    fn detector() -> ConflictDetector {
        ConflictDetector::new(Arc::new(SequentialRenamer::default()))
    }

    fn loading_child() -> LoadingBlock {
        let root = IdleBlock::root(BlockId::new("__WORLD__"));
        root.spawn_child(BlockId::new("blk_1"), ValueMap::new())
    }

    #[test]
    fn root_is_idle_with_both_snapshots() {
        let root = BlockStatus::Idle(IdleBlock::root(BlockId::new("__WORLD__")));
        assert_eq!(root.code(), StatusCode::Idle);
        assert!(root.ws_post_ai().is_some());
        assert!(root.current_world().unwrap().is_empty());
        assert!(root.ws_temp().is_none());
    }

    #[test]
    fn loading_queues_only_successes() {
        let mut child = loading_child();
        let results = child.apply_operations(&[
            AtomicOperation::create(EntityKind::Item, "sword"),
            AtomicOperation::modify(EntityKind::Item, "ghost", "x", Operator::Equal, 1),
        ]);

        assert_eq!(results.len(), 2);
        assert_eq!(
            child.pending_user(),
            &[AtomicOperation::create(EntityKind::Item, "sword")]
        );
        assert!(child.ws_temp().contains(&TypedId::new(EntityKind::Item, "sword")));
        assert!(child.block().ws_input().is_empty());
    }

    #[test]
    fn finalize_merges_generator_first() {
        let mut child = loading_child();
        child.apply_operations(&[AtomicOperation::create(EntityKind::Item, "lamp")]);

        let finalized = child.finalize_workflow(
            &detector(),
            "The hero wakes.".into(),
            vec![AtomicOperation::create(EntityKind::Character, "hero")],
        );

        assert!(finalized.results.all_succeeded());
        assert_eq!(
            finalized.results[0].operation,
            AtomicOperation::create(EntityKind::Character, "hero")
        );
        let BlockStatus::Idle(idle) = finalized.status else {
            panic!("expected Idle");
        };
        assert_eq!(idle.block().content(), "The hero wakes.");
        assert_eq!(idle.ws_post_ai(), Some(idle.ws_post_user()));
        assert_eq!(idle.ws_post_user().live_entities().count(), 2);
    }

    #[test]
    fn failed_merge_records_error_metadata() {
        let finalized = loading_child().finalize_workflow(
            &detector(),
            "text".into(),
            vec![AtomicOperation::modify(EntityKind::Item, "ghost", "x", Operator::Equal, 1)],
        );

        let BlockStatus::Error(error) = finalized.status else {
            panic!("expected Error");
        };
        assert_eq!(error.cause(), ErrorCause::OperationsFailed);
        assert!(error.ws_post_user().is_none());
        let recorded = error.block().metadata().get(META_ERROR).and_then(Value::as_list).unwrap();
        assert_eq!(recorded.len(), 1);
    }

    #[test]
    fn conflict_keeps_scratch_world_and_content() {
        let mut child = loading_child();
        child.apply_operations(&[AtomicOperation::create(EntityKind::Character, "hero")]);
        child.apply_operations(&[AtomicOperation::modify(
            EntityKind::Character,
            "hero",
            "hp",
            Operator::Equal,
            20,
        )]);
        let scratch = child.ws_temp().clone();

        let finalized = child.finalize_workflow(
            &detector(),
            "Battle.".into(),
            vec![AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Equal, 10)],
        );

        let BlockStatus::ResolvingConflict(conflict) = finalized.status else {
            panic!("expected ResolvingConflict");
        };
        assert!(finalized.results.is_empty());
        assert_eq!(conflict.ws_temp(), &scratch);
        assert_eq!(conflict.block().content(), "Battle.");
        assert_eq!(conflict.conflict().ai.len(), 1);
        assert_eq!(conflict.user_operations().len(), 2);

        let resolved = conflict.finalize_resolution(&[
            AtomicOperation::create(EntityKind::Character, "hero"),
            AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Equal, 15),
        ]);
        let BlockStatus::Idle(idle) = resolved.status else {
            panic!("expected Idle");
        };
        assert_eq!(idle.block().content(), "Battle.");
    }

    #[test]
    fn generator_failure_drops_scratch_world() {
        let status = BlockStatus::Error(loading_child().fail());
        assert!(status.current_world().is_none());
        assert!(status.pending_user().is_empty());
    }

    #[test]
    fn restore_prefers_saved_user_world() {
        let mut with_hero = WorldState::new();
        apply_operations(&mut with_hero, &[AtomicOperation::create(EntityKind::Character, "hero")]);
        let block = Block::root(BlockId::new("r"));

        let idle = IdleBlock::restored(block.clone(), Some(with_hero.clone()), None);
        assert_eq!(idle.ws_post_user(), &with_hero);

        let idle = IdleBlock::restored(block, None, None);
        assert!(idle.ws_post_user().is_empty());
    }
}
