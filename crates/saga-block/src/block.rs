//! Block data shared by every status
//!
//! Status-specific snapshots (`wsPostAI`, `wsPostUser`, `wsTemp`, pending
//! edits) live in the [`crate::status`] variants; [`Block`] keeps what every
//! state has.

use crate::types::BlockId;
use saga_world::{GameState, Value, ValueMap, WorldState};

/// Metadata key: RFC 3339 creation timestamp
pub const META_CREATION_TIME: &str = "CreationTime";
/// Metadata key: parameters that triggered this Block's generation
pub const META_TRIGGER_PARAMS: &str = "TriggerParams";
/// Metadata key: output variables of the successful generator run
pub const META_OUTPUT_VARIABLES: &str = "WorkflowOutputVariables";
/// Metadata key: failed operations of a failed merge
pub const META_ERROR: &str = "Error";

/// One node of the narrative tree
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: BlockId,
    parent: Option<BlockId>,
    children: Vec<BlockId>,
    selected_child: Option<usize>,
    ws_input: WorldState,
    pub(crate) game_state: GameState,
    pub(crate) content: String,
    pub(crate) metadata: ValueMap,
    triggered_child_params: ValueMap,
}

impl Block {
    /// Root Block with an empty world
    pub(crate) fn root(id: BlockId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            selected_child: None,
            ws_input: WorldState::new(),
            game_state: GameState::new(),
            content: String::new(),
            metadata: ValueMap::new(),
            triggered_child_params: ValueMap::new(),
        }
    }

    /// Child seeded from the parent's current world and game state
    pub(crate) fn child(
        id: BlockId,
        parent: &Block,
        ws_input: WorldState,
        trigger_params: ValueMap,
    ) -> Self {
        let mut metadata = ValueMap::new();
        metadata.insert(
            META_CREATION_TIME.to_string(),
            Value::Text(chrono::Utc::now().to_rfc3339()),
        );
        metadata.insert(META_TRIGGER_PARAMS.to_string(), Value::Map(trigger_params));

        Self {
            id,
            parent: Some(parent.id.clone()),
            children: Vec::new(),
            selected_child: None,
            ws_input,
            game_state: parent.game_state.clone(),
            content: String::new(),
            metadata,
            triggered_child_params: ValueMap::new(),
        }
    }

    /// Rebuild from persisted parts
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: BlockId,
        parent: Option<BlockId>,
        children: Vec<BlockId>,
        selected_child: Option<usize>,
        ws_input: WorldState,
        game_state: GameState,
        content: String,
        metadata: ValueMap,
        triggered_child_params: ValueMap,
    ) -> Self {
        Self {
            id,
            parent,
            children,
            selected_child,
            ws_input,
            game_state,
            content,
            metadata,
            triggered_child_params,
        }
    }

    /// Block id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &BlockId {
        &self.id
    }

    /// Parent Block; `None` for the root
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&BlockId> {
        self.parent.as_ref()
    }

    /// Children in creation order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    /// Index of the selected child in [`Block::children`]
    #[inline]
    #[must_use]
    pub fn selected_child_index(&self) -> Option<usize> {
        self.selected_child
    }

    /// Id of the selected child
    #[must_use]
    pub fn selected_child(&self) -> Option<&BlockId> {
        self.selected_child.and_then(|i| self.children.get(i))
    }

    /// World as it was when the Block was created; never changes
    #[inline]
    #[must_use]
    pub fn ws_input(&self) -> &WorldState {
        &self.ws_input
    }

    /// Settings inherited by children
    #[inline]
    #[must_use]
    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Generated or edited text
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Free-form metadata
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &ValueMap {
        &self.metadata
    }

    /// Parameters last used to spawn a child of this Block
    #[inline]
    #[must_use]
    pub fn triggered_child_params(&self) -> &ValueMap {
        &self.triggered_child_params
    }

    /// Register a new child and select it
    pub(crate) fn attach_child(&mut self, child: BlockId, trigger_params: ValueMap) -> usize {
        self.children.push(child);
        self.triggered_child_params = trigger_params;
        let index = self.children.len() - 1;
        self.selected_child = Some(index);
        index
    }

    /// Returns `false` when `index` is out of range
    pub(crate) fn select_child(&mut self, index: usize) -> bool {
        if index < self.children.len() {
            self.selected_child = Some(index);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_inherits_game_state_and_records_metadata() {
        let mut root = Block::root(BlockId::new("__WORLD__"));
        root.game_state.set("difficulty", "hard");

        let mut params = ValueMap::new();
        params.insert("prompt".into(), "go north".into());
        let child = Block::child(BlockId::new("blk_1"), &root, WorldState::new(), params.clone());

        assert_eq!(child.parent(), Some(root.id()));
        assert_eq!(child.game_state(), root.game_state());
        assert_eq!(
            child.metadata().get(META_TRIGGER_PARAMS),
            Some(&Value::Map(params))
        );
        let created = child.metadata().get(META_CREATION_TIME).and_then(Value::as_str).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn children_are_dense_and_newest_is_selected() {
        let mut root = Block::root(BlockId::new("r"));
        assert_eq!(root.selected_child(), None);

        assert_eq!(root.attach_child(BlockId::new("a"), ValueMap::new()), 0);
        assert_eq!(root.attach_child(BlockId::new("b"), ValueMap::new()), 1);
        assert_eq!(root.selected_child(), Some(&BlockId::new("b")));

        assert!(root.select_child(0));
        assert!(!root.select_child(2));
        assert_eq!(root.selected_child_index(), Some(0));
    }
}
