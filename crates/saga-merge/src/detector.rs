//! Conflict detection between the generator batch and queued user edits
//!
//! Detection runs in two passes:
//! 1. Rename: user creations that collide with generator creations get a
//!    fresh id, and every user operation on the old id follows it. Fresh
//!    ids avoid both batches and the live entities of the world the merged
//!    batch will be applied to.
//! 2. Classification: the renamed user batch is checked pairwise against
//!    the generator batch; only same-attribute modifications block.

use crate::rename::{IdRenamer, SuffixRenamer};
use indexmap::{IndexMap, IndexSet};
use saga_world::{AtomicOperation, Entity, TypedId, WorldState};
use std::sync::Arc;

/// How one generator operation and one user operation interact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Different entities
    Disjoint,

    /// Both create the same entity; resolved by renaming the user's
    CreateCollision,

    /// Both modify the same attribute of the same entity; blocking
    KeyCollision,

    /// Same entity, no conflict (different keys, deletes, create vs modify)
    Compatible,
}

impl Interaction {
    /// Whether this interaction needs manual resolution
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::KeyCollision)
    }
}

/// Classify a generator/user operation pair
#[must_use]
pub fn classify(ai: &AtomicOperation, user: &AtomicOperation) -> Interaction {
    if ai.target() != user.target() {
        return Interaction::Disjoint;
    }

    match (ai, user) {
        (AtomicOperation::Create { .. }, AtomicOperation::Create { .. }) => {
            Interaction::CreateCollision
        }
        (AtomicOperation::Modify { key: a, .. }, AtomicOperation::Modify { key: b, .. })
            if a == b =>
        {
            Interaction::KeyCollision
        }
        _ => Interaction::Compatible,
    }
}

/// Operations that need a manual decision
#[derive(Debug, Clone, PartialEq)]
pub struct BlockingConflict {
    /// Generator operations involved, deduplicated, in batch order
    pub ai: Vec<AtomicOperation>,
    /// User operations involved (after renaming), deduplicated, in batch order
    pub user: Vec<AtomicOperation>,
}

/// Result of [`ConflictDetector::detect`]
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictReport {
    /// Generator batch; never rewritten
    pub resolved_ai: Vec<AtomicOperation>,
    /// User batch with renames applied
    pub resolved_user: Vec<AtomicOperation>,
    /// Original user entity -> new id
    pub renamed: IndexMap<TypedId, String>,
    /// Present only when some pair blocks
    pub conflict: Option<BlockingConflict>,
}

impl ConflictReport {
    /// Whether manual resolution is needed
    #[inline]
    #[must_use]
    pub fn has_blocking_conflict(&self) -> bool {
        self.conflict.is_some()
    }

    /// Generator operations followed by user operations
    #[must_use]
    pub fn merged(&self) -> Vec<AtomicOperation> {
        self.resolved_ai
            .iter()
            .chain(&self.resolved_user)
            .cloned()
            .collect()
    }
}

/// Merges a generator batch with the user batch queued while it ran
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    renamer: Arc<dyn IdRenamer>,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(Arc::new(SuffixRenamer::default()))
    }
}

impl ConflictDetector {
    /// Create a detector with the given renamer
    #[inline]
    #[must_use]
    pub fn new(renamer: Arc<dyn IdRenamer>) -> Self {
        Self { renamer }
    }

    /// Active renamer
    #[inline]
    #[must_use]
    pub fn renamer(&self) -> &dyn IdRenamer {
        self.renamer.as_ref()
    }

    /// Detect conflicts between `ai` and `user` over an empty world
    #[must_use]
    pub fn detect(&self, ai: &[AtomicOperation], user: &[AtomicOperation]) -> ConflictReport {
        self.detect_against(&WorldState::new(), ai, user)
    }

    /// Detect conflicts for batches that will be applied to `existing`
    ///
    /// Renamed user entities never take the id of a live entity in `existing`.
    #[must_use]
    pub fn detect_against(
        &self,
        existing: &WorldState,
        ai: &[AtomicOperation],
        user: &[AtomicOperation],
    ) -> ConflictReport {
        let mut by_target: IndexMap<TypedId, Vec<&AtomicOperation>> = IndexMap::new();
        for op in ai {
            by_target.entry(op.target()).or_default().push(op);
        }

        let renamed = self.rename_collisions(existing, &by_target, ai, user);
        let resolved_user: Vec<AtomicOperation> = user
            .iter()
            .map(|op| match renamed.get(&op.target()) {
                Some(new_id) => op.retarget(new_id.clone()),
                None => op.clone(),
            })
            .collect();

        let mut conflicting_ai: Vec<AtomicOperation> = Vec::new();
        let mut conflicting_user: Vec<AtomicOperation> = Vec::new();
        for user_op in &resolved_user {
            let Some(candidates) = by_target.get(&user_op.target()) else {
                continue;
            };
            for ai_op in candidates {
                if classify(ai_op, user_op).is_blocking() {
                    if !conflicting_ai.contains(ai_op) {
                        conflicting_ai.push((*ai_op).clone());
                    }
                    if !conflicting_user.contains(user_op) {
                        conflicting_user.push(user_op.clone());
                    }
                }
            }
        }

        let conflict = if conflicting_user.is_empty() {
            None
        } else {
            // Keep generator order rather than discovery order
            conflicting_ai.sort_by_key(|op| ai.iter().position(|a| a == op));
            tracing::warn!(
                "Blocking conflict: {} generator and {} user operations",
                conflicting_ai.len(),
                conflicting_user.len()
            );
            Some(BlockingConflict {
                ai: conflicting_ai,
                user: conflicting_user,
            })
        };

        ConflictReport {
            resolved_ai: ai.to_vec(),
            resolved_user,
            renamed,
            conflict,
        }
    }

    fn rename_collisions(
        &self,
        existing: &WorldState,
        by_target: &IndexMap<TypedId, Vec<&AtomicOperation>>,
        ai: &[AtomicOperation],
        user: &[AtomicOperation],
    ) -> IndexMap<TypedId, String> {
        let mut taken: IndexSet<TypedId> = ai
            .iter()
            .chain(user)
            .map(AtomicOperation::target)
            .chain(existing.live_entities().map(Entity::typed_id))
            .collect();
        let mut renamed = IndexMap::new();

        for user_op in user {
            let target = user_op.target();
            if renamed.contains_key(&target) {
                continue;
            }
            let collides = by_target.get(&target).is_some_and(|ops| {
                ops.iter()
                    .any(|ai_op| classify(ai_op, user_op) == Interaction::CreateCollision)
            });
            if !collides {
                continue;
            }

            let new_id = self.fresh_id(&target, &taken);
            tracing::debug!(
                "Renamed user-created {} to '{}' ({} renamer)",
                target,
                new_id,
                self.renamer.name()
            );
            taken.insert(TypedId::new(target.kind, new_id.clone()));
            renamed.insert(target, new_id);
        }

        renamed
    }

    fn fresh_id(&self, target: &TypedId, taken: &IndexSet<TypedId>) -> String {
        const MAX_PROPOSALS: usize = 8;

        let mut candidate = self.renamer.propose(target);
        for _ in 1..MAX_PROPOSALS {
            if !taken.contains(&TypedId::new(target.kind, candidate.clone())) {
                return candidate;
            }
            candidate = self.renamer.propose(target);
        }

        let base = candidate;
        let mut n = 1usize;
        loop {
            let next = format!("{base}_{n}");
            if !taken.contains(&TypedId::new(target.kind, next.clone())) {
                return next;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rename::SequentialRenamer;
    use pretty_assertions::assert_eq;
    use saga_world::{EntityKind, Operator};

    fn detector() -> ConflictDetector {
        ConflictDetector::new(Arc::new(SequentialRenamer::new("_user_created_")))
    }

    #[test]
    fn empty_batches() {
        let report = detector().detect(&[], &[]);
        assert!(!report.has_blocking_conflict());
        assert!(report.resolved_ai.is_empty());
        assert!(report.resolved_user.is_empty());
        assert!(report.conflict.is_none());
    }

    #[test]
    fn create_collision_renames_user_and_follow_ups() {
        let ai = vec![AtomicOperation::create(EntityKind::Item, "sword")];
        let user = vec![
            AtomicOperation::create(EntityKind::Item, "sword"),
            AtomicOperation::modify(EntityKind::Item, "sword", "dmg", Operator::Equal, 5),
        ];

        let report = detector().detect(&ai, &user);

        assert!(!report.has_blocking_conflict());
        assert_eq!(report.resolved_ai, ai);
        assert_eq!(
            report.resolved_user,
            vec![
                AtomicOperation::create(EntityKind::Item, "sword_user_created_1"),
                AtomicOperation::modify(
                    EntityKind::Item,
                    "sword_user_created_1",
                    "dmg",
                    Operator::Equal,
                    5
                ),
            ]
        );
        assert_eq!(
            report.renamed.get(&TypedId::new(EntityKind::Item, "sword")),
            Some(&"sword_user_created_1".to_string())
        );
    }

    #[test]
    fn same_key_modify_blocks() {
        let ai = vec![AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Equal, 10)];
        let user = vec![AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Equal, 20)];

        let report = detector().detect(&ai, &user);

        let conflict = report.conflict.unwrap();
        assert_eq!(conflict.ai, ai);
        assert_eq!(conflict.user, user);
    }

    #[test]
    fn different_keys_and_deletes_do_not_block() {
        let ai = vec![
            AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Equal, 10),
            AtomicOperation::delete(EntityKind::Item, "cup"),
            AtomicOperation::create(EntityKind::Place, "inn"),
        ];
        let user = vec![
            AtomicOperation::modify(EntityKind::Character, "hero", "mood", Operator::Equal, "calm"),
            AtomicOperation::modify(EntityKind::Item, "cup", "full", Operator::Equal, true),
            AtomicOperation::modify(EntityKind::Place, "inn", "open", Operator::Equal, true),
        ];

        let report = detector().detect(&ai, &user);

        assert!(!report.has_blocking_conflict());
        assert!(report.renamed.is_empty());
        assert_eq!(report.merged().len(), 6);
    }

    #[test]
    fn renamed_entity_cannot_block() {
        // the user's modify follows the rename, so it no longer meets the generator's
        let ai = vec![
            AtomicOperation::create(EntityKind::Item, "sword"),
            AtomicOperation::modify(EntityKind::Item, "sword", "dmg", Operator::Equal, 1),
        ];
        let user = vec![
            AtomicOperation::create(EntityKind::Item, "sword"),
            AtomicOperation::modify(EntityKind::Item, "sword", "dmg", Operator::Equal, 2),
        ];

        let report = detector().detect(&ai, &user);

        assert!(!report.has_blocking_conflict());
        assert_eq!(report.renamed.len(), 1);
    }

    #[test]
    fn conflicting_lists_are_deduplicated() {
        let ai = vec![
            AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Equal, 10),
            AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Add, 1),
        ];
        let user = vec![
            AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Equal, 20),
            AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Equal, 20),
        ];

        let conflict = detector().detect(&ai, &user).conflict.unwrap();

        assert_eq!(conflict.ai, ai);
        assert_eq!(conflict.user.len(), 1);
    }

    #[test]
    fn rename_skips_ids_already_in_use() {
        let ai = vec![
            AtomicOperation::create(EntityKind::Item, "sword"),
            AtomicOperation::create(EntityKind::Item, "sword_user_created_1"),
        ];
        let user = vec![AtomicOperation::create(EntityKind::Item, "sword")];

        let report = detector().detect(&ai, &user);

        assert_eq!(
            report.resolved_user[0].target(),
            TypedId::new(EntityKind::Item, "sword_user_created_2")
        );
    }

    #[test]
    fn rename_skips_ids_live_in_the_input_world() {
        let mut world = WorldState::new();
        saga_world::apply_operations(
            &mut world,
            &[AtomicOperation::create(EntityKind::Item, "sword_user_created_1")],
        );
        let ai = vec![AtomicOperation::create(EntityKind::Item, "sword")];
        let user = vec![AtomicOperation::create(EntityKind::Item, "sword")];

        let report = detector().detect_against(&world, &ai, &user);

        assert_eq!(
            report.resolved_user[0].target(),
            TypedId::new(EntityKind::Item, "sword_user_created_2")
        );
    }

    #[test]
    fn differing_operators_on_one_key_still_block() {
        let ai = vec![AtomicOperation::modify(EntityKind::Character, "npc", "hp", Operator::Equal, 100)];
        let user = vec![AtomicOperation::modify(EntityKind::Character, "npc", "hp", Operator::Subtract, 10)];

        let report = detector().detect(&ai, &user);

        assert!(report.has_blocking_conflict());
        let conflict = report.conflict.unwrap();
        assert_eq!(conflict.ai, ai);
        assert_eq!(conflict.user, user);
    }

    #[test]
    fn rename_and_blocking_modify_in_one_batch() {
        let ai = vec![
            AtomicOperation::create(EntityKind::Item, "sword"),
            AtomicOperation::modify(EntityKind::Character, "npc", "hp", Operator::Equal, 100),
            AtomicOperation::modify(EntityKind::Character, "npc", "mood", Operator::Equal, "angry"),
        ];
        let user = vec![
            AtomicOperation::create(EntityKind::Item, "sword"),
            AtomicOperation::modify(EntityKind::Item, "sword", "owner", Operator::Equal, "user"),
            AtomicOperation::modify(EntityKind::Character, "npc", "hp", Operator::Subtract, 10),
        ];

        let report = detector().detect(&ai, &user);

        assert!(report.has_blocking_conflict());
        assert_eq!(report.resolved_ai, ai);
        assert_eq!(
            report.resolved_user,
            vec![
                AtomicOperation::create(EntityKind::Item, "sword_user_created_1"),
                AtomicOperation::modify(
                    EntityKind::Item,
                    "sword_user_created_1",
                    "owner",
                    Operator::Equal,
                    "user"
                ),
                AtomicOperation::modify(EntityKind::Character, "npc", "hp", Operator::Subtract, 10),
            ]
        );
        let conflict = report.conflict.unwrap();
        assert_eq!(conflict.ai, vec![ai[1].clone()]);
        assert_eq!(conflict.user, vec![user[2].clone()]);
    }

    #[test]
    fn classify_pairs() {
        let create = AtomicOperation::create(EntityKind::Item, "a");
        let modify = AtomicOperation::modify(EntityKind::Item, "a", "k", Operator::Equal, 1);
        let delete = AtomicOperation::delete(EntityKind::Item, "a");
        let other = AtomicOperation::create(EntityKind::Place, "a");

        assert_eq!(classify(&create, &create), Interaction::CreateCollision);
        assert_eq!(classify(&modify, &modify), Interaction::KeyCollision);
        assert_eq!(classify(&create, &modify), Interaction::Compatible);
        assert_eq!(classify(&delete, &modify), Interaction::Compatible);
        assert_eq!(classify(&create, &other), Interaction::Disjoint);
    }
}
