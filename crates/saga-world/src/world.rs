//! World state snapshots
//!
//! A [`WorldState`] holds one map per [`EntityKind`]. The maps are
//! persistent (`im::OrdMap`), so cloning a snapshot is O(1) and later edits
//! to either copy never leak into the other.

use crate::entity::{Entity, EntityKind, TypedId};
use serde::{Deserialize, Serialize};

type EntityMap = im::OrdMap<String, Entity>;

/// Independent snapshot of every entity in the simulated world
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    #[serde(default)]
    items: EntityMap,
    #[serde(default)]
    characters: EntityMap,
    #[serde(default)]
    places: EntityMap,
}

impl WorldState {
    /// Empty world
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: EntityKind) -> &EntityMap {
        match kind {
            EntityKind::Item => &self.items,
            EntityKind::Character => &self.characters,
            EntityKind::Place => &self.places,
        }
    }

    fn map_mut(&mut self, kind: EntityKind) -> &mut EntityMap {
        match kind {
            EntityKind::Item => &mut self.items,
            EntityKind::Character => &mut self.characters,
            EntityKind::Place => &mut self.places,
        }
    }

    /// Find a live entity
    #[must_use]
    pub fn find(&self, target: &TypedId) -> Option<&Entity> {
        self.find_including_destroyed(target)
            .filter(|e| !e.is_destroyed())
    }

    /// Find an entity, destroyed or not
    #[must_use]
    pub fn find_including_destroyed(&self, target: &TypedId) -> Option<&Entity> {
        self.map(target.kind).get(&target.id)
    }

    /// Check for a live entity
    #[inline]
    #[must_use]
    pub fn contains(&self, target: &TypedId) -> bool {
        self.find(target).is_some()
    }

    pub(crate) fn find_live_mut(&mut self, target: &TypedId) -> Option<&mut Entity> {
        self.map_mut(target.kind)
            .get_mut(&target.id)
            .filter(|e| !e.is_destroyed())
    }

    pub(crate) fn find_any_mut(&mut self, target: &TypedId) -> Option<&mut Entity> {
        self.map_mut(target.kind).get_mut(&target.id)
    }

    /// Insert or replace by `(kind, id)`
    pub(crate) fn insert(&mut self, entity: Entity) -> Option<Entity> {
        let id = entity.id().to_string();
        self.map_mut(entity.kind()).insert(id, entity)
    }

    /// Entities of one kind ordered by id, destroyed ones included
    pub fn entities(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> + '_ {
        self.map(kind).values()
    }

    /// Live entities of every kind
    pub fn live_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        EntityKind::ALL
            .into_iter()
            .flat_map(move |kind| self.entities(kind))
            .filter(|e| !e.is_destroyed())
    }

    /// Total number of stored entities, destroyed ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len() + self.characters.len() + self.places.len()
    }

    /// Check for no stored entities
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn ids_are_scoped_per_kind() {
        let mut world = WorldState::new();
        world.insert(Entity::new(EntityKind::Item, "x"));
        world.insert(Entity::new(EntityKind::Place, "x"));

        assert_eq!(world.len(), 2);
        assert!(world.contains(&TypedId::new(EntityKind::Item, "x")));
        assert!(!world.contains(&TypedId::new(EntityKind::Character, "x")));
    }

    #[test]
    fn destroyed_entities_are_hidden_from_find() {
        let mut world = WorldState::new();
        let mut e = Entity::new(EntityKind::Item, "cup");
        e.set_destroyed(true);
        world.insert(e);

        let cup = TypedId::new(EntityKind::Item, "cup");
        assert!(world.find(&cup).is_none());
        assert!(world.find_including_destroyed(&cup).is_some());
        assert!(world.find_live_mut(&cup).is_none());
        assert_eq!(world.live_entities().count(), 0);
    }

    #[test]
    fn clones_do_not_share_edits() {
        let mut world = WorldState::new();
        world.insert(Entity::new(EntityKind::Character, "hero"));
        let snapshot = world.clone();

        let hero = TypedId::new(EntityKind::Character, "hero");
        world
            .find_live_mut(&hero)
            .unwrap()
            .set_attribute("hp", Value::Int(1))
            .unwrap();

        assert!(snapshot.find(&hero).unwrap().attribute("hp").is_none());
        assert_ne!(world, snapshot);
    }
}
