//! Game state: flat per-Block settings outside the simulated world

use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};

/// Flat `key -> value` settings, never touched by generated operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameState(ValueMap);

impl GameState {
    /// Empty game state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a setting
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a setting, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a setting
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Merge `settings` into this state; later keys win
    pub fn apply(&mut self, settings: ValueMap) {
        for (key, value) in settings {
            self.0.insert(key, value);
        }
    }

    /// Settings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> + '_ {
        self.0.iter()
    }

    /// Number of settings
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check for no settings
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ValueMap> for GameState {
    fn from(map: ValueMap) -> Self {
        Self(map)
    }
}
