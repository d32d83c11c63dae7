//! Testing utilities for the saga workspace
//!
//! Shared fixtures and tracing setup.

#![allow(missing_docs)]

use saga_block::{BlockId, BlockManager, BlockManagerConfig};
use saga_merge::{ConflictDetector, SequentialRenamer};
use saga_world::{AtomicOperation, EntityKind, Operator, Value, ValueMap};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a test subscriber once; `RUST_LOG` overrides the `warn` default
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Manager whose renames are deterministic (`{id}_user_created_{n}`)
pub fn setup_manager() -> BlockManager {
    init_tracing();
    let config = BlockManagerConfig::new();
    let detector = ConflictDetector::new(Arc::new(SequentialRenamer::new(
        config.rename_infix.clone(),
    )));
    BlockManager::with_detector(config, detector)
}

/// Loading child of the root
pub async fn spawn_loading_child(manager: &BlockManager) -> BlockId {
    manager
        .create_child(None, trigger_params("continue"))
        .await
        .unwrap()
        .id()
        .clone()
}

/// Idle child of the root, generated from `operations`
pub async fn spawn_idle_child(manager: &BlockManager, operations: Vec<AtomicOperation>) -> BlockId {
    let id = spawn_loading_child(manager).await;
    manager
        .handle_generator_completion(&id, true, "generated".into(), operations, ValueMap::new())
        .await
        .unwrap();
    id
}

pub fn trigger_params(prompt: &str) -> ValueMap {
    let mut params = ValueMap::new();
    params.insert("prompt".into(), Value::from(prompt));
    params
}

pub fn create_hero() -> AtomicOperation {
    AtomicOperation::create(EntityKind::Character, "hero")
}

pub fn set_hp(hp: i64) -> AtomicOperation {
    AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Equal, hp)
}
