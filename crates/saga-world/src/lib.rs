//! Saga World
//!
//! The simulated world held by every narrative Block, and the engine that
//! changes it.
//!
//! # Core Concepts
//!
//! - [`WorldState`]: Independent, cheaply cloned snapshot of all entities
//! - [`Entity`]: Item, Character or Place with free-form attributes
//! - [`AtomicOperation`]: Create / Modify / Delete, plain serializable data
//! - [`apply_operations`]: Sequential application with per-operation results
//! - [`GameState`]: Per-Block settings outside the simulated world
//!
//! # Example
//!
//! ```rust
//! use saga_world::{apply_operations, AtomicOperation, EntityKind, Operator, WorldState};
//!
//! let mut world = WorldState::new();
//! let results = apply_operations(
//!     &mut world,
//!     &[
//!         AtomicOperation::create(EntityKind::Character, "hero"),
//!         AtomicOperation::modify(EntityKind::Character, "hero", "hp", Operator::Add, 10),
//!     ],
//! );
//! assert!(results.iter().all(|r| r.is_success()));
//! ```

mod apply;
mod entity;
mod game;
mod operation;
mod operator;
mod value;
mod world;

pub use apply::{apply_operation, apply_operations};
pub use entity::{
    Entity, EntityKind, ParseKindError, TypedId, ATTR_DESTROYED, ATTR_ENTITY_ID, ATTR_ENTITY_KIND,
};
pub use game::GameState;
pub use operation::{AtomicOperation, OperationError, OperationResult, OperationResults};
pub use operator::{AttributeError, Operator};
pub use value::{Value, ValueMap};
pub use world::WorldState;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used items
pub mod prelude {
    pub use crate::{
        apply_operations, AtomicOperation, EntityKind, GameState, Operator, OperationResult,
        OperationResults, TypedId, Value, ValueMap, WorldState,
    };
}
