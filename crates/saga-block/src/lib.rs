//! Saga Block
//!
//! Branching narrative tree where each Block holds its own world snapshot,
//! and generated and user edits are reconciled per Block.
//!
//! # Core Concepts
//!
//! - [`BlockManager`]: Registry, per-Block locking and every state transition
//! - [`BlockStatus`]: Idle / Loading / ResolvingConflict / Error, each owning its snapshots
//! - [`BlockService`]: Async contract for the transport layer
//! - [`TreeSnapshot`]: Capture and restore of the whole tree
//!
//! # Example
//!
//! ```rust
//! use saga_block::{BlockManager, StatusCode};
//! use saga_world::{AtomicOperation, EntityKind, ValueMap};
//!
//! # tokio_test_block_on(async {
//! let manager = BlockManager::default();
//! let child = manager.create_child(None, ValueMap::new()).await?;
//!
//! manager
//!     .apply_or_queue_operations(child.id(), &[AtomicOperation::create(EntityKind::Item, "sword")])
//!     .await?;
//! let outcome = manager
//!     .handle_generator_completion(child.id(), true, "A blade glints.".into(), vec![], ValueMap::new())
//!     .await?;
//! assert_eq!(outcome.status(), StatusCode::Idle);
//! # Ok::<(), saga_block::BlockError>(())
//! # }).unwrap();
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod block;
mod config;
mod error;
mod locks;
mod manager;
mod persist;
mod service;
mod status;
mod types;

pub use block::{
    Block, META_CREATION_TIME, META_ERROR, META_OUTPUT_VARIABLES, META_TRIGGER_PARAMS,
};
pub use config::{BlockManagerConfig, DEFAULT_CHILD_ID_PREFIX, DEFAULT_ROOT_ID};
pub use error::{BlockError, ConfigError};
pub use locks::BlockLocks;
pub use manager::BlockManager;
pub use persist::{BlockRecord, TreeSnapshot};
pub use service::BlockService;
pub use status::{BlockStatus, ConflictBlock, ErrorBlock, ErrorCause, IdleBlock, LoadingBlock};
pub use types::{ApplyOutcome, BlockId, BlockNode, StatusCode, Transition, TransitionOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used items
pub mod prelude {
    pub use crate::{
        ApplyOutcome, BlockError, BlockId, BlockManager, BlockManagerConfig, BlockService,
        BlockStatus, StatusCode, TransitionOutcome,
    };
}
