//! Atomic operation engine
//!
//! Operations run sequentially against one mutable [`WorldState`]. A failing
//! operation produces a failed [`OperationResult`] and the batch carries on.

use crate::entity::Entity;
use crate::operation::{AtomicOperation, OperationError, OperationResult};
use crate::world::WorldState;

/// Apply `ops` in order, returning one result per operation
pub fn apply_operations(world: &mut WorldState, ops: &[AtomicOperation]) -> Vec<OperationResult> {
    let results: Vec<_> = ops.iter().map(|op| apply_operation(world, op)).collect();

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        tracing::debug!("Applied {} operations, {} failed", results.len(), failed);
    }
    results
}

/// Apply a single operation
pub fn apply_operation(world: &mut WorldState, op: &AtomicOperation) -> OperationResult {
    match try_apply(world, op) {
        Ok(()) => {
            tracing::trace!("Applied {}", op);
            OperationResult::success(op.clone())
        }
        Err(e) => {
            tracing::debug!("Rejected {}: {}", op, e);
            OperationResult::failure(op.clone(), e)
        }
    }
}

fn try_apply(world: &mut WorldState, op: &AtomicOperation) -> Result<(), OperationError> {
    let target = op.target();

    match op {
        AtomicOperation::Create {
            kind,
            id,
            initial_attributes,
        } => {
            if world.contains(&target) {
                return Err(OperationError::AlreadyExists(target));
            }

            let mut entity = Entity::new(*kind, id.clone());
            for (key, value) in initial_attributes {
                entity
                    .set_attribute(key, value.clone())
                    .map_err(|source| OperationError::Attribute {
                        target: target.clone(),
                        source,
                    })?;
            }
            world.insert(entity);
            Ok(())
        }

        AtomicOperation::Modify {
            key,
            operator,
            value,
            ..
        } => {
            let Some(entity) = world.find_live_mut(&target) else {
                return Err(OperationError::NotFound(target));
            };
            if key.trim().is_empty() {
                return Err(OperationError::invalid_modify(target, "missing attribute key"));
            }
            if value.is_null() {
                return Err(OperationError::invalid_modify(target, "missing value"));
            }

            entity
                .modify_attribute(key, *operator, value)
                .map_err(|source| OperationError::Attribute { target, source })
        }

        AtomicOperation::Delete { .. } => {
            if let Some(entity) = world.find_any_mut(&target) {
                entity.set_destroyed(true);
            }
            Ok(())
        }
    }
}
