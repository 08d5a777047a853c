//! Access-control collaborator
//!
//! Checks whether an actor holds one of the permissions required to call a
//! workflow operation. This runs in the surrounding handler layer, before
//! the engine; the engine itself performs no permission checks. Maker must
//! differ from checker, and that policy is also enforced here.

use crate::error::{WorkflowError, WorkflowResult};
use custos_core::Permission;
use custos_persistence::UserRepo;
use sqlx::SqlitePool;

/// Fail unless `actor_id` holds at least one of `permissions`.
pub async fn require_any_permission(
    pool: &SqlitePool,
    actor_id: i64,
    permissions: &[Permission],
) -> WorkflowResult<()> {
    if UserRepo::has_any_permission(pool, actor_id, permissions).await? {
        Ok(())
    } else {
        Err(WorkflowError::PermissionDenied { actor_id })
    }
}

/// Fail unless the verifier differs from the modification's initiator.
/// The engine trusts this to have run; it never re-checks.
pub fn require_distinct_verifier(initiator_id: i64, verifier_id: i64) -> WorkflowResult<()> {
    if initiator_id == verifier_id {
        return Err(WorkflowError::PermissionDenied {
            actor_id: verifier_id,
        });
    }
    Ok(())
}
