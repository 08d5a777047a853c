//! Service context
//!
//! Shared database access threaded through the workflow services. The
//! acting user is always an explicit `actor_id` parameter on each call,
//! never ambient state.

use custos_persistence::Database;
use sqlx::SqlitePool;

/// Context for workflow operations - carries database access
#[derive(Clone)]
pub struct ServiceContext {
    pool: SqlitePool,
}

impl ServiceContext {
    /// Create a new service context from the database facade
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Create from a pool directly (tests, embedding)
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
