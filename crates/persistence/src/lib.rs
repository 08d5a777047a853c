//! # Custos Persistence
//!
//! Persistence layer for Custos - SQLite via sqlx.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Database                           │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌───────────┐  │
//! │  │   SQLite    │   │ Modification     │   │  Activity │  │
//! │  │  (users)    │   │ store (staging)  │   │   trail   │  │
//! │  └─────────────┘   └──────────────────┘   └───────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The database is the single synchronization point: the one-pending-
//! modification-per-user invariant is a partial unique index, and
//! resolution runs in a transaction spanning the modification update and
//! the user write.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custos_persistence::{Database, ModificationRepo};
//!
//! let db = Database::init_with_migrations("sqlite:custos.db?mode=rwc").await?;
//! let pending = ModificationRepo::find_pending_for_user(db.pool(), 7).await?;
//! ```

pub mod error;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use sqlite::{
    create_pool, init_database, run_migrations, ActivityFilter, ActivityRepo, ModificationRepo,
    NewActivity, NewModification, UserRepo,
};
pub use sqlite::schema::{ActivityRow, InitiatorCountRow, ModificationRow, UserRow};

use sqlx::SqlitePool;

/// Database facade - owns the connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to an existing database
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:custos.db?mode=rwc")
    pub async fn new(db_url: &str) -> PersistenceResult<Self> {
        let pool = create_pool(db_url).await?;
        Ok(Self { pool })
    }

    /// Connect, creating the database and running migrations if needed
    pub async fn init_with_migrations(db_url: &str) -> PersistenceResult<Self> {
        let pool = init_database(db_url).await?;
        Ok(Self { pool })
    }

    /// Get the SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
