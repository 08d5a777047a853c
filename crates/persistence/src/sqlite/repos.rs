//! Repository implementations for SQLite
//!
//! The modification store is the synchronization point of the whole
//! workflow: the one-pending-per-user invariant is enforced here by the
//! partial unique index, never by application-level check-then-insert.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{DateTime, Utc};
use custos_core::{
    ActivityKind, AuthorizationStatus, EntityKind, Permission, TimeWindow, UserSnapshot,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, SqliteConnection, SqlitePool};
use std::time::Duration;

/// Bounded wait for a pool connection; elapsing surfaces as a retryable
/// timeout error.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// User Repository
// ============================================================================

/// Repository for the users table
pub struct UserRepo;

impl UserRepo {
    /// Get user by ID
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> PersistenceResult<UserRow> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("User", id))
    }

    /// Get user by username
    pub async fn get_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> PersistenceResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Check whether a username is taken by any live user other than
    /// `exclude_id` (pass `None` when proposing a brand-new user).
    pub async fn username_taken(
        pool: &SqlitePool,
        username: &str,
        exclude_id: Option<i64>,
    ) -> PersistenceResult<bool> {
        let count: (i64,) = match exclude_id {
            Some(id) => {
                sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? AND id != ?")
                    .bind(username)
                    .bind(id)
                    .fetch_one(pool)
                    .await?
            }
            None => sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
                .bind(username)
                .fetch_one(pool)
                .await?,
        };
        Ok(count.0 > 0)
    }

    /// Transaction-scoped variant of [`UserRepo::username_taken`], used by
    /// the approval-time uniqueness re-check.
    pub async fn username_taken_in(
        conn: &mut SqliteConnection,
        username: &str,
    ) -> PersistenceResult<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count.0 > 0)
    }

    /// Insert a new user from an approved modification snapshot, linking the
    /// modification back. Runs inside the resolution transaction.
    pub async fn insert_from_snapshot(
        conn: &mut SqliteConnection,
        snapshot: &UserSnapshot,
        modification_id: Option<i64>,
    ) -> PersistenceResult<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users
                (username, first_name, last_name, password_hash, access_level,
                 active, modification_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&snapshot.username)
        .bind(&snapshot.first_name)
        .bind(&snapshot.last_name)
        .bind(&snapshot.password_hash)
        .bind(snapshot.access_level.as_i64())
        .bind(snapshot.active)
        .bind(modification_id)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Overwrite a user's mutable fields from an approved modification
    /// snapshot. The credential field is only touched when
    /// `overwrite_password` is set (security modifications).
    pub async fn apply_snapshot(
        conn: &mut SqliteConnection,
        user_id: i64,
        snapshot: &UserSnapshot,
        modification_id: i64,
        overwrite_password: bool,
    ) -> PersistenceResult<()> {
        let now = Utc::now();
        let result = if overwrite_password {
            sqlx::query(
                r#"
                UPDATE users
                SET username = ?, first_name = ?, last_name = ?, password_hash = ?,
                    access_level = ?, active = ?, modification_id = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&snapshot.username)
            .bind(&snapshot.first_name)
            .bind(&snapshot.last_name)
            .bind(&snapshot.password_hash)
            .bind(snapshot.access_level.as_i64())
            .bind(snapshot.active)
            .bind(modification_id)
            .bind(now)
            .bind(user_id)
            .execute(&mut *conn)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE users
                SET username = ?, first_name = ?, last_name = ?,
                    access_level = ?, active = ?, modification_id = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&snapshot.username)
            .bind(&snapshot.first_name)
            .bind(&snapshot.last_name)
            .bind(snapshot.access_level.as_i64())
            .bind(snapshot.active)
            .bind(modification_id)
            .bind(now)
            .bind(user_id)
            .execute(&mut *conn)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("User", user_id));
        }
        Ok(())
    }

    /// Most recently created users
    pub async fn most_recent(pool: &SqlitePool, limit: i64) -> PersistenceResult<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    /// Users ranked by how many modifications with `status` they initiated
    /// inside `window`.
    pub async fn top_initiators(
        pool: &SqlitePool,
        status: AuthorizationStatus,
        window: TimeWindow,
        limit: i64,
    ) -> PersistenceResult<Vec<InitiatorCountRow>> {
        let rows = sqlx::query_as::<_, InitiatorCountRow>(
            r#"
            SELECT users.id, users.username, users.first_name, users.last_name,
                   (SELECT COUNT(*) FROM user_modifications
                    WHERE user_modifications.initiator_id = users.id
                      AND user_modifications.authorization_status = ?
                      AND user_modifications.created_at >= ?
                      AND user_modifications.created_at < ?) AS records
            FROM users
            ORDER BY records DESC
            LIMIT ?
            "#,
        )
        .bind(status.as_i64())
        .bind(window.start)
        .bind(window.end)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Per-user counts over an arbitrary window, every user included.
    pub async fn performance_summary(
        pool: &SqlitePool,
        status: AuthorizationStatus,
        window: TimeWindow,
    ) -> PersistenceResult<Vec<InitiatorCountRow>> {
        let rows = sqlx::query_as::<_, InitiatorCountRow>(
            r#"
            SELECT users.id, users.username, users.first_name, users.last_name,
                   (SELECT COUNT(*) FROM user_modifications
                    WHERE user_modifications.initiator_id = users.id
                      AND user_modifications.authorization_status = ?
                      AND user_modifications.created_at >= ?
                      AND user_modifications.created_at < ?) AS records
            FROM users
            ORDER BY records DESC
            "#,
        )
        .bind(status.as_i64())
        .bind(window.start)
        .bind(window.end)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Replace the user's permission set with `permissions` (full replace,
    /// not merge). Runs inside the resolution transaction.
    pub async fn replace_permissions(
        conn: &mut SqliteConnection,
        user_id: i64,
        permissions: &[Permission],
    ) -> PersistenceResult<()> {
        sqlx::query("DELETE FROM user_permissions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        for permission in permissions {
            sqlx::query("INSERT INTO user_permissions (user_id, permission_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(permission.as_i64())
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Permission set of a user
    pub async fn permissions_of(
        pool: &SqlitePool,
        user_id: i64,
    ) -> PersistenceResult<Vec<Permission>> {
        let codes: Vec<(i64,)> = sqlx::query_as(
            "SELECT permission_id FROM user_permissions WHERE user_id = ? ORDER BY permission_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        codes
            .into_iter()
            .map(|(code,)| {
                Permission::from_i64(code)
                    .ok_or_else(|| PersistenceError::invalid_enum("permission_id", code))
            })
            .collect()
    }

    /// Whether the user holds any of `permissions`
    pub async fn has_any_permission(
        pool: &SqlitePool,
        user_id: i64,
        permissions: &[Permission],
    ) -> PersistenceResult<bool> {
        if permissions.is_empty() {
            return Ok(false);
        }
        let mut qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM user_permissions WHERE user_id = ",
        );
        qb.push_bind(user_id);
        qb.push(" AND permission_id IN (");
        let mut separated = qb.separated(", ");
        for permission in permissions {
            separated.push_bind(permission.as_i64());
        }
        qb.push(")");

        let count: (i64,) = qb.build_query_as().fetch_one(pool).await?;
        Ok(count.0 > 0)
    }
}

// ============================================================================
// Modification Repository
// ============================================================================

/// A staged change about to enter the store.
#[derive(Debug, Clone)]
pub struct NewModification<'a> {
    /// Target user; `None` for create proposals
    pub user_id: Option<i64>,
    pub snapshot: &'a UserSnapshot,
    pub security_modification: bool,
    pub initiator_id: i64,
}

/// Repository for the user_modifications table
pub struct ModificationRepo;

impl ModificationRepo {
    /// Stage a new PENDING modification.
    ///
    /// The partial unique index on (user_id) closes the check-then-insert
    /// race: a second unresolved proposal against the same user surfaces as
    /// `DuplicateProposal` regardless of interleaving.
    pub async fn stage(
        pool: &SqlitePool,
        new: NewModification<'_>,
    ) -> PersistenceResult<ModificationRow> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO user_modifications
                (user_id, username, first_name, last_name, password_hash,
                 access_level, active, security_modification,
                 authorization_status, initiator_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(&new.snapshot.username)
        .bind(&new.snapshot.first_name)
        .bind(&new.snapshot.last_name)
        .bind(&new.snapshot.password_hash)
        .bind(new.snapshot.access_level.as_i64())
        .bind(new.snapshot.active)
        .bind(new.security_modification)
        .bind(AuthorizationStatus::Pending.as_i64())
        .bind(new.initiator_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| match (&e, new.user_id) {
            (sqlx::Error::Database(db), Some(user_id)) if db.is_unique_violation() => {
                PersistenceError::DuplicateProposal { user_id }
            }
            _ => PersistenceError::from(e),
        })?;

        Self::get_by_id(pool, result.last_insert_rowid()).await
    }

    /// Get a modification by ID
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> PersistenceResult<ModificationRow> {
        sqlx::query_as::<_, ModificationRow>("SELECT * FROM user_modifications WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("UserModification", id))
    }

    /// The unresolved modification targeting `user_id`, if any
    pub async fn find_pending_for_user(
        pool: &SqlitePool,
        user_id: i64,
    ) -> PersistenceResult<Option<ModificationRow>> {
        let row = sqlx::query_as::<_, ModificationRow>(
            "SELECT * FROM user_modifications WHERE user_id = ? AND authorization_status = ?",
        )
        .bind(user_id)
        .bind(AuthorizationStatus::Pending.as_i64())
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Resolve a PENDING modification to a terminal status. The only mutator
    /// of the status/verifier fields; re-resolving is an error, never a
    /// silent no-op. Runs inside the resolution transaction.
    pub async fn resolve(
        conn: &mut SqliteConnection,
        id: i64,
        verifier_id: i64,
        outcome: AuthorizationStatus,
        comment: Option<&str>,
    ) -> PersistenceResult<ModificationRow> {
        debug_assert!(outcome.is_terminal());

        let result = sqlx::query(
            r#"
            UPDATE user_modifications
            SET authorization_status = ?, verifier_id = ?, verifier_comment = ?, updated_at = ?
            WHERE id = ? AND authorization_status = ?
            "#,
        )
        .bind(outcome.as_i64())
        .bind(verifier_id)
        .bind(comment)
        .bind(Utc::now())
        .bind(id)
        .bind(AuthorizationStatus::Pending.as_i64())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish unknown id from an already-terminal record
            let status: Option<(i64,)> = sqlx::query_as(
                "SELECT authorization_status FROM user_modifications WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
            return match status {
                None => Err(PersistenceError::not_found("UserModification", id)),
                Some((code,)) => {
                    let status = AuthorizationStatus::from_i64(code)
                        .map(|s| s.as_str().to_string())
                        .unwrap_or_else(|| code.to_string());
                    Err(PersistenceError::AlreadyResolved { id, status })
                }
            };
        }

        let row = sqlx::query_as::<_, ModificationRow>(
            "SELECT * FROM user_modifications WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Count modifications initiated by `initiator_id` with `status` created
    /// inside `window`. The aggregation layer's recompute query.
    pub async fn count_in_window(
        pool: &SqlitePool,
        initiator_id: i64,
        status: AuthorizationStatus,
        window: TimeWindow,
    ) -> PersistenceResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM user_modifications
            WHERE initiator_id = ? AND authorization_status = ?
              AND created_at >= ? AND created_at < ?
            "#,
        )
        .bind(initiator_id)
        .bind(status.as_i64())
        .bind(window.start)
        .bind(window.end)
        .fetch_one(pool)
        .await?;
        Ok(count.0)
    }

    /// Most recent modifications initiated by a user
    pub async fn most_recent_by_initiator(
        pool: &SqlitePool,
        initiator_id: i64,
        limit: i64,
    ) -> PersistenceResult<Vec<ModificationRow>> {
        let rows = sqlx::query_as::<_, ModificationRow>(
            "SELECT * FROM user_modifications WHERE initiator_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(initiator_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// All modifications with a given status, newest first
    pub async fn list_by_status(
        pool: &SqlitePool,
        status: AuthorizationStatus,
    ) -> PersistenceResult<Vec<ModificationRow>> {
        let rows = sqlx::query_as::<_, ModificationRow>(
            "SELECT * FROM user_modifications WHERE authorization_status = ? ORDER BY id DESC",
        )
        .bind(status.as_i64())
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Replace the staged permission set of a modification
    pub async fn replace_permissions(
        pool: &SqlitePool,
        modification_id: i64,
        permissions: &[Permission],
    ) -> PersistenceResult<()> {
        sqlx::query("DELETE FROM modification_permissions WHERE modification_id = ?")
            .bind(modification_id)
            .execute(pool)
            .await?;
        for permission in permissions {
            sqlx::query(
                "INSERT INTO modification_permissions (modification_id, permission_id) VALUES (?, ?)",
            )
            .bind(modification_id)
            .bind(permission.as_i64())
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    /// Staged permission set of a modification
    pub async fn permissions_of(
        pool: &SqlitePool,
        modification_id: i64,
    ) -> PersistenceResult<Vec<Permission>> {
        let codes: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT permission_id FROM modification_permissions
            WHERE modification_id = ? ORDER BY permission_id
            "#,
        )
        .bind(modification_id)
        .fetch_all(pool)
        .await?;

        codes
            .into_iter()
            .map(|(code,)| {
                Permission::from_i64(code)
                    .ok_or_else(|| PersistenceError::invalid_enum("permission_id", code))
            })
            .collect()
    }
}

// ============================================================================
// Activity Repository
// ============================================================================

/// An activity event about to be recorded.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub actor_id: i64,
    pub entity_kind: EntityKind,
    pub entity_primary_value: i64,
    pub activity_kind: ActivityKind,
    pub reference_field: String,
    pub reference_value: String,
}

/// Caller-supplied filter for the activity trail. Unset fields do not
/// constrain the query.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub actor_id: Option<i64>,
    pub entity_kind: Option<EntityKind>,
    pub activity_kind: Option<ActivityKind>,
    /// "contains" match on reference_value
    pub reference_contains: Option<String>,
    pub entity_primary_value: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl ActivityFilter {
    pub fn with_limit(limit: i64) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }
}

/// Repository for the activities table
pub struct ActivityRepo;

impl ActivityRepo {
    /// Record one activity event
    pub async fn insert(pool: &SqlitePool, activity: &NewActivity) -> PersistenceResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO activities
                (actor_id, entity_kind, entity_primary_value, activity_kind,
                 reference_field, reference_value, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(activity.actor_id)
        .bind(activity.entity_kind.as_i64())
        .bind(activity.entity_primary_value)
        .bind(activity.activity_kind.as_i64())
        .bind(&activity.reference_field)
        .bind(&activity.reference_value)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Most recent activities across all actors
    pub async fn most_recent(pool: &SqlitePool, limit: i64) -> PersistenceResult<Vec<ActivityRow>> {
        let rows =
            sqlx::query_as::<_, ActivityRow>("SELECT * FROM activities ORDER BY id DESC LIMIT ?")
                .bind(limit)
                .fetch_all(pool)
                .await?;
        Ok(rows)
    }

    /// Most recent activities of one actor
    pub async fn most_recent_by_actor(
        pool: &SqlitePool,
        actor_id: i64,
        limit: i64,
    ) -> PersistenceResult<Vec<ActivityRow>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT * FROM activities WHERE actor_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(actor_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Most recent activities touching one entity
    pub async fn most_recent_for_entity(
        pool: &SqlitePool,
        entity_kind: EntityKind,
        entity_primary_value: i64,
        limit: i64,
    ) -> PersistenceResult<Vec<ActivityRow>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT * FROM activities
            WHERE entity_kind = ? AND entity_primary_value = ?
            ORDER BY id DESC LIMIT ?
            "#,
        )
        .bind(entity_kind.as_i64())
        .bind(entity_primary_value)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Filtered, paginated activity listing
    pub async fn filter(
        pool: &SqlitePool,
        filter: &ActivityFilter,
    ) -> PersistenceResult<Vec<ActivityRow>> {
        let mut qb = QueryBuilder::new("SELECT * FROM activities WHERE 1 = 1");

        if let Some(actor_id) = filter.actor_id {
            qb.push(" AND actor_id = ").push_bind(actor_id);
        }
        if let Some(kind) = filter.entity_kind {
            qb.push(" AND entity_kind = ").push_bind(kind.as_i64());
        }
        if let Some(kind) = filter.activity_kind {
            qb.push(" AND activity_kind = ").push_bind(kind.as_i64());
        }
        if let Some(needle) = &filter.reference_contains {
            qb.push(" AND reference_value LIKE ")
                .push_bind(format!("%{}%", needle));
        }
        if let Some(value) = filter.entity_primary_value {
            qb.push(" AND entity_primary_value = ").push_bind(value);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at < ").push_bind(to);
        }

        qb.push(" ORDER BY id DESC LIMIT ").push_bind(filter.limit);
        qb.push(" OFFSET ").push_bind(filter.offset);

        let rows = qb.build_query_as::<ActivityRow>().fetch_all(pool).await?;
        Ok(rows)
    }
}

// ============================================================================
// Database initialization
// ============================================================================

/// Create a connection pool with a bounded acquire timeout
pub async fn create_pool(database_url: &str) -> PersistenceResult<SqlitePool> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Create (if missing) and migrate a database
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
