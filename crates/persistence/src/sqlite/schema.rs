//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables. The schema itself lives
//! in migrations/20260830_init.sql.

use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use custos_core::{
    AccessLevel, Activity, ActivityKind, AuthorizationStatus, EntityKind, Modification, User,
};
use serde::{Deserialize, Serialize};

/// Row type for the `users` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub access_level: i64,
    pub active: bool,
    pub modification_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type for the `user_modifications` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ModificationRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub access_level: i64,
    pub active: bool,
    pub security_modification: bool,
    pub authorization_status: i64,
    pub initiator_id: i64,
    pub verifier_id: Option<i64>,
    pub verifier_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type for the `activities` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ActivityRow {
    pub id: i64,
    pub actor_id: i64,
    pub entity_kind: i64,
    pub entity_primary_value: i64,
    pub activity_kind: i64,
    pub reference_field: String,
    pub reference_value: String,
    pub created_at: DateTime<Utc>,
}

/// Per-initiator record count, as returned by the report queries.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct InitiatorCountRow {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub records: i64,
}

// === Conversion implementations ===

impl TryFrom<UserRow> for User {
    type Error = PersistenceError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let access_level = AccessLevel::from_i64(row.access_level)
            .ok_or_else(|| PersistenceError::invalid_enum("access_level", row.access_level))?;
        Ok(User {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            access_level,
            active: row.active,
            modification_id: row.modification_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<ModificationRow> for Modification {
    type Error = PersistenceError;

    fn try_from(row: ModificationRow) -> Result<Self, Self::Error> {
        let access_level = AccessLevel::from_i64(row.access_level)
            .ok_or_else(|| PersistenceError::invalid_enum("access_level", row.access_level))?;
        let authorization_status = AuthorizationStatus::from_i64(row.authorization_status)
            .ok_or_else(|| {
                PersistenceError::invalid_enum("authorization_status", row.authorization_status)
            })?;
        Ok(Modification {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            access_level,
            active: row.active,
            security_modification: row.security_modification,
            authorization_status,
            initiator_id: row.initiator_id,
            verifier_id: row.verifier_id,
            verifier_comment: row.verifier_comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<ActivityRow> for Activity {
    type Error = PersistenceError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let entity_kind = EntityKind::from_i64(row.entity_kind)
            .ok_or_else(|| PersistenceError::invalid_enum("entity_kind", row.entity_kind))?;
        let activity_kind = ActivityKind::from_i64(row.activity_kind)
            .ok_or_else(|| PersistenceError::invalid_enum("activity_kind", row.activity_kind))?;
        Ok(Activity {
            id: row.id,
            actor_id: row.actor_id,
            entity_kind,
            entity_primary_value: row.entity_primary_value,
            activity_kind,
            reference_field: row.reference_field,
            reference_value: row.reference_value,
            created_at: row.created_at,
        })
    }
}
