//! # Modification Module
//!
//! A modification is a staged, not-yet-applied snapshot of a user's target
//! state. It is always a complete replacement state, never a partial diff:
//! for updates the workflow snapshots the current user first and then
//! overlays only the fields the maker actually supplied.

use crate::user::{AccessLevel, Permission, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state authorization status of a modification.
///
/// PENDING is the only non-terminal state. Nothing ever leaves APPROVED or
/// REJECTED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Pending,
    Approved,
    Rejected,
}

impl AuthorizationStatus {
    /// Stable numeric code used in the database.
    pub fn as_i64(&self) -> i64 {
        match self {
            AuthorizationStatus::Pending => 0,
            AuthorizationStatus::Approved => 1,
            AuthorizationStatus::Rejected => 2,
        }
    }

    pub fn from_i64(code: i64) -> Option<Self> {
        match code {
            0 => Some(AuthorizationStatus::Pending),
            1 => Some(AuthorizationStatus::Approved),
            2 => Some(AuthorizationStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::Pending => "pending",
            AuthorizationStatus::Approved => "approved",
            AuthorizationStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuthorizationStatus::Pending)
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields a maker may supply when proposing a change.
///
/// Every member is optional so "supplied" and "not supplied" stay
/// distinguishable; an unsupplied field keeps the user's current value when
/// the snapshot is built. `password` carries the raw secret and is hashed
/// by the workflow before it ever reaches a modification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposedFields {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub access_level: Option<AccessLevel>,
    pub active: Option<bool>,
    /// Staged permission set; `None` leaves the staged set untouched,
    /// `Some(vec![])` clears it
    pub permissions: Option<Vec<Permission>>,
}

impl ProposedFields {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.password.is_none()
            && self.access_level.is_none()
            && self.active.is_none()
            && self.permissions.is_none()
    }
}

/// A staged change to a user record.
///
/// `user_id` is `None` for create proposals. The snapshot fields mirror the
/// mutable fields of [`User`] exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modification {
    pub id: i64,
    /// Target user; absent for create proposals
    pub user_id: Option<i64>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub access_level: AccessLevel,
    pub active: bool,
    /// True when this change rehashed the credential field
    pub security_modification: bool,
    pub authorization_status: AuthorizationStatus,
    pub initiator_id: i64,
    /// Set iff `authorization_status` is terminal
    pub verifier_id: Option<i64>,
    pub verifier_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Modification {
    pub fn is_create(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn is_pending(&self) -> bool {
        self.authorization_status == AuthorizationStatus::Pending
    }

    /// Build the snapshot a modification carries for an update proposal:
    /// start from the current user state, then overlay supplied fields.
    ///
    /// The credential field is handled by the caller since hashing is not a
    /// core concern; `password_hash` here always starts as the user's
    /// current hash.
    pub fn snapshot_with_overlay(user: &User, fields: &ProposedFields) -> UserSnapshot {
        UserSnapshot {
            username: fields.username.clone().unwrap_or_else(|| user.username.clone()),
            first_name: fields
                .first_name
                .clone()
                .unwrap_or_else(|| user.first_name.clone()),
            last_name: fields
                .last_name
                .clone()
                .unwrap_or_else(|| user.last_name.clone()),
            password_hash: user.password_hash.clone(),
            access_level: fields.access_level.unwrap_or(user.access_level),
            active: fields.active.unwrap_or(user.active),
        }
    }
}

/// The complete replacement state a modification proposes for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub access_level: AccessLevel,
    pub active: bool,
}
