//! # User Module
//!
//! Defines the live user record together with access levels and the
//! permission set used by the access-control collaborator.
//!
//! A user is the target of the maker-checker workflow: every change to a
//! user record is staged as a [`crate::Modification`] first and only
//! applied once a second actor approves it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Full control, including user administration
    SuperUser,
    /// Branch administration
    Admin,
    /// Day-to-day record entry
    Staff,
    /// Technical maintenance
    Tech,
}

impl AccessLevel {
    /// Stable numeric code used in the database.
    pub fn as_i64(&self) -> i64 {
        match self {
            AccessLevel::SuperUser => 1,
            AccessLevel::Admin => 2,
            AccessLevel::Staff => 3,
            AccessLevel::Tech => 4,
        }
    }

    /// Parse from the numeric database code.
    pub fn from_i64(code: i64) -> Option<Self> {
        match code {
            1 => Some(AccessLevel::SuperUser),
            2 => Some(AccessLevel::Admin),
            3 => Some(AccessLevel::Staff),
            4 => Some(AccessLevel::Tech),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::SuperUser => "super_user",
            AccessLevel::Admin => "admin",
            AccessLevel::Staff => "staff",
            AccessLevel::Tech => "tech",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "super_user" => Some(AccessLevel::SuperUser),
            "admin" => Some(AccessLevel::Admin),
            "staff" => Some(AccessLevel::Staff),
            "tech" => Some(AccessLevel::Tech),
            _ => None,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Permissions checked by the access-control collaborator before a
/// workflow call is allowed through. The engine itself never checks these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CreateUser,
    UpdateUser,
    ViewUsers,
    AuthorizeModification,
    AuditTrail,
    PullReports,
}

impl Permission {
    /// Stable numeric code used in the database.
    pub fn as_i64(&self) -> i64 {
        match self {
            Permission::CreateUser => 1,
            Permission::UpdateUser => 2,
            Permission::ViewUsers => 3,
            Permission::AuthorizeModification => 4,
            Permission::AuditTrail => 5,
            Permission::PullReports => 6,
        }
    }

    pub fn from_i64(code: i64) -> Option<Self> {
        match code {
            1 => Some(Permission::CreateUser),
            2 => Some(Permission::UpdateUser),
            3 => Some(Permission::ViewUsers),
            4 => Some(Permission::AuthorizeModification),
            5 => Some(Permission::AuditTrail),
            6 => Some(Permission::PullReports),
            _ => None,
        }
    }
}

/// A live user record.
///
/// `modification_id` points back at the modification that produced the
/// current state, so every approved change stays traceable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string, never the raw secret
    pub password_hash: String,
    pub access_level: AccessLevel,
    pub active: bool,
    /// Modification that produced the current state, if any
    pub modification_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{} - {})", self.username, self.id, self.access_level)
    }
}
