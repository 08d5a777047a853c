//! # Activity Module
//!
//! Activity events recorded on every workflow transition. Recording is
//! best-effort from the engine's perspective; these types only describe
//! what happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of entity an activity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    UserModification,
}

impl EntityKind {
    pub fn as_i64(&self) -> i64 {
        match self {
            EntityKind::User => 1,
            EntityKind::UserModification => 2,
        }
    }

    pub fn from_i64(code: i64) -> Option<Self> {
        match code {
            1 => Some(EntityKind::User),
            2 => Some(EntityKind::UserModification),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::UserModification => "user_modification",
        }
    }
}

/// Kind of action an activity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Create,
    View,
    Download,
    Update,
    Disable,
    Authorize,
    Unauthorize,
}

impl ActivityKind {
    pub fn as_i64(&self) -> i64 {
        match self {
            ActivityKind::Create => 1,
            ActivityKind::View => 2,
            ActivityKind::Download => 3,
            ActivityKind::Update => 4,
            ActivityKind::Disable => 5,
            ActivityKind::Authorize => 6,
            ActivityKind::Unauthorize => 7,
        }
    }

    pub fn from_i64(code: i64) -> Option<Self> {
        match code {
            1 => Some(ActivityKind::Create),
            2 => Some(ActivityKind::View),
            3 => Some(ActivityKind::Download),
            4 => Some(ActivityKind::Update),
            5 => Some(ActivityKind::Disable),
            6 => Some(ActivityKind::Authorize),
            7 => Some(ActivityKind::Unauthorize),
            _ => None,
        }
    }

    /// Past-tense verb for audit-trail rendering.
    pub fn past_tense(&self) -> &'static str {
        match self {
            ActivityKind::Create => "created",
            ActivityKind::View => "viewed",
            ActivityKind::Download => "downloaded",
            ActivityKind::Update => "updated",
            ActivityKind::Disable => "disabled",
            ActivityKind::Authorize => "authorized",
            ActivityKind::Unauthorize => "unauthorized",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.past_tense())
    }
}

/// One recorded activity event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub actor_id: i64,
    pub entity_kind: EntityKind,
    /// Primary key value of the entity acted on
    pub entity_primary_value: i64,
    pub activity_kind: ActivityKind,
    /// Name of the referenced field, e.g. "username"
    pub reference_field: String,
    pub reference_value: String,
    pub created_at: DateTime<Utc>,
}
