//! Typed cache keys
//!
//! A key is a plain value built from the query's inputs, so two calls with
//! the same metric, scope, window and limit always hit the same slot. Keys
//! are hashed structurally and only rendered to text for display and logs.

use custos_core::{AuthorizationStatus, TimeWindow};
use std::fmt;

/// What is being counted or listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Modifications with a given status initiated by the scoped user
    ModificationCount(AuthorizationStatus),
    /// All modifications initiated by the scoped user, any status
    TotalModifications,
    /// Most recently created users
    MostRecentUsers,
    /// Users ranked by initiated modifications with a given status
    TopInitiators(AuthorizationStatus),
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::ModificationCount(AuthorizationStatus::Pending) => "pending-entries",
            Metric::ModificationCount(AuthorizationStatus::Approved) => "approved-entries",
            Metric::ModificationCount(AuthorizationStatus::Rejected) => "rejected-entries",
            Metric::TotalModifications => "total-entries",
            Metric::MostRecentUsers => "most-recent-users",
            Metric::TopInitiators(_) => "top-initiators",
        }
    }
}

/// Identity of one cached aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub metric: Metric,
    /// Scoping user id, absent for system-wide metrics
    pub scope: Option<i64>,
    /// Window the aggregate covers, absent for "latest" style listings
    pub window: Option<TimeWindow>,
    pub limit: Option<i64>,
}

impl CacheKey {
    pub fn count(status: AuthorizationStatus, actor_id: i64, window: TimeWindow) -> Self {
        Self {
            metric: Metric::ModificationCount(status),
            scope: Some(actor_id),
            window: Some(window),
            limit: None,
        }
    }

    pub fn total(actor_id: i64, window: TimeWindow) -> Self {
        Self {
            metric: Metric::TotalModifications,
            scope: Some(actor_id),
            window: Some(window),
            limit: None,
        }
    }

    pub fn most_recent_users(limit: i64) -> Self {
        Self {
            metric: Metric::MostRecentUsers,
            scope: None,
            window: None,
            limit: Some(limit),
        }
    }

    pub fn top_initiators(status: AuthorizationStatus, window: TimeWindow, limit: i64) -> Self {
        Self {
            metric: Metric::TopInitiators(status),
            scope: None,
            window: Some(window),
            limit: Some(limit),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.metric.as_str())?;
        if let Some(scope) = self.scope {
            write!(f, "-user-{scope}")?;
        }
        if let Some(window) = self.window {
            write!(f, "-{window}")?;
        }
        if let Some(limit) = self.limit {
            write!(f, "-limit-{limit}")?;
        }
        Ok(())
    }
}
