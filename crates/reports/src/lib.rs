//! # Custos Reports
//!
//! Time-bucketed aggregation over the modification store, fronted by an
//! in-process TTL cache.
//!
//! ## Layers
//!
//! - [`TtlCache`] - mutex-guarded map with per-entry expiry
//! - [`CacheKey`] - typed key built from metric, scope, window and limit
//! - [`ReportService`] - the cached read API dashboards call
//!
//! ## Example
//!
//! ```rust,ignore
//! use custos_reports::ReportService;
//! use custos_core::AuthorizationStatus;
//!
//! let reports = ReportService::new(pool);
//! let pending = reports.count_today(actor_id, AuthorizationStatus::Pending).await?;
//! let week = reports.weekly_summary(actor_id, AuthorizationStatus::Approved).await?;
//! ```

pub mod cache;
pub mod error;
pub mod key;
pub mod summary;

pub use cache::{TtlCache, TTL_HISTORICAL, TTL_RECENT_USERS, TTL_TODAY};
pub use error::{ReportError, ReportResult};
pub use key::{CacheKey, Metric};
pub use summary::{DailyTotal, InitiatorTotal, RecentUser, ReportService, WeeklySummary};
