//! # Custos Core
//!
//! Core domain types for the maker-checker record-management backend.
//! No I/O here - persistence and workflow live in their own crates.

pub mod activity;
pub mod error;
pub mod modification;
pub mod timebucket;
pub mod user;

pub use activity::{Activity, ActivityKind, EntityKind};
pub use error::{CoreError, CoreResult};
pub use modification::{AuthorizationStatus, Modification, ProposedFields, UserSnapshot};
pub use timebucket::{day_window, month_before_today, today_window, week_dates, weekday_monday0, TimeWindow};
pub use user::{AccessLevel, Permission, User};
