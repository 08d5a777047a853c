//! # Custos Workflow
//!
//! The authorization workflow engine: drives a staged modification through
//! its maker-checker state machine (propose → pending → approved|rejected)
//! and applies approved changes to the live user record.
//!
//! Permission checks live in [`access`] and run before the engine is
//! called; the engine itself never checks permissions. Activity recording
//! is best-effort and never rolls back a committed transition.

pub mod access;
pub mod activity;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod services;

pub use activity::ActivityRecorder;
pub use engine::WorkflowService;
pub use error::{WorkflowError, WorkflowResult};
pub use services::ServiceContext;
