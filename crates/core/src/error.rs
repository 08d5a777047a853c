//! # Error Module
//!
//! Core domain errors, independent of any infrastructure.

use thiserror::Error;

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid authorization status code: {0}")]
    InvalidStatusCode(i64),

    #[error("Invalid access level code: {0}")]
    InvalidAccessLevelCode(i64),

    #[error("Invalid permission code: {0}")]
    InvalidPermissionCode(i64),

    #[error("Invalid activity kind code: {0}")]
    InvalidActivityKindCode(i64),

    #[error("Invalid entity kind code: {0}")]
    InvalidEntityKindCode(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
