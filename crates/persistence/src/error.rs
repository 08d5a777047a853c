//! # Persistence Errors
//!
//! Error types for the persistence layer, wrapping sqlx errors and
//! splitting out the transport-level conditions (timeout, unavailable)
//! callers may retry.

use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// The one-unresolved-modification-per-user guard fired.
    #[error("User {user_id} already has a pending modification")]
    DuplicateProposal { user_id: i64 },

    #[error("Modification {id} already resolved to {status}")]
    AlreadyResolved { id: i64, status: String },

    // === Transport errors ===
    #[error("Store operation timed out")]
    Timeout,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    // === Conversion errors ===
    #[error("Invalid enum value: {field} = {value}")]
    InvalidEnumValue { field: String, value: i64 },
}

/// Result type alias for PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_enum(field: &str, value: i64) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Transport-level conditions a read path may retry once. Policy errors
    /// and write-path failures are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::Timeout,
            sqlx::Error::PoolClosed => Self::Unavailable("connection pool closed".to_string()),
            sqlx::Error::Io(e) => Self::Unavailable(e.to_string()),
            other => Self::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_maps_to_retryable() {
        let err = PersistenceError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, PersistenceError::Timeout));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_policy_errors_are_not_retryable() {
        assert!(!PersistenceError::DuplicateProposal { user_id: 1 }.is_retryable());
        assert!(!PersistenceError::not_found("User", 7).is_retryable());
    }

    #[test]
    fn test_not_found_display() {
        let err = PersistenceError::not_found("UserModification", 42);
        assert_eq!(
            err.to_string(),
            "Record not found: UserModification with id 42"
        );
    }
}
