//! Workflow layer errors
//!
//! Every variant here is a policy violation or a genuine not-found the
//! caller must act on; nothing is silently recovered. Cache and activity
//! failures never surface through this type.

use custos_persistence::PersistenceError;
use thiserror::Error;

/// Authorization workflow errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    // === Proposal errors ===
    #[error("Username {0} is already taken by another user")]
    DuplicateUsername(String),

    #[error("User {0} already has a pending modification")]
    PendingModificationExists(i64),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    // === Resolution errors ===
    #[error("Modification {id} already resolved to {status}")]
    AlreadyResolved { id: i64, status: String },

    #[error("Modification not found: {0}")]
    ModificationNotFound(i64),

    // === Lookup errors ===
    #[error("User not found: {0}")]
    UserNotFound(i64),

    // === Authentication errors ===
    #[error("The credentials given are not authentic")]
    InvalidCredentials,

    // === Access errors ===
    #[error("Actor {actor_id} does not hold any of the required permissions")]
    PermissionDenied { actor_id: i64 },

    // === Credential hashing ===
    #[error("Credential hashing failed: {0}")]
    Hashing(String),

    // === Wrapped errors ===
    #[error("Persistence error: {0}")]
    Persistence(PersistenceError),
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl From<PersistenceError> for WorkflowError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::DuplicateProposal { user_id } => {
                Self::PendingModificationExists(user_id)
            }
            PersistenceError::AlreadyResolved { id, status } => Self::AlreadyResolved { id, status },
            other => Self::Persistence(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_proposal_maps_to_pending_exists() {
        let err = WorkflowError::from(PersistenceError::DuplicateProposal { user_id: 7 });
        assert!(matches!(err, WorkflowError::PendingModificationExists(7)));
    }

    #[test]
    fn test_already_resolved_maps_through() {
        let err = WorkflowError::from(PersistenceError::AlreadyResolved {
            id: 3,
            status: "approved".to_string(),
        });
        assert!(matches!(
            err,
            WorkflowError::AlreadyResolved { id: 3, .. }
        ));
    }

    #[test]
    fn test_display() {
        let err = WorkflowError::DuplicateUsername("jdoe".to_string());
        assert_eq!(
            err.to_string(),
            "Username jdoe is already taken by another user"
        );
    }
}
