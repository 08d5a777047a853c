//! Credential hashing
//!
//! Argon2id hashing and verification for the password field. Verification
//! goes through the verified-hash primitive, never raw string comparison.

use crate::error::{WorkflowError, WorkflowResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash a raw secret into a PHC-format string.
pub fn hash_password(password: &str) -> WorkflowResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| WorkflowError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a raw secret against a stored PHC-format hash.
///
/// Returns `false` on mismatch; a malformed stored hash is an error since
/// it means the record was corrupted, not that the caller guessed wrong.
pub fn verify_password(password: &str, stored_hash: &str) -> WorkflowResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| WorkflowError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
