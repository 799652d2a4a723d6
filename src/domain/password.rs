//! Password hashing (argon2id).

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;

use crate::domain::error::PapertradeError;

fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// Hash a password into a PHC string for storage.
pub fn hash(password: &str) -> Result<String, PapertradeError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PapertradeError::storage(format!("password hash failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string. A malformed stored
/// hash verifies as false rather than erroring, so a corrupt row cannot
/// be distinguished from a wrong password by a caller.
pub fn verify(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => hasher()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
