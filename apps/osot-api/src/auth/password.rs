use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

/// Hashes a password using bcrypt
///
/// # Example
/// ```
/// use osot_api::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("Str0ng!Pass").unwrap();
/// assert!(verify_password("Str0ng!Pass", &hash).unwrap());
/// ```
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST).map_err(|e| AppError::internal(format!("password hashing failed: {}", e)))
}

/// Verifies a password against a bcrypt hash
///
/// Returns `Ok(false)` on mismatch; malformed hashes are internal errors.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash).map_err(|e| AppError::internal(format!("password check failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_password() {
        let hash = hash_password("Str0ng!Pass").expect("valid hash");
        assert!(verify_password("Str0ng!Pass", &hash).expect("valid verification"));
        assert!(!verify_password("wrong", &hash).expect("valid verification"));
    }

    #[test]
    fn hash_different_outputs() {
        let hash1 = hash_password("Str0ng!Pass").expect("valid hash");
        let hash2 = hash_password("Str0ng!Pass").expect("valid hash");

        // Salted
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-bcrypt-hash").is_err());
    }
}
