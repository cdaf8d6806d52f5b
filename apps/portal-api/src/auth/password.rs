use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};

use crate::domain::account::Password;

/// Hashes a password that already passed the strength rules
///
/// # Example
/// ```
/// use portal_api::auth::password::{hash_password, verify_password};
/// use portal_api::domain::account::Password;
///
/// let password = Password::new("Str0ng!Passw0rd").unwrap();
/// let hash = hash_password(&password).expect("valid hash");
/// assert!(verify_password("Str0ng!Passw0rd", &hash).unwrap());
/// ```
pub fn hash_password(password: &Password) -> Result<String, BcryptError> {
    hash(password.as_str(), DEFAULT_COST)
}

/// Checks a login attempt against a stored hash
///
/// The attempt is not strength-checked; legacy passwords must still verify.
/// A malformed stored hash is an error rather than a mismatch.
pub fn verify_password(attempt: &str, stored_hash: &str) -> Result<bool, BcryptError> {
    verify(attempt, stored_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password() -> Password {
        Password::new("Corr3ct-Horse").unwrap()
    }

    #[test]
    fn only_the_original_password_verifies() {
        let stored = hash_password(&password()).unwrap();

        assert!(verify_password("Corr3ct-Horse", &stored).unwrap());
        assert!(!verify_password("corr3ct-horse", &stored).unwrap());
        assert!(!verify_password("", &stored).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password(&password()).unwrap();
        let second = hash_password(&password()).unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$2"));
    }

    #[test]
    fn corrupt_stored_hash_is_an_error() {
        assert!(verify_password("Corr3ct-Horse", "plaintext").is_err());
    }
}
