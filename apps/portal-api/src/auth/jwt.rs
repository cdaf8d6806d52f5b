//! JWT token creation and verification
//!
//! Tokens carry the account id and portal role

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::Error as JwtError, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountRole;

/// JWT claims structure
///
/// # Fields
/// * `sub` - Subject (account_id)
/// * `role` - Portal role at sign-in time
/// * `iat` / `exp` - Issue and expiry time (seconds since epoch)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub role: AccountRole,
    pub iat: usize,
    pub exp: usize,
}

/// Creates a JWT token for an account
///
/// # Token Properties
/// - Expires after `expiry_hours`
/// - Signed with HS256 algorithm
/// - Contains account_id in 'sub' and the role in 'role'
///
/// # Example
/// ```
/// use portal_api::auth::jwt::{create_token, verify_token};
/// use portal_api::domain::account::AccountRole;
/// use uuid::Uuid;
///
/// let account_id = Uuid::new_v4();
/// let token = create_token(account_id, AccountRole::Member, "your-secret-key", 8).unwrap();
///
/// let claims = verify_token(&token, "your-secret-key").expect("valid token");
/// assert_eq!(claims.sub, account_id);
/// assert_eq!(claims.role, AccountRole::Member);
/// ```
pub fn create_token(
    account_id: Uuid,
    role: AccountRole,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id,
        role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(expiry_hours)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

/// Verifies and decodes a JWT token
///
/// Fails for a bad signature, a malformed token or an expired token.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";

    #[test]
    fn create_and_verify_token() {
        let account_id = Uuid::new_v4();
        let token = create_token(account_id, AccountRole::Admin, TEST_SECRET, 8).expect("valid token");

        let claims = verify_token(&token, TEST_SECRET).expect("valid verification");
        assert_eq!(claims.sub, account_id);
        assert_eq!(claims.role, AccountRole::Admin);
    }

    #[test]
    fn wrong_secret_fails() {
        let token = create_token(Uuid::new_v4(), AccountRole::Member, TEST_SECRET, 8).expect("valid token");

        let result = verify_token(&token, "wrong-secret");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_token_fails() {
        let result = verify_token("invalid.token.string", TEST_SECRET);
        assert!(result.is_err());
    }

    #[test]
    fn expired_token_fails() {
        let token = create_token(Uuid::new_v4(), AccountRole::Member, TEST_SECRET, -2).expect("valid token");

        let err = verify_token(&token, TEST_SECRET).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::ExpiredSignature);
    }

    #[test]
    fn token_expiry_set() {
        let token = create_token(Uuid::new_v4(), AccountRole::Member, TEST_SECRET, 8).expect("valid token");

        let claims = verify_token(&token, TEST_SECRET).expect("valid verification");
        let expiry_time = claims.exp as i64;
        let now = Utc::now().timestamp();
        let in_8_hours = (Utc::now() + Duration::hours(8)).timestamp();

        // Token should expire within 8 hours (with some buffer for test execution time)
        assert!(expiry_time > now);
        assert!(expiry_time <= in_8_hours + 10);
        assert!(claims.iat as i64 <= now);
    }
}
