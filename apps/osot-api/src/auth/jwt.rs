//! Bearer token creation and verification
//!
//! Tokens carry the account id, email and privilege; default expiry is 8 hours

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::Privilege;
use crate::error::{AppError, ErrorCode};

/// JWT claims structure
///
/// # Fields
/// * `sub` - Account id
/// * `email` - Account email at sign-in time
/// * `privilege` - Access level used for authorization
/// * `iat` / `exp` - Issue and expiry times (seconds since epoch)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub privilege: Privilege,
    pub iat: usize,
    pub exp: usize,
}

/// Creates a signed token for an account
///
/// # Arguments
/// * `account_id` - Subject of the token
/// * `email` - Email claim
/// * `privilege` - Privilege claim
/// * `secret` - HS256 signing secret
/// * `expiry_hours` - Lifetime of the token
///
/// # Example
/// ```
/// use osot_api::auth::jwt::{create_token, verify_token};
/// use osot_api::domain::account::Privilege;
/// use uuid::Uuid;
///
/// let id = Uuid::new_v4();
/// let token = create_token(id, "a@b.ca", Privilege::Owner, "secret", 8).unwrap();
/// assert_eq!(verify_token(&token, "secret").unwrap().sub, id);
/// ```
pub fn create_token(
    account_id: Uuid,
    email: &str,
    privilege: Privilege,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id,
        email: email.to_string(),
        privilege,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(expiry_hours)).timestamp() as usize,
    };
    sign(&claims, secret)
}

fn sign(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::internal(format!("token signing failed: {}", e)))
}

/// Verifies and decodes a token
///
/// # Returns
/// * `Ok(Claims)` - The decoded claims if the token is valid
/// * `Err` with `SessionExpired` - If the token has expired
/// * `Err` with `InvalidToken` - For any other defect
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::new(ErrorCode::SessionExpired),
        _ => AppError::with_detail(ErrorCode::InvalidToken, e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";

    #[test]
    fn create_and_verify_token() {
        let id = Uuid::new_v4();
        let token = create_token(id, "ada@example.com", Privilege::Admin, TEST_SECRET, 8)
            .expect("valid token");

        let claims = verify_token(&token, TEST_SECRET).expect("valid verification");
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.privilege, Privilege::Admin);
    }

    #[test]
    fn wrong_secret_is_invalid_token() {
        let token = create_token(Uuid::new_v4(), "a@b.ca", Privilege::Owner, TEST_SECRET, 8)
            .expect("valid token");

        let err = verify_token(&token, "wrong-secret").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn garbage_is_invalid_token() {
        let err = verify_token("invalid.token.string", TEST_SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn expired_token_is_session_expired() {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@b.ca".to_string(),
            privilege: Privilege::Owner,
            iat: (now - Duration::hours(10)).timestamp() as usize,
            exp: (now - Duration::hours(2)).timestamp() as usize,
        };
        let token = sign(&claims, TEST_SECRET).unwrap();

        let err = verify_token(&token, TEST_SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionExpired);
        assert!(err.code.force_logout());
    }

    #[test]
    fn token_expiry_set() {
        let token = create_token(Uuid::new_v4(), "a@b.ca", Privilege::Owner, TEST_SECRET, 8)
            .expect("valid token");

        let claims = verify_token(&token, TEST_SECRET).expect("valid verification");
        let in_8_hours = (Utc::now() + Duration::hours(8)).timestamp() as usize;
        assert!(claims.exp > claims.iat);
        assert!(claims.exp <= in_8_hours + 10);
    }
}
