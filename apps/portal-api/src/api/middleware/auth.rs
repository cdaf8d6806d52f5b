use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::errors::ErrorKind;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::auth::jwt::verify_token;
use crate::domain::account::AccountRole;
use crate::state::AppState;

/// JWT authentication extractor for protected routes
///
/// Usage:
/// ```ignore
/// async fn protected_handler(auth: AuthUser) -> Result<String, ApiError> {
///     Ok(format!("Hello account {}", auth.account_id))
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub role: AccountRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fails with 403 unless the caller is an admin
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin role required"))
        }
    }

    /// Fails with 403 unless the caller is `account_id` or an admin
    pub fn require_self_or_admin(&self, account_id: Uuid) -> Result<(), ApiError> {
        if self.account_id == account_id || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("You can only access your own account"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Extract the authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        // Extract bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization format. Use: Bearer <token>"))?;

        let claims = verify_token(token, &state.config.jwt_secret).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::unauthorized("Token expired"),
            _ => ApiError::unauthorized(format!("Invalid token: {}", e)),
        })?;

        Ok(AuthUser {
            account_id: claims.sub,
            role: claims.role,
        })
    }
}
