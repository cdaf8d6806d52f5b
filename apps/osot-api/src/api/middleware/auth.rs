use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::auth::jwt::verify_token;
use crate::domain::account::Privilege;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

/// Authenticated caller, extracted from `Authorization: Bearer <token>`
///
/// Usage:
/// ```rust,ignore
/// async fn protected_handler(user: AuthUser) -> Result<String, AppError> {
///     user.require_staff()?;
///     Ok(format!("Hello {}", user.id))
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub privilege: Privilege,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.privilege.is_staff()
    }

    /// Fails with 3003 unless the caller is staff
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::new(ErrorCode::InsufficientPrivilege))
        }
    }

    /// Whether the caller may act on records owned by `account_id`
    pub fn can_access(&self, account_id: Uuid) -> bool {
        self.is_staff() || self.id == account_id
    }

    /// Fails with 3004 unless the caller owns the record or is staff
    pub fn require_access(&self, account_id: Uuid) -> Result<(), AppError> {
        if self.can_access(account_id) {
            Ok(())
        } else {
            Err(AppError::new(ErrorCode::RecordAccessDenied))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::new(ErrorCode::MissingToken))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::with_detail(
                ErrorCode::InvalidToken,
                "Invalid authorization format. Use: Bearer <token>",
            )
        })?;

        let claims = verify_token(token.trim(), &state.config.jwt_secret)?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            privilege: claims.privilege,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(privilege: Privilege) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "a@b.ca".to_string(),
            privilege,
        }
    }

    #[test]
    fn members_access_only_their_records() {
        let member = user(Privilege::Owner);
        assert!(member.can_access(member.id));
        assert!(!member.can_access(Uuid::new_v4()));
        assert_eq!(
            member.require_access(Uuid::new_v4()).unwrap_err().code,
            ErrorCode::RecordAccessDenied
        );
        assert_eq!(
            member.require_staff().unwrap_err().code,
            ErrorCode::InsufficientPrivilege
        );
    }

    #[test]
    fn staff_access_everything() {
        let admin = user(Privilege::Admin);
        assert!(admin.can_access(Uuid::new_v4()));
        assert!(admin.require_staff().is_ok());
    }
}
