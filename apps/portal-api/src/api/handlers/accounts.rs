use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::middleware::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::domain::account::{validate_full_name, Account, AccountRole, Email, Password};
use crate::domain::repositories::{AccountRepository, ProfileUpdate, RepositoryError};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Account as returned by the API; never includes the password hash
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: AccountRole,
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.to_string(),
            full_name: account.full_name.clone(),
            role: account.role,
            organization_id: account.organization_id,
            is_active: account.is_active,
            created_at: account.created_at,
            last_login: account.last_login,
        }
    }
}

/// `?limit=&offset=` paging shared by list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Clamped `(limit, offset)`
    pub fn bounds(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Request body for account updates; `is_active` is admin only
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccountRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

async fn load_account(state: &AppState, id: Uuid) -> Result<Account, ApiError> {
    state
        .accounts()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Account not found: {}", id)))
}

/// Get the signed-in account
///
/// GET /api/accounts/me
pub async fn me(auth: AuthUser, State(state): State<AppState>) -> Result<Json<AccountResponse>, ApiError> {
    let account = load_account(&state, auth.account_id).await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// List all accounts (admin only)
///
/// GET /api/accounts
pub async fn list_accounts(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    auth.require_admin()?;

    let (limit, offset) = page.bounds();
    let accounts = state.accounts().list(limit, offset).await?;

    Ok(Json(accounts.iter().map(AccountResponse::from).collect()))
}

/// Get an account by ID
///
/// GET /api/accounts/:id
pub async fn get_account(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, ApiError> {
    auth.require_self_or_admin(id)?;

    let account = load_account(&state, id).await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// Update an account's profile, password or active flag
///
/// PATCH /api/accounts/:id
pub async fn update_account(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    auth.require_self_or_admin(id)?;
    if req.is_active.is_some() {
        auth.require_admin()?;
        if id == auth.account_id {
            return Err(ApiError::bad_request("Admins cannot change their own active flag"));
        }
    }

    let mut update = ProfileUpdate {
        email: req.email.as_deref().map(Email::new).transpose()?,
        full_name: req.full_name.as_deref().map(validate_full_name).transpose()?,
        password_hash: None,
        is_active: req.is_active,
    };
    if let Some(password) = req.password {
        let password = Password::new(password)?;
        let hash = hash_password(&password)
            .map_err(|e| ApiError::internal_server_error(format!("Failed to hash password: {}", e)))?;
        update.password_hash = Some(hash);
    }

    let account = if update.is_empty() {
        load_account(&state, id).await?
    } else {
        state.accounts().update_profile(id, &update).await.map_err(|e| match e {
            RepositoryError::NotFound => ApiError::not_found(format!("Account not found: {}", id)),
            RepositoryError::Conflict(_) => ApiError::conflict("Email already registered"),
            other => other.into(),
        })?
    };
    if let Some(is_active) = req.is_active {
        tracing::info!(account_id = %id, is_active, by = %auth.account_id, "Account active flag changed");
    }

    Ok(Json(AccountResponse::from(&account)))
}

/// Delete an account (admin only)
///
/// DELETE /api/accounts/:id
pub async fn delete_account(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    auth.require_admin()?;

    state.accounts().delete(id).await.map_err(|e| match e {
        RepositoryError::NotFound => ApiError::not_found(format!("Account not found: {}", id)),
        RepositoryError::Conflict(_) => {
            ApiError::conflict("Account owns an organization; transfer or delete it first")
        }
        other => other.into(),
    })?;

    tracing::info!(account_id = %id, by = %auth.account_id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(Pagination::default().bounds(), (50, 0));

        let page = Pagination {
            limit: Some(1000),
            offset: Some(-5),
        };
        assert_eq!(page.bounds(), (200, 0));

        let page = Pagination {
            limit: Some(0),
            offset: Some(40),
        };
        assert_eq!(page.bounds(), (1, 40));
    }

    #[test]
    fn response_hides_password_hash() {
        let account = Account::new(
            Email::new("ada@example.com").unwrap(),
            "$2b$12$secret".to_string(),
            "Ada Lovelace",
            AccountRole::Member,
        )
        .unwrap();

        let value = serde_json::to_value(AccountResponse::from(&account)).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "ada@example.com");
        assert_eq!(value["role"], "member");
    }
}
