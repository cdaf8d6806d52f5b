use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::auth::jwt::create_token;
use crate::auth::password::{hash_password, verify_password};
use crate::domain::account::{Account, AccountRole, Email, Password};
use crate::domain::repositories::{AccountRepository, RepositoryError};
use crate::state::AppState;

/// Request body for account registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Response from successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account_id: Uuid,
    pub role: AccountRole,
    pub message: String,
}

/// Request body for account login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response from successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub account_id: Uuid,
    pub role: AccountRole,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

/// Register a new account
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let email = Email::new(&req.email)?;
    let password = Password::new(req.password)?;

    let role = if state.config.is_admin_email(email.as_str()) {
        AccountRole::Admin
    } else {
        AccountRole::Member
    };

    let password_hash = hash_password(&password)
        .map_err(|e| ApiError::internal_server_error(format!("Failed to hash password: {}", e)))?;
    let account = Account::new(email, password_hash, &req.full_name, role)?;

    state.accounts().create(&account).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => ApiError::conflict("Email already registered"),
        other => other.into(),
    })?;

    tracing::info!(
        account_id = %account.id,
        email = %account.email.masked(),
        role = %account.role,
        "Account registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account_id: account.id,
            role: account.role,
            message: "Account registered successfully".to_string(),
        }),
    ))
}

/// Login with email and password
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = Email::new(&req.email)?;

    let accounts = state.accounts();
    let account = accounts
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !account.is_active {
        tracing::warn!(account_id = %account.id, "Login attempt on disabled account");
        return Err(ApiError::unauthorized("Account is disabled"));
    }

    let valid = verify_password(&req.password, &account.password_hash).map_err(|e| {
        ApiError::internal_server_error(format!("Password verification failed: {}", e))
    })?;
    if !valid {
        tracing::info!(email = %email.masked(), "Invalid login credentials");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    if let Err(e) = accounts.update_last_login(account.id).await {
        tracing::warn!(account_id = %account.id, error = %e, "Failed to record last login");
    }

    let config = &state.config;
    let token = create_token(account.id, account.role, &config.jwt_secret, config.jwt_expiry_hours)
        .map_err(|e| ApiError::internal_server_error(format!("Failed to create token: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        account_id: account.id,
        role: account.role,
        expires_in: config.jwt_expiry_hours * 3600,
    }))
}

/// Health check endpoint
///
/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
