use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::middleware::auth::AuthUser;
use crate::api::middleware::json::ApiJson;
use crate::auth::jwt::create_token;
use crate::auth::password::verify_password;
use crate::domain::account::{Account, AccountStatus};
use crate::domain::record::{FieldFilter, RecordQuery};
use crate::domain::repository::RecordRepository;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::state::AppState;
use crate::validation::mask_email;

const LOGIN_ATTEMPTS_PREFIX: &str = "login:attempts:";

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response from successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub account: Account,
}

/// Login with email and password
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = req.email.trim().to_lowercase();
    let attempts_key = format!("{}{}", LOGIN_ATTEMPTS_PREFIX, email);

    let failed = state.cache.get_json::<u32>(&attempts_key).await?.unwrap_or(0);
    if failed >= state.config.login_max_attempts {
        tracing::warn!(email = %mask_email(&email), "Login refused, too many failed attempts");
        return Err(AppError::with_detail(
            ErrorCode::AccountLocked,
            "Too many failed sign-in attempts",
        ));
    }

    // Find account by email
    let account = state
        .repo::<Account>()
        .find_one(&RecordQuery::new().filter(FieldFilter::eq("email", &email)))
        .await?;
    let Some(account) = account else {
        record_failure(&state, &attempts_key, failed).await?;
        return Err(AppError::new(ErrorCode::InvalidCredentials));
    };

    match account.status {
        AccountStatus::Active => {}
        AccountStatus::Inactive => return Err(AppError::new(ErrorCode::AccountInactive)),
        AccountStatus::Pending => return Err(AppError::new(ErrorCode::AccountPendingApproval)),
        AccountStatus::Locked => return Err(AppError::new(ErrorCode::AccountLocked)),
    }

    let valid = match account.password_hash.as_deref() {
        Some(hash) => verify_password(&req.password, hash)?,
        None => false,
    };
    if !valid {
        record_failure(&state, &attempts_key, failed).await?;
        return Err(AppError::new(ErrorCode::InvalidCredentials));
    }

    state.cache.delete(&attempts_key).await?;

    let token = create_token(
        account.id,
        &account.email,
        account.privilege,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    tracing::info!(account_id = %account.id, "Signed in");

    Ok(Json(LoginResponse {
        token,
        expires_in: state.config.jwt_expiry_hours * 3600,
        account,
    }))
}

async fn record_failure(state: &AppState, key: &str, failed: u32) -> AppResult<()> {
    state
        .cache
        .set_json(key, &(failed + 1), Some(state.config.login_lockout))
        .await?;
    Ok(())
}

/// Current account
///
/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Account>> {
    let account = state
        .repo::<Account>()
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound))?;

    Ok(Json(account))
}

/// Health check endpoint
///
/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
