use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::AuthUser;
use crate::api::middleware::json::ApiJson;
use crate::domain::account::{Account, AccountGroup, AccountPatch, AccountStatus};
use crate::domain::record::{FieldFilter, RecordQuery, Validate};
use crate::domain::repository::RecordRepository;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AccountListParams {
    pub status: Option<AccountStatus>,
    pub group: Option<AccountGroup>,
    pub top: Option<u32>,
}

/// List accounts (staff)
///
/// GET /api/accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<AccountListParams>,
) -> AppResult<Json<Vec<Account>>> {
    user.require_staff()?;

    let mut query = RecordQuery::new()
        .order_by("last_name", false)
        .top(params.top.unwrap_or(100).min(500));
    if let Some(status) = params.status {
        query = query.filter(FieldFilter::eq("status", status));
    }
    if let Some(group) = params.group {
        query = query.filter(FieldFilter::eq("group", group));
    }

    let accounts = state.repo::<Account>().find(&query).await?;
    Ok(Json(accounts))
}

/// Get an account (self or staff)
///
/// GET /api/accounts/:id
pub async fn get_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Account>> {
    user.require_access(id)?;

    let account = state
        .repo::<Account>()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound))?;

    Ok(Json(account))
}

/// Update an account (self or staff; status and privilege are staff only)
///
/// PATCH /api/accounts/:id
pub async fn update_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(mut patch): ApiJson<AccountPatch>,
) -> AppResult<Json<Account>> {
    user.require_access(id)?;
    if patch.touches_staff_fields() {
        user.require_staff()?;
    }
    patch.validate()?;

    let repo = state.repo::<Account>();
    let current = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound))?;

    if let Some(email) = &patch.email {
        if *email != current.email {
            let taken = repo
                .find_one(&RecordQuery::new().filter(FieldFilter::eq("email", email)))
                .await?;
            if taken.is_some_and(|other| other.id != id) {
                return Err(AppError::new(ErrorCode::EmailAlreadyRegistered));
            }
        }
    }

    let account = repo.update(id, &patch).await?;
    tracing::info!(account_id = %id, by = %user.id, "Account updated");
    Ok(Json(account))
}

/// Delete an account (staff)
///
/// DELETE /api/accounts/:id
pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_staff()?;

    state.repo::<Account>().delete(id).await.map_err(|e| {
        if e.code == ErrorCode::ResourceNotFound {
            AppError::new(ErrorCode::AccountNotFound)
        } else {
            e
        }
    })?;

    Ok(StatusCode::NO_CONTENT)
}
