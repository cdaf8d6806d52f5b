use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::AuthUser;
use crate::api::middleware::json::ApiJson;
use crate::domain::registration::{RegistrationRequest, RegistrationView};
use crate::error::AppResult;
use crate::services::registration::{RegistrationService, StagedRegistration};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// Stage a registration and send the verification e-mail
///
/// POST /api/registrations
pub async fn stage(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegistrationRequest>,
) -> AppResult<(StatusCode, Json<StagedRegistration>)> {
    let staged = RegistrationService::new(state).stage(req).await?;
    Ok((StatusCode::CREATED, Json(staged)))
}

/// POST /api/registrations/:id/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<VerifyEmailRequest>,
) -> AppResult<Json<RegistrationView>> {
    let view = RegistrationService::new(state).verify_email(id, &req.token).await?;
    Ok(Json(view))
}

/// GET /api/registrations/:id
pub async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RegistrationView>> {
    let view = RegistrationService::new(state).get(id).await?;
    Ok(Json(view))
}

/// Approve and create the platform records (staff)
///
/// POST /api/registrations/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RegistrationView>> {
    user.require_staff()?;
    let view = RegistrationService::new(state).approve(id, user.id).await?;
    Ok(Json(view))
}

/// POST /api/registrations/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<RejectRequest>,
) -> AppResult<Json<RegistrationView>> {
    user.require_staff()?;
    let view = RegistrationService::new(state)
        .reject(id, user.id, &req.reason)
        .await?;
    Ok(Json(view))
}

/// POST /api/registrations/:id/retry
pub async fn retry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RegistrationView>> {
    user.require_staff()?;
    let view = RegistrationService::new(state).retry(id, user.id).await?;
    Ok(Json(view))
}
