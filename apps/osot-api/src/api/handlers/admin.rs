use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::auth::AuthUser;
use crate::domain::registration::{RegistrationStatus, RegistrationView};
use crate::error::{AppError, AppResult};
use crate::infrastructure::dataverse::repository::RECORDS_PREFIX;
use crate::infrastructure::dataverse::tables::entity_set_for;
use crate::services::registration::RegistrationService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheCleared {
    pub cleared: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationListParams {
    pub status: Option<RegistrationStatus>,
}

/// Drop every cached record
///
/// DELETE /api/admin/cache
pub async fn clear_cache(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<CacheCleared>> {
    user.require_staff()?;

    let cleared = state.cache.delete_prefix(RECORDS_PREFIX).await?;
    tracing::info!(cleared, by = %user.id, "Record cache cleared");
    Ok(Json(CacheCleared { cleared }))
}

/// Drop cached records of one resource
///
/// DELETE /api/admin/cache/:resource
pub async fn clear_resource_cache(
    State(state): State<AppState>,
    user: AuthUser,
    Path(resource): Path<String>,
) -> AppResult<Json<CacheCleared>> {
    user.require_staff()?;

    let entity_set =
        entity_set_for(&resource).ok_or_else(|| AppError::not_found("resource", &resource))?;
    let prefix = format!("{}{}:", RECORDS_PREFIX, entity_set);
    let cleared = state.cache.delete_prefix(&prefix).await?;

    tracing::info!(resource = %resource, cleared, by = %user.id, "Resource cache cleared");
    Ok(Json(CacheCleared { cleared }))
}

/// Registration sessions awaiting or past review
///
/// GET /api/admin/registrations?status=
pub async fn list_registrations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RegistrationListParams>,
) -> AppResult<Json<Vec<RegistrationView>>> {
    user.require_staff()?;
    let sessions = RegistrationService::new(state).list(params.status).await?;
    Ok(Json(sessions))
}
