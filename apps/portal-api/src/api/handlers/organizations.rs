use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accounts::{AccountResponse, Pagination};
use crate::api::errors::ApiError;
use crate::api::middleware::auth::AuthUser;
use crate::domain::organization::{Organization, OrganizationStatus};
use crate::domain::repositories::{AccountRepository, OrganizationRepository, RepositoryError};
use crate::state::AppState;

const SLUG_CONSTRAINT: &str = "organizations_slug_key";

/// Request body for creating an organization
#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub slug: String,
    pub website: Option<String>,
}

/// Request body for organization updates
///
/// An empty `website` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: OrganizationStatus,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub account_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub website: Option<String>,
    pub status: OrganizationStatus,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Organization> for OrganizationResponse {
    fn from(org: &Organization) -> Self {
        Self {
            id: org.id(),
            name: org.name().to_string(),
            slug: org.slug().to_string(),
            website: org.website().map(ToString::to_string),
            status: org.status(),
            owner_id: org.owner_id(),
            created_at: org.created_at(),
            updated_at: org.updated_at(),
        }
    }
}

async fn load_organization(state: &AppState, id: Uuid) -> Result<Organization, ApiError> {
    state
        .organizations()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Organization not found: {}", id)))
}

fn require_owner_or_admin(auth: &AuthUser, org: &Organization) -> Result<(), ApiError> {
    if auth.is_admin() || org.is_owned_by(auth.account_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only the organization owner or an admin can do this"))
    }
}

/// Maps a failed insert; only the slug constraint means the slug is taken
fn creation_error(err: RepositoryError, organization: &Organization, owner_id: Uuid) -> ApiError {
    match err {
        RepositoryError::Conflict(ref constraint) if constraint == SLUG_CONSTRAINT => {
            ApiError::conflict(format!("Slug already taken: {}", organization.slug()))
        }
        RepositoryError::Conflict(_) => ApiError::not_found(format!("Account not found: {}", owner_id)),
        other => other.into(),
    }
}

/// Create a new organization owned by the caller
///
/// POST /api/organizations
pub async fn create_organization(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<OrganizationResponse>), ApiError> {
    let website = req.website.as_deref().filter(|w| !w.trim().is_empty());
    let (organization, events) = Organization::new(&req.name, &req.slug, website, auth.account_id)?;

    let organizations = state.organizations();
    if organizations.find_by_slug(organization.slug().as_str()).await?.is_some() {
        return Err(ApiError::conflict(format!(
            "Slug already taken: {}",
            organization.slug()
        )));
    }

    organizations
        .save(&organization)
        .await
        .map_err(|e| creation_error(e, &organization, auth.account_id))?;
    events.iter().for_each(|event| event.record());

    // The creator joins their new organization unless they already belong to one
    let accounts = state.accounts();
    if let Some(creator) = accounts.find_by_id(auth.account_id).await? {
        if creator.organization_id.is_none() {
            accounts.set_organization(creator.id, Some(organization.id())).await?;
            organization.admit_member(creator.id)?.record();
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(OrganizationResponse::from(&organization)),
    ))
}

/// List organizations
///
/// GET /api/organizations
pub async fn list_organizations(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<OrganizationResponse>>, ApiError> {
    let (limit, offset) = page.bounds();
    let organizations = state.organizations().list(limit, offset).await?;

    Ok(Json(
        organizations.iter().map(OrganizationResponse::from).collect(),
    ))
}

/// Get an organization by ID
///
/// GET /api/organizations/:id
pub async fn get_organization(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let organization = load_organization(&state, id).await?;
    Ok(Json(OrganizationResponse::from(&organization)))
}

/// Rename an organization or change its website
///
/// PATCH /api/organizations/:id
pub async fn update_organization(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrganizationRequest>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let mut organization = load_organization(&state, id).await?;
    require_owner_or_admin(&auth, &organization)?;

    if let Some(name) = req.name.as_deref() {
        organization.rename(name)?;
    }
    if let Some(website) = req.website.as_deref() {
        let website = Some(website).filter(|w| !w.trim().is_empty());
        organization.set_website(website)?;
    }

    state.organizations().save(&organization).await?;
    tracing::info!(organization_id = %id, by = %auth.account_id, "Organization updated");

    Ok(Json(OrganizationResponse::from(&organization)))
}

/// Delete an organization; its members are detached
///
/// DELETE /api/organizations/:id
pub async fn delete_organization(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let organization = load_organization(&state, id).await?;
    require_owner_or_admin(&auth, &organization)?;

    state.organizations().delete(id).await?;
    tracing::info!(organization_id = %id, by = %auth.account_id, "Organization deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Suspend, reactivate or archive an organization
///
/// POST /api/organizations/:id/status
pub async fn change_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let mut organization = load_organization(&state, id).await?;
    require_owner_or_admin(&auth, &organization)?;

    let event = organization.change_status(req.status)?;
    state.organizations().save(&organization).await?;
    event.record();

    Ok(Json(OrganizationResponse::from(&organization)))
}

/// List the accounts belonging to an organization
///
/// GET /api/organizations/:id/members
pub async fn list_members(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let organization = load_organization(&state, id).await?;
    let members = state.accounts().list_by_organization(id).await?;

    let visible = auth.is_admin()
        || organization.is_owned_by(auth.account_id)
        || members.iter().any(|m| m.id == auth.account_id);
    if !visible {
        return Err(ApiError::forbidden("You are not a member of this organization"));
    }

    Ok(Json(members.iter().map(AccountResponse::from).collect()))
}

/// Add an account to an organization
///
/// POST /api/organizations/:id/members
pub async fn add_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let organization = load_organization(&state, id).await?;
    require_owner_or_admin(&auth, &organization)?;
    let event = organization.admit_member(req.account_id)?;

    let accounts = state.accounts();
    let mut account = accounts
        .find_by_id(req.account_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Account not found: {}", req.account_id)))?;

    match account.organization_id {
        Some(current) if current == id => {
            return Err(ApiError::conflict("Account is already a member"));
        }
        Some(_) => {
            return Err(ApiError::conflict("Account belongs to another organization"));
        }
        None => {}
    }

    accounts.set_organization(account.id, Some(id)).await?;
    account.organization_id = Some(id);
    event.record();

    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

/// Remove an account from an organization
///
/// DELETE /api/organizations/:id/members/:account_id
pub async fn remove_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, account_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let organization = load_organization(&state, id).await?;
    // Members may leave on their own
    if auth.account_id != account_id {
        require_owner_or_admin(&auth, &organization)?;
    }
    if organization.is_owned_by(account_id) {
        return Err(ApiError::conflict("The owner cannot be removed from the organization"));
    }

    let accounts = state.accounts();
    let account = accounts
        .find_by_id(account_id)
        .await?
        .filter(|account| account.organization_id == Some(id))
        .ok_or_else(|| ApiError::not_found(format!("Account {} is not a member", account_id)))?;

    accounts.set_organization(account.id, None).await?;
    organization.release_member(account.id).record();

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::AccountRole;

    fn caller(role: AccountRole) -> AuthUser {
        AuthUser {
            account_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn only_the_slug_constraint_reports_a_taken_slug() {
        let owner_id = Uuid::new_v4();
        let (org, _) = Organization::new("Acme", "acme", None, owner_id).unwrap();

        let err = creation_error(RepositoryError::Conflict(SLUG_CONSTRAINT.to_string()), &org, owner_id);
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.message, "Slug already taken: acme");

        let err = creation_error(
            RepositoryError::Conflict("organizations_owner_id_fkey".to_string()),
            &org,
            owner_id,
        );
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(err.message.contains(&owner_id.to_string()));

        let err = creation_error(RepositoryError::NotFound, &org, owner_id);
        assert_ne!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn owner_and_admin_may_mutate() {
        let owner = caller(AccountRole::Member);
        let (org, _) = Organization::new("Acme", "acme", None, owner.account_id).unwrap();

        assert!(require_owner_or_admin(&owner, &org).is_ok());
        assert!(require_owner_or_admin(&caller(AccountRole::Admin), &org).is_ok());

        let err = require_owner_or_admin(&caller(AccountRole::Member), &org).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn response_uses_normalized_values() {
        let (org, _) = Organization::new(
            "Acme",
            "acme-health",
            Some("HTTPS://Acme.ORG/About"),
            Uuid::new_v4(),
        )
        .unwrap();

        let value = serde_json::to_value(OrganizationResponse::from(&org)).unwrap();
        assert_eq!(value["slug"], "acme-health");
        assert_eq!(value["website"], "https://acme.org/About");
        assert_eq!(value["status"], "active");
    }
}
