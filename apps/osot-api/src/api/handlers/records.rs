//! Generic CRUD handlers shared by every platform-backed resource
//!
//! Access rules come from `Record::ACCESS`

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::AuthUser;
use crate::api::middleware::json::ApiJson;
use crate::domain::record::{Access, FieldFilter, Record, RecordQuery, Validate};
use crate::domain::repository::RecordRepository;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::infrastructure::dataverse::Table;
use crate::state::AppState;

const DEFAULT_TOP: u32 = 100;
const MAX_TOP: u32 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub account_id: Option<Uuid>,
    pub top: Option<u32>,
}

/// Checks that the caller may read `record`
fn check_read<R: Record>(user: &AuthUser, record: &R) -> AppResult<()> {
    match R::ACCESS {
        Access::Catalog => Ok(()),
        Access::Owned | Access::OwnedStaffWrite => match record.owner() {
            Some(owner) => user.require_access(owner),
            None => user
                .require_staff()
                .map_err(|_| AppError::new(ErrorCode::RecordAccessDenied)),
        },
    }
}

/// Checks that the caller may change `record`
fn check_write<R: Record>(user: &AuthUser, record: &R) -> AppResult<()> {
    match R::ACCESS {
        Access::Catalog | Access::OwnedStaffWrite => user.require_staff(),
        Access::Owned => check_read(user, record),
    }
}

/// List records; members only see their own
///
/// GET /api/<resource>?account_id=&top=
pub async fn list<R: Table>(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<R>>> {
    let mut query = RecordQuery::new().top(params.top.unwrap_or(DEFAULT_TOP).min(MAX_TOP));

    if R::ACCESS != Access::Catalog {
        let owner = match params.account_id {
            Some(account_id) => {
                user.require_access(account_id)?;
                Some(account_id)
            }
            None if user.is_staff() => None,
            None => Some(user.id),
        };
        if let Some(owner) = owner {
            query = query.filter(FieldFilter::eq("account_id", owner));
        }
    }

    let records = state.repo::<R>().find(&query).await?;
    Ok(Json(records))
}

/// Get a record by id
///
/// GET /api/<resource>/:id
pub async fn get<R: Table>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<R>> {
    let record = state
        .repo::<R>()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(R::RESOURCE, id))?;
    check_read(&user, &record)?;

    Ok(Json(record))
}

/// Create a record
///
/// Members create owned records for themselves; `account_id` defaults to
/// the caller. Staff must name the owning account.
///
/// POST /api/<resource>
pub async fn create<R: Table>(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(mut draft): ApiJson<R::Draft>,
) -> AppResult<(StatusCode, Json<R>)> {
    match R::ACCESS {
        Access::Catalog => user.require_staff()?,
        Access::OwnedStaffWrite => {
            user.require_staff()?;
            if R::draft_owner(&draft).is_none() {
                return Err(AppError::validation("account_id is required"));
            }
        }
        Access::Owned => match R::draft_owner(&draft) {
            Some(owner) => user.require_access(owner)?,
            None if user.is_staff() => {
                return Err(AppError::validation("account_id is required"));
            }
            None => R::assign_owner(&mut draft, user.id),
        },
    }
    draft.validate()?;

    let repo = state.repo::<R>();
    let unique = R::unique_filters(&draft);
    if !unique.is_empty() {
        let query = unique
            .into_iter()
            .fold(RecordQuery::new(), |query, filter| query.filter(filter));
        if repo.find_one(&query).await?.is_some() {
            return Err(AppError::with_detail(
                ErrorCode::ResourceConflict,
                format!("A matching {} record already exists", R::RESOURCE),
            ));
        }
    }

    let record = repo.create(&draft).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Partially update a record
///
/// PATCH /api/<resource>/:id
pub async fn update<R: Table>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(mut patch): ApiJson<R::Patch>,
) -> AppResult<Json<R>> {
    let repo = state.repo::<R>();
    let current = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(R::RESOURCE, id))?;
    check_write(&user, &current)?;
    patch.validate()?;
    current.check_patch(&patch)?;

    let record = repo.update(id, &patch).await?;
    Ok(Json(record))
}

/// Delete a record
///
/// DELETE /api/<resource>/:id
pub async fn delete<R: Table>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let repo = state.repo::<R>();
    let current = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(R::RESOURCE, id))?;
    check_write(&user, &current)?;

    repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Privilege;
    use crate::domain::catalog::InsuranceProvider;
    use crate::domain::order::Order;
    use crate::domain::profile::Identity;
    use serde_json::json;

    fn user(privilege: Privilege) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "a@b.ca".to_string(),
            privilege,
        }
    }

    fn identity(owner: Uuid) -> Identity {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "account_id": owner,
            "chosen_name": null,
            "language": "english",
            "gender": null,
            "indigenous": null,
            "disability": null,
            "created_on": null
        }))
        .unwrap()
    }

    fn order(owner: Uuid) -> Order {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "order_number": "ORD-1",
            "account_id": owner,
            "status": "pending",
            "items": [],
            "subtotal": "0",
            "tax": "0",
            "total": "0",
            "payment_reference": null,
            "created_on": null
        }))
        .unwrap()
    }

    #[test]
    fn owners_read_and_write_owned_records() {
        let member = user(Privilege::Owner);
        let own = identity(member.id);
        assert!(check_read(&member, &own).is_ok());
        assert!(check_write(&member, &own).is_ok());

        let other = identity(Uuid::new_v4());
        assert_eq!(
            check_read(&member, &other).unwrap_err().code,
            ErrorCode::RecordAccessDenied
        );
    }

    #[test]
    fn staff_write_rules() {
        let member = user(Privilege::Owner);
        let own_order = order(member.id);
        assert!(check_read(&member, &own_order).is_ok());
        assert_eq!(
            check_write(&member, &own_order).unwrap_err().code,
            ErrorCode::InsufficientPrivilege
        );

        let admin = user(Privilege::Admin);
        assert!(check_write(&admin, &own_order).is_ok());
    }

    #[test]
    fn catalog_is_readable_by_members() {
        let provider: InsuranceProvider = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": "Acme Insurance",
            "description": null,
            "contact_email": null,
            "phone": null,
            "website": null,
            "logo_url": null,
            "is_active": true,
            "created_on": null
        }))
        .unwrap();

        let member = user(Privilege::Owner);
        assert!(check_read(&member, &provider).is_ok());
        assert!(check_write(&member, &provider).is_err());
    }
}
