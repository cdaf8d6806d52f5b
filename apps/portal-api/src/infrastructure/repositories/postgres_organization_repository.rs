use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::map_db_error;
use crate::domain::organization::{Organization, OrganizationStatus, Website};
use crate::domain::repositories::{OrganizationRepository, RepositoryError};

const ORGANIZATION_COLUMNS: &str =
    "id, name, slug, website, status, owner_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    slug: String,
    website: Option<String>,
    status: OrganizationStatus,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = RepositoryError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        let id = row.id;
        Organization::from_persistence(
            row.id,
            row.name,
            row.slug,
            row.website,
            row.status,
            row.owner_id,
            row.created_at,
            row.updated_at,
        )
        .map_err(|e| RepositoryError::Corrupt(format!("organization {}: {}", id, e)))
    }
}

/// PostgreSQL implementation of OrganizationRepository
///
/// Provides persistence for Organization aggregates using runtime SQLx
/// queries against PostgreSQL.
pub struct PostgresOrganizationRepository {
    pool: PgPool,
}

impl PostgresOrganizationRepository {
    /// Creates a new PostgresOrganizationRepository
    ///
    /// # Arguments
    /// * `pool` - SQLx connection pool for PostgreSQL
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn save(&self, organization: &Organization) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO organizations (
                id, name, slug, website, status, owner_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                slug = EXCLUDED.slug,
                website = EXCLUDED.website,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(organization.id())
        .bind(organization.name())
        .bind(organization.slug().as_str())
        .bind(organization.website().map(Website::as_str))
        .bind(organization.status())
        .bind(organization.owner_id())
        .bind(organization.created_at())
        .bind(organization.updated_at())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations WHERE id = $1",
            ORGANIZATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Organization::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations WHERE slug = $1",
            ORGANIZATION_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Organization::try_from).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Organization>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations ORDER BY name, id LIMIT $1 OFFSET $2",
            ORGANIZATION_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Organization::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
