use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::organization::Organization;

/// Repository trait for Organization aggregate
///
/// Defines the contract for persisting and retrieving organizations.
/// Implementations should handle database-specific details.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Save an organization (insert or update)
    async fn save(&self, organization: &Organization) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>, RepositoryError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, RepositoryError>;

    /// Page through organizations ordered by name
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Organization>, RepositoryError>;

    /// Delete an organization by ID; members are detached
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
