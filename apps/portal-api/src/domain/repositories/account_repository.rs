use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::account::{Account, Email};

/// Account fields changed in one statement; `is_active` is set by admins
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<Email>,
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.password_hash.is_none()
            && self.is_active.is_none()
    }
}

/// Repository trait for portal accounts
///
/// Unique email violations surface as [`RepositoryError::Conflict`].
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create a new account
    async fn create(&self, account: &Account) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError>;

    /// Find an account by email address
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError>;

    /// Page through all accounts ordered by name
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Account>, RepositoryError>;

    async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<Account>, RepositoryError>;

    /// Apply the set fields of `update` and return the stored account
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Account, RepositoryError>;

    /// Attach the account to an organization, or detach it with `None`
    async fn set_organization(&self, id: Uuid, organization_id: Option<Uuid>) -> Result<(), RepositoryError>;

    /// Update account's last login timestamp
    async fn update_last_login(&self, id: Uuid) -> Result<(), RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
