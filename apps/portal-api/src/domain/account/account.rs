use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::value_objects::{AccountRole, Email};
use crate::domain::errors::DomainError;

const MAX_NAME_LEN: usize = 200;

/// Portal account
///
/// Simple struct for account CRUD operations; the repository owns persistence.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: Email,
    pub password_hash: String,
    pub full_name: String,
    pub role: AccountRole,
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    /// Creates an active account that belongs to no organization
    ///
    /// # Example
    /// ```
    /// use portal_api::domain::account::{Account, AccountRole, Email};
    ///
    /// let email = Email::new("ada@example.com").unwrap();
    /// let account = Account::new(email, "$2b$12$hash".to_string(), " Ada Lovelace ", AccountRole::Member)
    ///     .expect("valid account");
    /// assert_eq!(account.full_name, "Ada Lovelace");
    /// assert!(account.is_active);
    /// ```
    pub fn new(
        email: Email,
        password_hash: String,
        full_name: &str,
        role: AccountRole,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            full_name: validate_full_name(full_name)?,
            role,
            organization_id: None,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Trims a display name and checks it is non-empty and at most 200 characters
pub fn validate_full_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidField {
            field: "full_name",
            reason: "cannot be empty".to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::InvalidField {
            field: "full_name",
            reason: format!("must be at most {} characters", MAX_NAME_LEN),
        });
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::new("grace@example.com").unwrap()
    }

    #[test]
    fn new_account_defaults() {
        let account = Account::new(email(), "hash".to_string(), "Grace Hopper", AccountRole::Member)
            .unwrap();

        assert!(account.is_active);
        assert!(account.organization_id.is_none());
        assert!(account.last_login.is_none());
        assert!(!account.is_admin());
    }

    #[test]
    fn empty_name_fails() {
        let result = Account::new(email(), "hash".to_string(), "   ", AccountRole::Member);
        assert!(matches!(
            result,
            Err(DomainError::InvalidField { field: "full_name", .. })
        ));
    }

    #[test]
    fn long_name_fails() {
        let name = "x".repeat(201);
        assert!(validate_full_name(&name).is_err());
        assert!(validate_full_name(&"x".repeat(200)).is_ok());
    }
}
