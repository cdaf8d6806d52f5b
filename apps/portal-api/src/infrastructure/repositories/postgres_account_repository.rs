use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::map_db_error;
use crate::domain::account::{Account, AccountRole, Email};
use crate::domain::repositories::{AccountRepository, ProfileUpdate, RepositoryError};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, full_name, role, organization_id, \
                               is_active, created_at, last_login";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    full_name: String,
    role: AccountRole,
    organization_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::new(&row.email)
            .map_err(|e| RepositoryError::Corrupt(format!("account {}: {}", row.id, e)))?;
        Ok(Account {
            id: row.id,
            email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            role: row.role,
            organization_id: row.organization_id,
            is_active: row.is_active,
            created_at: row.created_at,
            last_login: row.last_login,
        })
    }
}

/// PostgreSQL implementation of AccountRepository
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    /// Creates a new PostgresAccountRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn expect_row(id: Uuid, rows_affected: u64) -> Result<(), RepositoryError> {
        if rows_affected == 0 {
            tracing::debug!(account_id = %id, "Account not found");
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create(&self, account: &Account) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, password_hash, full_name, role,
                organization_id, is_active, created_at, last_login
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(account.id)
        .bind(account.email.as_str())
        .bind(&account.password_hash)
        .bind(&account.full_name)
        .bind(account.role)
        .bind(account.organization_id)
        .bind(account.is_active)
        .bind(account.created_at)
        .bind(account.last_login)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts ORDER BY full_name, id LIMIT $1 OFFSET $2",
            ACCOUNT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE organization_id = $1 ORDER BY full_name, id",
            ACCOUNT_COLUMNS
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE accounts
            SET email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                password_hash = COALESCE($4, password_hash),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .bind(update.email.as_ref().map(Email::as_str))
        .bind(update.full_name.as_deref())
        .bind(update.password_hash.as_deref())
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or(RepositoryError::NotFound)?;

        Account::try_from(row)
    }

    async fn set_organization(&self, id: Uuid, organization_id: Option<Uuid>) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE accounts SET organization_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(organization_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::expect_row(id, result.rows_affected())
    }

    async fn update_last_login(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET last_login = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Self::expect_row(id, result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Self::expect_row(id, result.rows_affected())
    }
}
