pub mod postgres_account_repository;
pub mod postgres_organization_repository;

pub use postgres_account_repository::PostgresAccountRepository;
pub use postgres_organization_repository::PostgresOrganizationRepository;

use crate::domain::repositories::RepositoryError;

/// Maps constraint violations to `Conflict`, everything else to `Database`
///
/// Postgres reports unique violations as 23505 and foreign key violations
/// as 23503.
pub(crate) fn map_db_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.code().as_deref(), Some("23505") | Some("23503")) {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            return RepositoryError::Conflict(constraint);
        }
    }
    RepositoryError::Database(err)
}
