pub mod account_repository;
pub mod organization_repository;

pub use account_repository::{AccountRepository, ProfileUpdate};
pub use organization_repository::OrganizationRepository;

use thiserror::Error;

/// Errors surfaced by repository implementations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    /// A unique constraint rejected the write; carries the constraint name
    #[error("conflict on {0}")]
    Conflict(String),

    #[error("stored data is invalid: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
