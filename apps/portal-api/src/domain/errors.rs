use thiserror::Error;

use super::organization::OrganizationStatus;

/// Rule violations raised by domain constructors and aggregates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Password must contain {0}")]
    WeakPassword(String),

    #[error("{field} {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid slug: {0}")]
    InvalidSlug(String),

    #[error("Invalid website: {0}")]
    InvalidWebsite(String),

    #[error("Cannot change organization status from {from} to {to}")]
    InvalidTransition {
        from: OrganizationStatus,
        to: OrganizationStatus,
    },

    #[error("Organization is archived")]
    Archived,
}

impl DomainError {
    /// Whether the error is a state conflict rather than bad input
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::InvalidTransition { .. } | DomainError::Archived)
    }
}
