use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::DomainError;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

static HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)+(:\d{1,5})?$")
        .expect("valid host regex")
});

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:", "file:", "ftp:"];
const MAX_WEBSITE_LEN: usize = 2048;

/// Represents the lifecycle status of an organization
///
/// # Status Transitions
/// ```text
/// Active <-> Suspended
///   |            |
///   +------------+--> Archived
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "organization_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    Active,
    Suspended,
    /// Read-only; no further transitions
    Archived,
}

impl OrganizationStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Example
    /// ```
    /// use portal_api::domain::organization::OrganizationStatus;
    ///
    /// assert!(OrganizationStatus::Active.can_transition_to(OrganizationStatus::Suspended));
    /// assert!(!OrganizationStatus::Archived.can_transition_to(OrganizationStatus::Active));
    /// ```
    pub fn can_transition_to(&self, next: OrganizationStatus) -> bool {
        use OrganizationStatus::*;
        matches!(
            (self, next),
            (Active, Suspended) | (Suspended, Active) | (Active, Archived) | (Suspended, Archived)
        )
    }
}

impl fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizationStatus::Active => write!(f, "active"),
            OrganizationStatus::Suspended => write!(f, "suspended"),
            OrganizationStatus::Archived => write!(f, "archived"),
        }
    }
}

/// URL-safe organization handle
///
/// # Invariants
/// - 3 to 64 characters
/// - Lower-case letters, digits and single inner hyphens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slug(String);

impl Slug {
    pub fn new(slug: impl AsRef<str>) -> Result<Self, DomainError> {
        let slug = slug.as_ref().trim();
        let len = slug.len();
        if !(3..=64).contains(&len) {
            return Err(DomainError::InvalidSlug(format!(
                "'{}' must be 3 to 64 characters",
                slug
            )));
        }
        if !SLUG_RE.is_match(slug) {
            return Err(DomainError::InvalidSlug(format!(
                "'{}' may only contain a-z, 0-9 and single hyphens",
                slug
            )));
        }
        Ok(Slug(slug.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Organization website restricted to http and https
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Website(String);

impl Website {
    /// Validates and normalizes a website URL
    ///
    /// Scripting and file schemes are rejected even when obfuscated with
    /// whitespace or mixed case.
    ///
    /// # Example
    /// ```
    /// use portal_api::domain::organization::Website;
    ///
    /// assert_eq!(Website::new("HTTPS://Example.org/about").unwrap().as_str(), "https://example.org/about");
    /// assert!(Website::new("javascript:alert(1)").is_err());
    /// ```
    pub fn new(url: impl AsRef<str>) -> Result<Self, DomainError> {
        let url = url.as_ref().trim();
        if url.is_empty() || url.len() > MAX_WEBSITE_LEN {
            return Err(DomainError::InvalidWebsite("must be 1 to 2048 characters".to_string()));
        }

        let compact: String = url
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .collect::<String>()
            .to_ascii_lowercase();
        if let Some(scheme) = BLOCKED_SCHEMES.iter().find(|s| compact.starts_with(**s)) {
            return Err(DomainError::InvalidWebsite(format!(
                "scheme '{}' is not allowed",
                scheme.trim_end_matches(':')
            )));
        }
        if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DomainError::InvalidWebsite("must not contain whitespace".to_string()));
        }

        let lower = url.to_ascii_lowercase();
        let (scheme, rest) = if lower.starts_with("https://") {
            ("https://", &url["https://".len()..])
        } else if lower.starts_with("http://") {
            ("http://", &url["http://".len()..])
        } else {
            return Err(DomainError::InvalidWebsite("must start with http:// or https://".to_string()));
        };

        let (host, path) = match rest.find(['/', '?', '#']) {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        let host = host.to_ascii_lowercase();
        if !HOST_RE.is_match(&host) {
            return Err(DomainError::InvalidWebsite(format!("'{}' is not a valid host", host)));
        }

        Ok(Website(format!("{}{}{}", scheme, host, path)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Website {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
