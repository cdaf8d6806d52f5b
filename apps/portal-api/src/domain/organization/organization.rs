use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::events::OrganizationEvent;
use super::value_objects::{OrganizationStatus, Slug, Website};
use crate::domain::errors::DomainError;

const MAX_NAME_LEN: usize = 200;

/// Organization aggregate root
///
/// Groups portal accounts under one owner. Enforces all business rules
/// related to naming and lifecycle.
///
/// # Invariants
/// - Name is non-empty and at most 200 characters
/// - Slug and website are valid value objects
/// - Status transitions follow [`OrganizationStatus::can_transition_to`]
/// - Archived organizations are read-only
///
/// # Example
/// ```
/// use portal_api::domain::organization::Organization;
/// use uuid::Uuid;
///
/// let (org, events) = Organization::new(
///     "Acme Health",
///     "acme-health",
///     Some("https://acme.org"),
///     Uuid::new_v4(),
/// ).expect("valid organization");
///
/// assert_eq!(org.slug().as_str(), "acme-health");
/// assert_eq!(events.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Organization {
    id: Uuid,
    name: String,
    slug: Slug,
    website: Option<Website>,
    status: OrganizationStatus,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidField {
            field: "name",
            reason: "cannot be empty".to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::InvalidField {
            field: "name",
            reason: format!("must be at most {} characters", MAX_NAME_LEN),
        });
    }
    Ok(name.to_string())
}

impl Organization {
    /// Creates a new active Organization
    ///
    /// # Returns
    /// * `Ok((Organization, Vec<OrganizationEvent>))` - New organization and a Created event
    /// * `Err(DomainError)` - If any invariant is violated
    pub fn new(
        name: &str,
        slug: &str,
        website: Option<&str>,
        owner_id: Uuid,
    ) -> Result<(Self, Vec<OrganizationEvent>), DomainError> {
        let now = Utc::now();
        let organization = Self {
            id: Uuid::new_v4(),
            name: validate_name(name)?,
            slug: Slug::new(slug)?,
            website: website.map(Website::new).transpose()?,
            status: OrganizationStatus::Active,
            owner_id,
            created_at: now,
            updated_at: now,
        };

        let events = vec![OrganizationEvent::Created {
            organization_id: organization.id,
            slug: organization.slug.to_string(),
            owner_id,
        }];

        Ok((organization, events))
    }

    fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.status == OrganizationStatus::Archived {
            return Err(DomainError::Archived);
        }
        Ok(())
    }

    pub fn rename(&mut self, name: &str) -> Result<(), DomainError> {
        self.ensure_editable()?;
        self.name = validate_name(name)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replaces the website; `None` clears it
    pub fn set_website(&mut self, website: Option<&str>) -> Result<(), DomainError> {
        self.ensure_editable()?;
        self.website = website.map(Website::new).transpose()?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves the organization to `next`
    ///
    /// # Business Rules
    /// - Active <-> Suspended
    /// - Active or Suspended -> Archived
    pub fn change_status(&mut self, next: OrganizationStatus) -> Result<OrganizationEvent, DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let from = self.status;
        self.status = next;
        self.updated_at = Utc::now();

        Ok(OrganizationEvent::StatusChanged {
            organization_id: self.id,
            from,
            to: next,
        })
    }

    /// Records that an account joined; only active organizations accept members
    pub fn admit_member(&self, account_id: Uuid) -> Result<OrganizationEvent, DomainError> {
        match self.status {
            OrganizationStatus::Active => Ok(OrganizationEvent::MemberAdded {
                organization_id: self.id,
                account_id,
            }),
            OrganizationStatus::Archived => Err(DomainError::Archived),
            OrganizationStatus::Suspended => Err(DomainError::InvalidField {
                field: "status",
                reason: "suspended organizations cannot accept members".to_string(),
            }),
        }
    }

    pub fn release_member(&self, account_id: Uuid) -> OrganizationEvent {
        OrganizationEvent::MemberRemoved {
            organization_id: self.id,
            account_id,
        }
    }

    /// Whether `account_id` owns the organization
    pub fn is_owned_by(&self, account_id: Uuid) -> bool {
        self.owner_id == account_id
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn website(&self) -> Option<&Website> {
        self.website.as_ref()
    }

    pub fn status(&self) -> OrganizationStatus {
        self.status
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Reconstructs an Organization from stored data
    ///
    /// Stored slugs and websites are re-validated so a bad row surfaces as an
    /// error instead of a silently invalid aggregate.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        name: String,
        slug: String,
        website: Option<String>,
        status: OrganizationStatus,
        owner_id: Uuid,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            name,
            slug: Slug::new(slug)?,
            website: website.map(Website::new).transpose()?,
            status,
            owner_id,
            created_at,
            updated_at,
        })
    }
}
