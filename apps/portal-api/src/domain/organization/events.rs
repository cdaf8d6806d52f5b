use uuid::Uuid;

use super::value_objects::OrganizationStatus;

/// Domain events that occur within the Organization aggregate
///
/// Handlers log them as the organization's audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationEvent {
    /// Fired when an organization is created
    Created {
        organization_id: Uuid,
        slug: String,
        owner_id: Uuid,
    },
    /// Fired on every accepted status change
    StatusChanged {
        organization_id: Uuid,
        from: OrganizationStatus,
        to: OrganizationStatus,
    },
    MemberAdded {
        organization_id: Uuid,
        account_id: Uuid,
    },
    MemberRemoved {
        organization_id: Uuid,
        account_id: Uuid,
    },
}

impl OrganizationEvent {
    /// Returns the organization_id for this event
    pub fn organization_id(&self) -> Uuid {
        match self {
            OrganizationEvent::Created { organization_id, .. }
            | OrganizationEvent::StatusChanged { organization_id, .. }
            | OrganizationEvent::MemberAdded { organization_id, .. }
            | OrganizationEvent::MemberRemoved { organization_id, .. } => *organization_id,
        }
    }

    /// Short event name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            OrganizationEvent::Created { .. } => "organization.created",
            OrganizationEvent::StatusChanged { .. } => "organization.status_changed",
            OrganizationEvent::MemberAdded { .. } => "organization.member_added",
            OrganizationEvent::MemberRemoved { .. } => "organization.member_removed",
        }
    }

    /// Writes the event to the log
    pub fn record(&self) {
        tracing::info!(
            event = self.name(),
            organization_id = %self.organization_id(),
            details = ?self,
            "Organization event"
        );
    }
}
