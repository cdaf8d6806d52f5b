use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::account::{AccountDraft, AccountGroup, AccountStatus, Privilege};
use super::education::EducationDraft;
use super::profile::{AddressDraft, ContactDraft, IdentityDraft};
use super::record::Validate;
use crate::error::{AppError, ErrorCode};
use crate::validation::{mask_email, validate_password};

/// Progress of a registration through the approval workflow
///
/// # Status Transitions
/// ```text
/// Staged -> EmailVerified -> AccountCreated -> EntitiesCreating -> Completed
///                 |                 |                  |
///                 +--> Rejected     +------------------+--> Failed -> RetryPending
///                 +--> Failed                                              |
///                                   AccountCreated | EntitiesCreating <----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Staged,
    EmailVerified,
    AccountCreated,
    EntitiesCreating,
    Completed,
    Failed,
    RetryPending,
    Rejected,
}

impl RegistrationStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Example
    /// ```
    /// use osot_api::domain::registration::RegistrationStatus;
    ///
    /// assert!(RegistrationStatus::Staged.can_transition_to(RegistrationStatus::EmailVerified));
    /// assert!(!RegistrationStatus::Staged.can_transition_to(RegistrationStatus::Completed));
    /// ```
    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        matches!(
            (self, next),
            (Staged, EmailVerified)
                | (EmailVerified, AccountCreated)
                | (EmailVerified, Rejected)
                | (EmailVerified, Failed)
                | (AccountCreated, EntitiesCreating)
                | (AccountCreated, Failed)
                | (EntitiesCreating, Completed)
                | (EntitiesCreating, Failed)
                | (Failed, RetryPending)
                | (RetryPending, AccountCreated)
                | (RetryPending, EntitiesCreating)
                | (RetryPending, Failed)
        )
    }

    /// Whether the workflow has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationStatus::Completed | RegistrationStatus::Rejected)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistrationStatus::Staged => "staged",
            RegistrationStatus::EmailVerified => "email_verified",
            RegistrationStatus::AccountCreated => "account_created",
            RegistrationStatus::EntitiesCreating => "entities_creating",
            RegistrationStatus::Completed => "completed",
            RegistrationStatus::Failed => "failed",
            RegistrationStatus::RetryPending => "retry_pending",
            RegistrationStatus::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

/// Account section of a registration form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSection {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    pub password: String,
    pub group: AccountGroup,
    #[serde(default)]
    pub accepted_terms: bool,
}

/// Full registration form submitted in one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub account: AccountSection,
    pub address: AddressDraft,
    #[serde(default)]
    pub contact: Option<ContactDraft>,
    #[serde(default)]
    pub identity: Option<IdentityDraft>,
    #[serde(default)]
    pub education: Option<EducationDraft>,
}

impl RegistrationRequest {
    /// Validates every section and returns the pending account draft
    ///
    /// The password is checked here but not copied into the draft; the
    /// caller hashes it.
    pub fn validate_sections(&mut self) -> Result<AccountDraft, AppError> {
        validate_password(&self.account.password)?;

        let mut account = AccountDraft {
            first_name: self.account.first_name.clone(),
            last_name: self.account.last_name.clone(),
            date_of_birth: self.account.date_of_birth,
            email: self.account.email.clone(),
            mobile_phone: self.account.mobile_phone.clone(),
            password_hash: None,
            group: self.account.group,
            status: AccountStatus::Pending,
            privilege: Privilege::Owner,
            accepted_terms: self.account.accepted_terms,
        };
        account.validate()?;

        self.address.validate()?;
        if let Some(contact) = self.contact.as_mut() {
            contact.validate()?;
        }
        if let Some(identity) = self.identity.as_mut() {
            identity.validate()?;
        }

        match (&mut self.education, account.group) {
            (Some(education), group) => {
                education.check_group(group)?;
                education.validate()?;
            }
            (None, AccountGroup::Ot | AccountGroup::Ota) => {
                return Err(AppError::with_detail(
                    ErrorCode::EducationNotFound,
                    "Education is required for OT and OTA registrations",
                ));
            }
            (None, _) => {}
        }

        Ok(account)
    }
}

/// Ids of records created so far, used to skip them on retry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatedRecords {
    pub account_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub identity_id: Option<Uuid>,
    pub education_id: Option<Uuid>,
}

/// Registration state kept in the cache between workflow steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSession {
    pub id: Uuid,
    pub status: RegistrationStatus,
    pub account: AccountDraft,
    pub address: AddressDraft,
    pub contact: Option<ContactDraft>,
    pub identity: Option<IdentityDraft>,
    pub education: Option<EducationDraft>,
    pub verification_token: String,
    #[serde(default)]
    pub created: CreatedRecords,
    /// Entity creation attempts so far
    #[serde(default)]
    pub attempts: u32,
    pub last_error: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RegistrationSession {
    pub fn new(
        request: RegistrationRequest,
        account: AccountDraft,
        verification_token: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: RegistrationStatus::Staged,
            account,
            address: request.address,
            contact: request.contact,
            identity: request.identity,
            education: request.education,
            verification_token,
            created: CreatedRecords::default(),
            attempts: 0,
            last_error: None,
            reviewed_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            email_verified_at: None,
            completed_at: None,
        }
    }

    /// Moves to `next`, or fails with `RegistrationInvalidState`
    pub fn transition(&mut self, next: RegistrationStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::with_detail(
                ErrorCode::RegistrationInvalidState,
                format!("Cannot move registration from {} to {}", self.status, next),
            ));
        }
        let now = Utc::now();
        match next {
            RegistrationStatus::EmailVerified => self.email_verified_at = Some(now),
            RegistrationStatus::Completed => self.completed_at = Some(now),
            _ => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn view(&self) -> RegistrationView {
        RegistrationView {
            id: self.id,
            status: self.status,
            masked_email: mask_email(&self.account.email),
            first_name: self.account.first_name.clone(),
            last_name: self.account.last_name.clone(),
            group: self.account.group,
            created: self.created.clone(),
            attempts: self.attempts,
            last_error: self.last_error.clone(),
            rejection_reason: self.rejection_reason.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Session summary returned to clients; never carries the token or hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationView {
    pub id: Uuid,
    pub status: RegistrationStatus,
    pub masked_email: String,
    pub first_name: String,
    pub last_name: String,
    pub group: AccountGroup,
    pub created: CreatedRecords,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_json() -> serde_json::Value {
        json!({
            "account": {
                "first_name": "Jane",
                "last_name": "Doe",
                "date_of_birth": "1990-04-12",
                "email": "Jane.Doe@Example.com",
                "mobile_phone": "416-555-0100",
                "password": "Str0ng!Pass",
                "group": "ot",
                "accepted_terms": true
            },
            "address": {
                "street1": "1 Yonge St",
                "city": "Toronto",
                "province": "on",
                "postal_code": "m5e1w7",
                "address_type": "home"
            },
            "education": {
                "kind": "ot",
                "coto_status": "general",
                "coto_registration": "G1234567",
                "degree_type": "masters",
                "university": "Queen's University",
                "graduation_year": 2012,
                "country": "Canada"
            }
        })
    }

    fn request() -> RegistrationRequest {
        serde_json::from_value(request_json()).expect("valid request json")
    }

    fn session() -> RegistrationSession {
        let mut request = request();
        let account = request.validate_sections().unwrap();
        RegistrationSession::new(request, account, "token".to_string())
    }

    #[test]
    fn happy_path_transitions() {
        use RegistrationStatus::*;
        let path = [Staged, EmailVerified, AccountCreated, EntitiesCreating, Completed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn failure_and_retry_transitions() {
        use RegistrationStatus::*;
        assert!(EntitiesCreating.can_transition_to(Failed));
        assert!(Failed.can_transition_to(RetryPending));
        assert!(RetryPending.can_transition_to(EntitiesCreating));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Rejected.can_transition_to(EmailVerified));
        assert!(!Staged.can_transition_to(AccountCreated));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_value(RegistrationStatus::RetryPending).unwrap(),
            json!("retry_pending")
        );
        assert_eq!(RegistrationStatus::EmailVerified.to_string(), "email_verified");
    }

    #[test]
    fn sections_are_validated_and_normalized() {
        let mut request = request();
        let account = request.validate_sections().expect("valid registration");
        assert_eq!(account.email, "jane.doe@example.com");
        assert_eq!(account.status, AccountStatus::Pending);
        assert_eq!(request.address.postal_code, "M5E 1W7");
    }

    #[test]
    fn weak_password_is_rejected() {
        let mut request = request();
        request.account.password = "password".to_string();
        assert_eq!(
            request.validate_sections().unwrap_err().code,
            ErrorCode::WeakPassword
        );
    }

    #[test]
    fn education_must_match_group() {
        let mut request = request();
        request.account.group = AccountGroup::Ota;
        assert_eq!(
            request.validate_sections().unwrap_err().code,
            ErrorCode::EducationCategoryMismatch
        );
    }

    #[test]
    fn ot_registration_requires_education() {
        let mut request = request();
        request.education = None;
        assert_eq!(
            request.validate_sections().unwrap_err().code,
            ErrorCode::EducationNotFound
        );

        request.account.group = AccountGroup::Vendor;
        assert!(request.validate_sections().is_ok());
    }

    #[test]
    fn transition_updates_timestamps_and_rejects_skips() {
        let mut session = session();
        let err = session.transition(RegistrationStatus::Completed).unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistrationInvalidState);

        session.transition(RegistrationStatus::EmailVerified).unwrap();
        assert!(session.email_verified_at.is_some());
    }

    #[test]
    fn view_masks_email_and_hides_secrets() {
        let session = session();
        let value = serde_json::to_value(session.view()).unwrap();
        assert_eq!(value["masked_email"], "jan*****@example.com");
        assert!(value.get("verification_token").is_none());
        assert!(value.get("account").is_none());
    }
}
