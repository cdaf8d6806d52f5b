use serde::Serialize;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::domain::account::{Account, AccountPatch, AccountStatus};
use crate::domain::education::{EducationDraft, OtEducation, OtaEducation};
use crate::domain::profile::{Address, Contact, Identity};
use crate::domain::record::{FieldFilter, RecordQuery};
use crate::domain::registration::{
    RegistrationRequest, RegistrationSession, RegistrationStatus, RegistrationView,
};
use crate::domain::repository::RecordRepository;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::infrastructure::dataverse::Table;
use crate::infrastructure::mailer::Email;
use crate::state::AppState;
use crate::validation::mask_email;

/// Cache key prefix for sessions and their e-mail index
pub const REGISTRATION_PREFIX: &str = "registration:";
const EMAIL_INDEX_PREFIX: &str = "registration:email:";

fn session_key(id: Uuid) -> String {
    format!("{}{}", REGISTRATION_PREFIX, id)
}

fn email_key(email: &str) -> String {
    format!("{}{}", EMAIL_INDEX_PREFIX, email)
}

/// Response to a staged registration
#[derive(Debug, Clone, Serialize)]
pub struct StagedRegistration {
    pub session_id: Uuid,
    pub status: RegistrationStatus,
    pub masked_email: String,
}

/// Drives a registration from staging to linked platform records
///
/// # Status Transitions
/// ```text
/// stage -> verify_email -> approve --(records created)--> completed
///                       -> reject            |
///                                            +--(any failure)--> failed -> retry
/// ```
pub struct RegistrationService {
    state: AppState,
}

impl RegistrationService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Validates the form, hashes the password and stores a staged session
    ///
    /// # Returns
    /// * `Ok(StagedRegistration)` - Session id and masked e-mail
    /// * `Err` with `EmailAlreadyRegistered` - An account or live session uses the e-mail
    /// * `Err` with a validation code - A section is invalid
    pub async fn stage(&self, mut request: RegistrationRequest) -> AppResult<StagedRegistration> {
        let mut account = request.validate_sections()?;

        let existing = self
            .state
            .repo::<Account>()
            .find_one(&RecordQuery::new().filter(FieldFilter::eq("email", &account.email)))
            .await?;
        if existing.is_some() {
            return Err(AppError::new(ErrorCode::EmailAlreadyRegistered));
        }
        if let Some(staged) = self.staged_for_email(&account.email).await? {
            if !staged.status.is_terminal() {
                return Err(AppError::with_detail(
                    ErrorCode::EmailAlreadyRegistered,
                    "A registration for this email is already in progress",
                ));
            }
        }

        account.password_hash = Some(hash_password(&request.account.password)?);
        let token = Uuid::new_v4().simple().to_string();
        let session = RegistrationSession::new(request, account, token);

        self.save(&session).await?;

        let link = format!(
            "{}/register/verify?session={}&token={}",
            self.state.config.public_url, session.id, session.verification_token
        );
        let email = Email::verification(&session.account.email, &session.account.first_name, &link);
        if let Err(e) = self.state.mailer.send(&email).await {
            self.discard(&session).await;
            return Err(e.into());
        }

        tracing::info!(
            session_id = %session.id,
            email = %mask_email(&session.account.email),
            "Registration staged"
        );

        Ok(StagedRegistration {
            session_id: session.id,
            status: session.status,
            masked_email: mask_email(&session.account.email),
        })
    }

    /// Confirms the e-mail address and notifies administrators
    pub async fn verify_email(&self, id: Uuid, token: &str) -> AppResult<RegistrationView> {
        let mut session = self.load(id).await?;
        if session.status != RegistrationStatus::Staged {
            return Err(AppError::with_detail(
                ErrorCode::RegistrationInvalidState,
                format!("Registration is already {}", session.status),
            ));
        }
        if session.verification_token != token.trim() {
            return Err(AppError::new(ErrorCode::InvalidVerificationToken));
        }

        session.transition(RegistrationStatus::EmailVerified)?;
        self.save(&session).await?;
        tracing::info!(session_id = %id, "Registration email verified");

        let link = format!("{}/admin/registrations/{}", self.state.config.public_url, id);
        let email = Email::review_needed(
            &self.state.config.admin_email,
            &format!("{} {}", session.account.first_name, session.account.last_name),
            &mask_email(&session.account.email),
            &link,
        );
        if let Err(e) = self.state.mailer.send(&email).await {
            tracing::warn!(session_id = %id, error = %e, "Failed to notify administrators");
        }

        Ok(session.view())
    }

    /// Approves a verified registration and creates its platform records
    ///
    /// Creation failures do not fail the request; the returned session is
    /// `failed` with `last_error` set and can be retried.
    pub async fn approve(&self, id: Uuid, reviewer: Uuid) -> AppResult<RegistrationView> {
        let mut session = self.load(id).await?;
        if session.status != RegistrationStatus::EmailVerified {
            return Err(AppError::with_detail(
                ErrorCode::RegistrationInvalidState,
                format!("Only verified registrations can be approved, this one is {}", session.status),
            ));
        }
        session.reviewed_by = Some(reviewer);
        tracing::info!(session_id = %id, reviewer = %reviewer, "Registration approved");

        self.run_creation(session).await
    }

    /// Rejects a verified registration
    pub async fn reject(&self, id: Uuid, reviewer: Uuid, reason: &str) -> AppResult<RegistrationView> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("reason is required"));
        }

        let mut session = self.load(id).await?;
        session.transition(RegistrationStatus::Rejected)?;
        session.reviewed_by = Some(reviewer);
        session.rejection_reason = Some(reason.to_string());
        self.save(&session).await?;
        self.drop_email_index(&session).await;

        tracing::info!(session_id = %id, reviewer = %reviewer, "Registration rejected");

        let email = Email::rejected(&session.account.email, &session.account.first_name, reason);
        if let Err(e) = self.state.mailer.send(&email).await {
            tracing::warn!(session_id = %id, error = %e, "Failed to send rejection email");
        }

        Ok(session.view())
    }

    /// Re-runs record creation for a failed registration
    ///
    /// Records created by earlier attempts are skipped.
    pub async fn retry(&self, id: Uuid, reviewer: Uuid) -> AppResult<RegistrationView> {
        let mut session = self.load(id).await?;
        let max_attempts = self.state.config.registration_max_attempts;
        if session.status == RegistrationStatus::Failed && session.attempts >= max_attempts {
            return Err(AppError::with_detail(
                ErrorCode::RegistrationInvalidState,
                format!("Registration already failed {} times", session.attempts),
            ));
        }

        session.transition(RegistrationStatus::RetryPending)?;
        session.reviewed_by = Some(reviewer);
        self.save(&session).await?;
        tracing::info!(session_id = %id, attempt = session.attempts + 1, "Retrying registration");

        self.run_creation(session).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<RegistrationView> {
        Ok(self.load(id).await?.view())
    }

    /// Live sessions, oldest first, optionally limited to one status
    pub async fn list(&self, status: Option<RegistrationStatus>) -> AppResult<Vec<RegistrationView>> {
        let keys = self.state.cache.keys(REGISTRATION_PREFIX).await?;
        let mut sessions = Vec::new();
        for key in keys.iter().filter(|key| !key.starts_with(EMAIL_INDEX_PREFIX)) {
            if let Some(session) = self.state.cache.get_json::<RegistrationSession>(key).await? {
                if status.map_or(true, |wanted| session.status == wanted) {
                    sessions.push(session);
                }
            }
        }
        sessions.sort_by_key(|session| session.created_at);
        Ok(sessions.iter().map(RegistrationSession::view).collect())
    }

    async fn run_creation(&self, mut session: RegistrationSession) -> AppResult<RegistrationView> {
        session.attempts += 1;

        match self.create_records(&mut session).await {
            Ok(()) => {
                session.transition(RegistrationStatus::Completed)?;
                session.last_error = None;
                self.save(&session).await?;
                self.drop_email_index(&session).await;

                tracing::info!(
                    session_id = %session.id,
                    account_id = ?session.created.account_id,
                    "Registration completed"
                );

                let email = Email::welcome(
                    &session.account.email,
                    &session.account.first_name,
                    &format!("{}/login", self.state.config.public_url),
                );
                if let Err(e) = self.state.mailer.send(&email).await {
                    tracing::warn!(session_id = %session.id, error = %e, "Failed to send welcome email");
                }
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session.id,
                    status = %session.status,
                    attempt = session.attempts,
                    error = %e,
                    "Registration record creation failed"
                );
                session.last_error = Some(e.to_string());
                session.transition(RegistrationStatus::Failed)?;
                self.save(&session).await?;
            }
        }

        Ok(session.view())
    }

    /// Creates the account, then every linked record not created yet
    ///
    /// Progress is saved after each record so a later retry resumes.
    async fn create_records(&self, session: &mut RegistrationSession) -> AppResult<()> {
        let account_id = match session.created.account_id {
            Some(id) => id,
            None => {
                let taken = self
                    .state
                    .repo::<Account>()
                    .find_one(&RecordQuery::new().filter(FieldFilter::eq("email", &session.account.email)))
                    .await?;
                if taken.is_some() {
                    return Err(AppError::new(ErrorCode::EmailAlreadyRegistered));
                }
                let account = self.state.repo::<Account>().create(&session.account).await?;
                session.created.account_id = Some(account.id);
                session.transition(RegistrationStatus::AccountCreated)?;
                self.save(session).await?;
                account.id
            }
        };

        session.transition(RegistrationStatus::EntitiesCreating)?;
        self.save(session).await?;

        if session.created.address_id.is_none() {
            let id = self
                .create_owned::<Address>(session.address.clone(), account_id)
                .await?;
            session.created.address_id = Some(id);
            self.save(session).await?;
        }

        if let (Some(contact), None) = (&session.contact, session.created.contact_id) {
            let id = self.create_owned::<Contact>(contact.clone(), account_id).await?;
            session.created.contact_id = Some(id);
            self.save(session).await?;
        }

        if let (Some(identity), None) = (&session.identity, session.created.identity_id) {
            let id = self.create_owned::<Identity>(identity.clone(), account_id).await?;
            session.created.identity_id = Some(id);
            self.save(session).await?;
        }

        if let (Some(education), None) = (&session.education, session.created.education_id) {
            let id = match education {
                EducationDraft::Ot(draft) => {
                    self.create_owned::<OtEducation>(draft.clone(), account_id).await?
                }
                EducationDraft::Ota(draft) => {
                    self.create_owned::<OtaEducation>(draft.clone(), account_id).await?
                }
            };
            session.created.education_id = Some(id);
            self.save(session).await?;
        }

        let activate = AccountPatch {
            status: Some(AccountStatus::Active),
            ..Default::default()
        };
        self.state.repo::<Account>().update(account_id, &activate).await?;

        Ok(())
    }

    async fn create_owned<R: Table>(&self, mut draft: R::Draft, account_id: Uuid) -> AppResult<Uuid> {
        R::assign_owner(&mut draft, account_id);
        let record = self.state.repo::<R>().create(&draft).await?;
        Ok(record.id())
    }

    async fn load(&self, id: Uuid) -> AppResult<RegistrationSession> {
        self.state
            .cache
            .get_json::<RegistrationSession>(&session_key(id))
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::RegistrationNotFound))
    }

    /// Stores the session and, while it is live, renews its e-mail reservation
    async fn save(&self, session: &RegistrationSession) -> AppResult<()> {
        let ttl = Some(self.state.config.registration_ttl);
        self.state
            .cache
            .set_json(&session_key(session.id), session, ttl)
            .await?;
        if !session.status.is_terminal() {
            self.state
                .cache
                .set_json(&email_key(&session.account.email), &session.id, ttl)
                .await?;
        }
        Ok(())
    }

    async fn staged_for_email(&self, email: &str) -> AppResult<Option<RegistrationSession>> {
        match self.state.cache.get_json::<Uuid>(&email_key(email)).await? {
            Some(id) => Ok(self
                .state
                .cache
                .get_json::<RegistrationSession>(&session_key(id))
                .await?),
            None => Ok(None),
        }
    }

    async fn drop_email_index(&self, session: &RegistrationSession) {
        if let Err(e) = self.state.cache.delete(&email_key(&session.account.email)).await {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to drop registration email index");
        }
    }

    async fn discard(&self, session: &RegistrationSession) {
        if let Err(e) = self.state.cache.delete(&session_key(session.id)).await {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to discard registration");
        }
        self.drop_email_index(session).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::profile::Address;
    use crate::infrastructure::cache::Cache;
    use crate::infrastructure::dataverse::InMemoryDataverse;
    use crate::infrastructure::mailer::MemoryMailer;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        api: Arc<InMemoryDataverse>,
        mailer: Arc<MemoryMailer>,
        service: RegistrationService,
        state: AppState,
    }

    fn harness() -> Harness {
        harness_with_ttl(AppConfig::default().registration_ttl)
    }

    fn harness_with_ttl(registration_ttl: Duration) -> Harness {
        let api = Arc::new(InMemoryDataverse::new());
        let mailer = Arc::new(MemoryMailer::new());
        let config = AppConfig {
            admin_email: "admin@osot.ca".to_string(),
            registration_ttl,
            ..AppConfig::default()
        };
        let state = AppState::new(
            config,
            api.clone(),
            Cache::in_memory(Duration::from_secs(60)),
            mailer.clone(),
        );
        Harness {
            api,
            mailer,
            service: RegistrationService::new(state.clone()),
            state,
        }
    }

    fn request(email: &str) -> RegistrationRequest {
        serde_json::from_value(json!({
            "account": {
                "first_name": "Jane",
                "last_name": "Doe",
                "date_of_birth": "1990-04-12",
                "email": email,
                "mobile_phone": "416-555-0100",
                "password": "Str0ng!Pass",
                "group": "ot",
                "accepted_terms": true
            },
            "address": {
                "street1": "1 Yonge St",
                "city": "Toronto",
                "province": "ON",
                "postal_code": "M5E 1W7",
                "address_type": "home"
            },
            "identity": { "language": "english" },
            "education": {
                "kind": "ot",
                "coto_status": "general",
                "coto_registration": "G1234567",
                "degree_type": "masters",
                "university": "Queen's University",
                "graduation_year": 2012,
                "country": "Canada"
            }
        }))
        .expect("valid request")
    }

    async fn staged_and_verified(h: &Harness, email: &str) -> Uuid {
        let staged = h.service.stage(request(email)).await.unwrap();
        let session = h.service.load(staged.session_id).await.unwrap();
        h.service
            .verify_email(staged.session_id, &session.verification_token)
            .await
            .unwrap();
        staged.session_id
    }

    #[tokio::test]
    async fn stage_hashes_password_and_sends_verification() {
        let h = harness();
        let staged = h.service.stage(request("jane.doe@example.com")).await.unwrap();
        assert_eq!(staged.status, RegistrationStatus::Staged);
        assert_eq!(staged.masked_email, "jan*****@example.com");

        let session = h.service.load(staged.session_id).await.unwrap();
        let hash = session.account.password_hash.as_deref().unwrap();
        assert!(hash.starts_with("$2"));

        let sent = h.mailer.sent_to("jane.doe@example.com").await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains(&session.verification_token));
    }

    #[tokio::test]
    async fn duplicate_staging_is_rejected() {
        let h = harness();
        h.service.stage(request("jane@example.com")).await.unwrap();
        let err = h.service.stage(request("jane@example.com")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmailAlreadyRegistered);
    }

    #[tokio::test]
    async fn email_reservation_lives_as_long_as_the_session() {
        let h = harness_with_ttl(Duration::from_millis(1500));
        let staged = h.service.stage(request("jane@example.com")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let token = h.service.load(staged.session_id).await.unwrap().verification_token;
        h.service.verify_email(staged.session_id, &token).await.unwrap();

        // Past the original reservation, but the verify renewed it
        tokio::time::sleep(Duration::from_millis(800)).await;
        let err = h.service.stage(request("jane@example.com")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmailAlreadyRegistered);
    }

    #[tokio::test]
    async fn approve_fails_when_the_email_already_has_an_account() {
        let h = harness();
        let first = staged_and_verified(&h, "jane@example.com").await;
        h.state
            .cache
            .delete(&email_key("jane@example.com"))
            .await
            .unwrap();
        let second = staged_and_verified(&h, "jane@example.com").await;

        let view = h.service.approve(first, Uuid::new_v4()).await.unwrap();
        assert_eq!(view.status, RegistrationStatus::Completed);

        let view = h.service.approve(second, Uuid::new_v4()).await.unwrap();
        assert_eq!(view.status, RegistrationStatus::Failed);
        assert!(view.created.account_id.is_none());
        assert!(view.last_error.unwrap().contains(&ErrorCode::EmailAlreadyRegistered.to_string()));
        assert_eq!(h.api.row_count(Account::ENTITY_SET).await, 1);
    }

    #[tokio::test]
    async fn verify_checks_token_then_notifies_admin() {
        let h = harness();
        let staged = h.service.stage(request("jane@example.com")).await.unwrap();

        let err = h.service.verify_email(staged.session_id, "nope").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidVerificationToken);

        let token = h.service.load(staged.session_id).await.unwrap().verification_token;
        let view = h.service.verify_email(staged.session_id, &token).await.unwrap();
        assert_eq!(view.status, RegistrationStatus::EmailVerified);
        assert_eq!(h.mailer.sent_to("admin@osot.ca").await.len(), 1);

        let err = h.service.verify_email(staged.session_id, &token).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistrationInvalidState);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let h = harness();
        let err = h.service.get(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistrationNotFound);
    }

    #[tokio::test]
    async fn approve_creates_linked_records() {
        let h = harness();
        let id = staged_and_verified(&h, "jane@example.com").await;

        let view = h.service.approve(id, Uuid::new_v4()).await.unwrap();
        assert_eq!(view.status, RegistrationStatus::Completed);
        assert_eq!(view.attempts, 1);
        assert!(view.created.address_id.is_some());
        assert!(view.created.identity_id.is_some());
        assert!(view.created.education_id.is_some());
        assert!(view.created.contact_id.is_none());

        let account_id = view.created.account_id.unwrap();
        let account = h.state.repo::<Account>().find_by_id(account_id).await.unwrap().unwrap();
        assert_eq!(account.status, AccountStatus::Active);

        let address_id = view.created.address_id.unwrap();
        let address = h.state.repo::<Address>().find_by_id(address_id).await.unwrap().unwrap();
        assert_eq!(address.account_id, Some(account_id));

        assert_eq!(h.mailer.sent_to("jane@example.com").await.last().unwrap().subject, "Welcome to OSOT");
    }

    #[tokio::test]
    async fn approve_requires_verified_email() {
        let h = harness();
        let staged = h.service.stage(request("jane@example.com")).await.unwrap();
        let err = h.service.approve(staged.session_id, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistrationInvalidState);
    }

    #[tokio::test]
    async fn failure_marks_session_and_retry_skips_created_records() {
        let h = harness();
        let id = staged_and_verified(&h, "jane@example.com").await;

        h.api.fail_writes_to(OtEducation::ENTITY_SET).await;
        let view = h.service.approve(id, Uuid::new_v4()).await.unwrap();
        assert_eq!(view.status, RegistrationStatus::Failed);
        assert!(view.last_error.is_some());
        assert!(view.created.account_id.is_some());
        assert!(view.created.education_id.is_none());

        h.api.restore_writes_to(OtEducation::ENTITY_SET).await;
        let view = h.service.retry(id, Uuid::new_v4()).await.unwrap();
        assert_eq!(view.status, RegistrationStatus::Completed);
        assert_eq!(view.attempts, 2);
        assert!(view.last_error.is_none());

        assert_eq!(h.api.row_count(Account::ENTITY_SET).await, 1);
        assert_eq!(h.api.row_count(Address::ENTITY_SET).await, 1);
        assert_eq!(h.api.row_count(OtEducation::ENTITY_SET).await, 1);
    }

    #[tokio::test]
    async fn retry_stops_after_max_attempts() {
        let h = harness();
        let id = staged_and_verified(&h, "jane@example.com").await;
        h.api.fail_writes_to(Account::ENTITY_SET).await;

        h.service.approve(id, Uuid::new_v4()).await.unwrap();
        h.service.retry(id, Uuid::new_v4()).await.unwrap();
        let view = h.service.retry(id, Uuid::new_v4()).await.unwrap();
        assert_eq!(view.status, RegistrationStatus::Failed);
        assert_eq!(view.attempts, 3);

        let err = h.service.retry(id, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistrationInvalidState);
    }

    #[tokio::test]
    async fn retry_requires_failed_session() {
        let h = harness();
        let id = staged_and_verified(&h, "jane@example.com").await;
        let err = h.service.retry(id, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistrationInvalidState);
    }

    #[tokio::test]
    async fn reject_records_reason_and_frees_email() {
        let h = harness();
        let id = staged_and_verified(&h, "jane@example.com").await;

        let view = h.service.reject(id, Uuid::new_v4(), "Incomplete COTO record").await.unwrap();
        assert_eq!(view.status, RegistrationStatus::Rejected);
        assert_eq!(view.rejection_reason.as_deref(), Some("Incomplete COTO record"));

        let sent = h.mailer.sent_to("jane@example.com").await;
        assert!(sent.last().unwrap().body.contains("Incomplete COTO record"));

        assert!(h.service.stage(request("jane@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let h = harness();
        h.service.stage(request("one@example.com")).await.unwrap();
        staged_and_verified(&h, "two@example.com").await;

        assert_eq!(h.service.list(None).await.unwrap().len(), 2);
        let verified = h.service.list(Some(RegistrationStatus::EmailVerified)).await.unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].masked_email, "t**@example.com");
    }
}
