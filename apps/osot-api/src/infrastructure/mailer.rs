use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::error::{AppError, ErrorCode};
use crate::validation::mask_email;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        AppError::with_detail(ErrorCode::EmailDeliveryFailed, err.to_string())
    }
}

/// Outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    /// Asks a new registrant to confirm their address
    pub fn verification(to: &str, first_name: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Confirm your OSOT registration".to_string(),
            body: format!(
                "Hello {},\n\nPlease confirm your email address to continue your registration:\n{}\n\n\
                 The link expires in 72 hours.",
                first_name, link
            ),
        }
    }

    /// Tells administrators a verified registration is waiting for review
    pub fn review_needed(to: &str, applicant: &str, masked_email: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("Registration awaiting review: {}", applicant),
            body: format!(
                "{} ({}) has verified their email and is waiting for approval.\n\nReview: {}",
                applicant, masked_email, link
            ),
        }
    }

    pub fn welcome(to: &str, first_name: &str, login_link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Welcome to OSOT".to_string(),
            body: format!(
                "Hello {},\n\nYour registration has been approved. You can sign in at {}",
                first_name, login_link
            ),
        }
    }

    pub fn rejected(to: &str, first_name: &str, reason: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Your OSOT registration".to_string(),
            body: format!(
                "Hello {},\n\nWe were unable to approve your registration.\n\nReason: {}",
                first_name, reason
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        tracing::info!(
            to = %mask_email(&email.to),
            subject = %email.subject,
            "Email queued (log only)"
        );
        tracing::debug!(body = %email.body, "Email body");
        Ok(())
    }
}

/// Posts messages as JSON `{to, subject, body}` to a delivery webhook
pub struct WebhookMailer {
    http: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let response = self
            .http
            .post(&self.url)
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Delivery(format!("webhook returned {}", status)));
        }

        tracing::info!(to = %mask_email(&email.to), subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Keeps sent messages in memory for inspection
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    /// Messages addressed to `to`, oldest first
    pub async fn sent_to(&self, to: &str) -> Vec<Email> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|email| email.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn templates_include_links() {
        let email = Email::verification("a@b.ca", "Ada", "https://osot.ca/verify?t=1");
        assert!(email.body.contains("https://osot.ca/verify?t=1"));
        assert!(email.body.contains("Ada"));

        let email = Email::review_needed("admin@osot.ca", "Ada Lovelace", "ada*****@b.ca", "x");
        assert!(email.subject.contains("Ada Lovelace"));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let email = Email::welcome("a@b.ca", "Ada", "https://osot.ca");
        assert!(LogMailer.send(&email).await.is_ok());
    }

    #[tokio::test]
    async fn memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        mailer.send(&Email::welcome("a@b.ca", "Ada", "x")).await.unwrap();
        mailer.send(&Email::welcome("c@d.ca", "Cy", "x")).await.unwrap();
        assert_eq!(mailer.sent().await.len(), 2);
        assert_eq!(mailer.sent_to("c@d.ca").await[0].subject, "Welcome to OSOT");
    }

    #[tokio::test]
    async fn webhook_posts_json() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/mail")
                    .json_body(json!({"to": "a@b.ca", "subject": "Hi", "body": "Body"}));
                then.status(202);
            })
            .await;

        let mailer = WebhookMailer::new(server.url("/mail"));
        let email = Email {
            to: "a@b.ca".to_string(),
            subject: "Hi".to_string(),
            body: "Body".to_string(),
        };
        mailer.send(&email).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_failure_maps_to_delivery_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/mail");
                then.status(500);
            })
            .await;

        let mailer = WebhookMailer::new(server.url("/mail"));
        let err = mailer
            .send(&Email::rejected("a@b.ca", "Ada", "incomplete"))
            .await
            .unwrap_err();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::EmailDeliveryFailed);
    }
}
