use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::query::ODataQuery;
use crate::error::{AppError, ErrorCode};

/// Seconds before expiry at which a cached access token is refreshed
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Page size requested from the platform
const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Error)]
pub enum DataverseError {
    #[error("record not found")]
    NotFound,

    #[error("platform refused the credentials: {0}")]
    Unauthorized(String),

    #[error("platform unavailable: {0}")]
    Unavailable(String),

    #[error("platform rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected platform response: {0}")]
    InvalidResponse(String),
}

impl From<DataverseError> for AppError {
    fn from(err: DataverseError) -> Self {
        let code = match err {
            DataverseError::NotFound => ErrorCode::ResourceNotFound,
            DataverseError::Unavailable(_) => ErrorCode::DataPlatformUnavailable,
            DataverseError::Unauthorized(_)
            | DataverseError::Rejected { .. }
            | DataverseError::InvalidResponse(_) => ErrorCode::DataPlatformRequestFailed,
        };
        AppError::with_detail(code, err.to_string())
    }
}

impl From<reqwest::Error> for DataverseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DataverseError::InvalidResponse(err.to_string())
        } else {
            DataverseError::Unavailable(err.to_string())
        }
    }
}

/// An entity set and its primary key column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    pub set: &'static str,
    pub id_column: &'static str,
}

/// Row-level access to the data platform
///
/// Rows are JSON objects keyed by platform column names.
#[async_trait]
pub trait DataverseApi: Send + Sync {
    async fn retrieve(&self, table: TableRef, id: Uuid) -> Result<Value, DataverseError>;

    async fn query(&self, table: TableRef, query: &ODataQuery) -> Result<Vec<Value>, DataverseError>;

    /// Creates a row and returns it as stored
    async fn create(&self, table: TableRef, row: &Value) -> Result<Value, DataverseError>;

    /// Updates an existing row and returns it as stored
    async fn update(&self, table: TableRef, id: Uuid, row: &Value) -> Result<Value, DataverseError>;

    async fn delete(&self, table: TableRef, id: Uuid) -> Result<(), DataverseError>;
}

/// OAuth2 client-credentials settings
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct CollectionPage {
    value: Vec<Value>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Web API client for the data platform
///
/// Client secrets and tokens are never logged.
pub struct DataverseClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<ClientCredentials>,
    token: RwLock<Option<CachedToken>>,
}

impl DataverseClient {
    /// `base_url` is the Web API root, e.g. `https://org.crm3.dynamics.com/api/data/v9.2`
    pub fn new(base_url: String, credentials: Option<ClientCredentials>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            credentials,
            token: RwLock::new(None),
        }
    }

    fn collection_url(&self, table: TableRef) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), table.set)
    }

    fn row_url(&self, table: TableRef, id: Uuid) -> String {
        format!("{}({})", self.collection_url(table), id)
    }

    /// Returns a bearer token, fetching a new one when the cached token is
    /// close to expiry
    async fn access_token(&self) -> Result<Option<String>, DataverseError> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        let now = Utc::now();
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh(now) {
                return Ok(Some(token.value.clone()));
            }
        }

        let mut cached = self.token.write().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now) {
                return Ok(Some(token.value.clone()));
            }
        }

        tracing::debug!(token_url = %credentials.token_url, "Requesting data platform access token");
        let response = self
            .http
            .post(&credentials.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("scope", credentials.scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                DataverseError::Unavailable(format!("token endpoint returned {}", status))
            } else {
                DataverseError::Unauthorized(format!("token endpoint returned {}: {}", status, message))
            });
        }

        let token: TokenResponse = response.json().await?;
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });
        Ok(Some(value))
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, DataverseError> {
        let mut builder = self
            .http
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0");
        if let Some(token) = self.access_token().await? {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, DataverseError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = platform_message(&body).unwrap_or(body);
        tracing::warn!(status = status.as_u16(), %message, "Data platform request failed");

        Err(match status {
            StatusCode::NOT_FOUND => DataverseError::NotFound,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                DataverseError::Unauthorized(message)
            }
            s if s.is_server_error() => DataverseError::Unavailable(message),
            s => DataverseError::Rejected {
                status: s.as_u16(),
                message,
            },
        })
    }
}

/// Extracts `error.message` from a platform error body
fn platform_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl DataverseApi for DataverseClient {
    async fn retrieve(&self, table: TableRef, id: Uuid) -> Result<Value, DataverseError> {
        let builder = self.request(Method::GET, &self.row_url(table, id)).await?;
        let response = self.send(builder).await?;
        Ok(response.json().await?)
    }

    async fn query(&self, table: TableRef, query: &ODataQuery) -> Result<Vec<Value>, DataverseError> {
        let limit = query.top.map(|t| t as usize);
        let page_size = query.top.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);

        let builder = self
            .request(Method::GET, &self.collection_url(table))
            .await?
            .query(&query.to_params())
            .header("Prefer", format!("odata.maxpagesize={}", page_size));
        let mut page: CollectionPage = self.send(builder).await?.json().await?;

        let mut rows = Vec::new();
        loop {
            rows.append(&mut page.value);
            if limit.is_some_and(|limit| rows.len() >= limit) {
                break;
            }
            let Some(next) = page.next_link.take() else {
                break;
            };
            tracing::debug!(set = table.set, fetched = rows.len(), "Following nextLink");
            let builder = self
                .request(Method::GET, &next)
                .await?
                .header("Prefer", format!("odata.maxpagesize={}", page_size));
            page = self.send(builder).await?.json().await?;
        }

        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn create(&self, table: TableRef, row: &Value) -> Result<Value, DataverseError> {
        let builder = self
            .request(Method::POST, &self.collection_url(table))
            .await?
            .header("Prefer", "return=representation")
            .json(row);
        let response = self.send(builder).await?;
        Ok(response.json().await?)
    }

    async fn update(&self, table: TableRef, id: Uuid, row: &Value) -> Result<Value, DataverseError> {
        let builder = self
            .request(Method::PATCH, &self.row_url(table, id))
            .await?
            .header("Prefer", "return=representation")
            .header(header::IF_MATCH, "*")
            .json(row);
        let response = self.send(builder).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, table: TableRef, id: Uuid) -> Result<(), DataverseError> {
        let builder = self.request(Method::DELETE, &self.row_url(table, id)).await?;
        self.send(builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_codes() {
        let err: AppError = DataverseError::NotFound.into();
        assert_eq!(err.code, ErrorCode::ResourceNotFound);

        let err: AppError = DataverseError::Unavailable("timeout".to_string()).into();
        assert_eq!(err.code, ErrorCode::DataPlatformUnavailable);

        let err: AppError = DataverseError::Rejected {
            status: 400,
            message: "bad column".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::DataPlatformRequestFailed);
    }

    #[test]
    fn token_freshness_uses_margin() {
        let now = Utc::now();
        let token = CachedToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(61),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::seconds(2)));
    }

    #[test]
    fn platform_message_reads_error_body() {
        let body = r#"{"error":{"code":"0x80040217","message":"Does Not Exist"}}"#;
        assert_eq!(platform_message(body).as_deref(), Some("Does Not Exist"));
        assert_eq!(platform_message("<html>"), None);
    }

    #[test]
    fn urls_use_entity_set_and_key() {
        let client = DataverseClient::new("https://org.example.com/api/data/v9.2/".to_string(), None);
        let table = TableRef {
            set: "osot_table_accounts",
            id_column: "osot_table_accountid",
        };
        let id = Uuid::nil();
        assert_eq!(
            client.row_url(table, id),
            "https://org.example.com/api/data/v9.2/osot_table_accounts(00000000-0000-0000-0000-000000000000)"
        );
    }
}
