use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::repositories::RepositoryError;
use crate::domain::DomainError;

/// API error type with HTTP status code and message
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Creates a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 401 Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Creates a 403 Forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Creates a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Creates a 409 Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Creates a 500 Internal Server Error
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "Request failed");
        }

        let body = Json(json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        if err.is_conflict() {
            Self::conflict(err.to_string())
        } else {
            Self::bad_request(err.to_string())
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::not_found("Not found"),
            RepositoryError::Conflict(constraint) => {
                Self::conflict(format!("Conflicts with an existing record ({})", constraint))
            }
            RepositoryError::Corrupt(_) | RepositoryError::Database(_) => {
                tracing::error!(error = %err, "Repository failure");
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::organization::OrganizationStatus;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn error_body_shape() {
        let response = ApiError::forbidden("Admin role required").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Admin role required"})
        );
    }

    #[test]
    fn domain_errors_map_to_400_or_409() {
        let err: ApiError = DomainError::InvalidSlug("'A'".to_string()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = DomainError::InvalidTransition {
            from: OrganizationStatus::Archived,
            to: OrganizationStatus::Active,
        }
        .into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.message, "Cannot change organization status from archived to active");
    }

    #[tokio::test]
    async fn repository_failures_hide_details() {
        let err: ApiError = RepositoryError::Corrupt("account 1: Invalid email".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(err.into_response()).await;
        assert_eq!(body["error"], "Internal server error");

        let err: ApiError = RepositoryError::Conflict("accounts_email_key".to_string()).into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError = RepositoryError::NotFound.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
