use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::AppError;

/// Error body sent to clients
///
/// ```json
/// {"error": {"code": 1003, "type": "INVALID_CREDENTIALS",
///            "message": "Invalid email or password.", "force_logout": false}}
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: u16,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub force_logout: bool,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        let detail = if err.code.exposes_detail() {
            err.detail.clone()
        } else {
            None
        };
        Self {
            error: ErrorPayload {
                code: err.code.code(),
                kind: err.code.name(),
                message: err.code.message(),
                detail,
                force_logout: err.code.force_logout(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        if status.is_server_error() {
            tracing::error!(code = self.code.code(), error = %self, "Request failed");
        } else if !self.code.exposes_detail() {
            tracing::warn!(code = self.code.code(), error = %self, "Request failed");
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::debug!(code = self.code.code(), "Request refused");
        }

        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn body_carries_code_and_flags() {
        let body = ErrorBody::from(&AppError::new(ErrorCode::SessionExpired));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({"error": {
                "code": 1006,
                "type": "SESSION_EXPIRED",
                "message": "Your session has expired. Please sign in again.",
                "force_logout": true
            }})
        );
    }

    #[test]
    fn validation_detail_is_returned() {
        let body = ErrorBody::from(&AppError::validation("city is required"));
        assert_eq!(body.error.detail.as_deref(), Some("city is required"));
    }

    #[test]
    fn upstream_detail_is_hidden() {
        let err = AppError::with_detail(ErrorCode::DataPlatformRequestFailed, "column osot_x missing");
        assert!(ErrorBody::from(&err).error.detail.is_none());
    }

    #[test]
    fn response_uses_code_status() {
        let response = AppError::new(ErrorCode::AccountLocked).into_response();
        assert_eq!(response.status(), StatusCode::LOCKED);
    }
}
