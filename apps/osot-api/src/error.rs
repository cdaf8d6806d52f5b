//! Application error codes shared by every OSOT endpoint
//!
//! Codes are grouped by range: 1xxx account, 2xxx validation, 3xxx permission,
//! 4xxx external services, 5xxx application and education

use axum::http::StatusCode;
use std::fmt;

/// Flat numeric error code space returned to API clients
///
/// The numeric value, the `SCREAMING_SNAKE` name and the user-facing message
/// are part of the public contract; the frontend maps them to notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Account (1001-1010)
    AccountNotFound,
    EmailAlreadyRegistered,
    InvalidCredentials,
    AccountLocked,
    AccountInactive,
    SessionExpired,
    AccountPendingApproval,
    RegistrationNotFound,
    RegistrationInvalidState,
    InvalidVerificationToken,

    // Validation (2001-2007)
    ValidationFailed,
    InvalidEmail,
    WeakPassword,
    InvalidPhone,
    InvalidUrl,
    InvalidDate,
    InvalidOrderTotal,

    // Permission (3001-3004)
    MissingToken,
    InvalidToken,
    InsufficientPrivilege,
    RecordAccessDenied,

    // External services (4001-4004)
    DataPlatformUnavailable,
    DataPlatformRequestFailed,
    CacheUnavailable,
    EmailDeliveryFailed,

    // Application (5001-5004) and education (5101-5103)
    InternalError,
    ResourceNotFound,
    ResourceConflict,
    InvalidStatusTransition,
    EducationNotFound,
    EducationCategoryMismatch,
    InvalidGraduationYear,
}

impl ErrorCode {
    /// Numeric code sent to clients
    pub fn code(&self) -> u16 {
        use ErrorCode::*;
        match self {
            AccountNotFound => 1001,
            EmailAlreadyRegistered => 1002,
            InvalidCredentials => 1003,
            AccountLocked => 1004,
            AccountInactive => 1005,
            SessionExpired => 1006,
            AccountPendingApproval => 1007,
            RegistrationNotFound => 1008,
            RegistrationInvalidState => 1009,
            InvalidVerificationToken => 1010,

            ValidationFailed => 2001,
            InvalidEmail => 2002,
            WeakPassword => 2003,
            InvalidPhone => 2004,
            InvalidUrl => 2005,
            InvalidDate => 2006,
            InvalidOrderTotal => 2007,

            MissingToken => 3001,
            InvalidToken => 3002,
            InsufficientPrivilege => 3003,
            RecordAccessDenied => 3004,

            DataPlatformUnavailable => 4001,
            DataPlatformRequestFailed => 4002,
            CacheUnavailable => 4003,
            EmailDeliveryFailed => 4004,

            InternalError => 5001,
            ResourceNotFound => 5002,
            ResourceConflict => 5003,
            InvalidStatusTransition => 5004,
            EducationNotFound => 5101,
            EducationCategoryMismatch => 5102,
            InvalidGraduationYear => 5103,
        }
    }

    /// Stable machine-readable name
    pub fn name(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            AccountNotFound => "ACCOUNT_NOT_FOUND",
            EmailAlreadyRegistered => "EMAIL_ALREADY_REGISTERED",
            InvalidCredentials => "INVALID_CREDENTIALS",
            AccountLocked => "ACCOUNT_LOCKED",
            AccountInactive => "ACCOUNT_INACTIVE",
            SessionExpired => "SESSION_EXPIRED",
            AccountPendingApproval => "ACCOUNT_PENDING_APPROVAL",
            RegistrationNotFound => "REGISTRATION_NOT_FOUND",
            RegistrationInvalidState => "REGISTRATION_INVALID_STATE",
            InvalidVerificationToken => "INVALID_VERIFICATION_TOKEN",

            ValidationFailed => "VALIDATION_FAILED",
            InvalidEmail => "INVALID_EMAIL",
            WeakPassword => "WEAK_PASSWORD",
            InvalidPhone => "INVALID_PHONE",
            InvalidUrl => "INVALID_URL",
            InvalidDate => "INVALID_DATE",
            InvalidOrderTotal => "INVALID_ORDER_TOTAL",

            MissingToken => "MISSING_TOKEN",
            InvalidToken => "INVALID_TOKEN",
            InsufficientPrivilege => "INSUFFICIENT_PRIVILEGE",
            RecordAccessDenied => "RECORD_ACCESS_DENIED",

            DataPlatformUnavailable => "DATA_PLATFORM_UNAVAILABLE",
            DataPlatformRequestFailed => "DATA_PLATFORM_REQUEST_FAILED",
            CacheUnavailable => "CACHE_UNAVAILABLE",
            EmailDeliveryFailed => "EMAIL_DELIVERY_FAILED",

            InternalError => "INTERNAL_ERROR",
            ResourceNotFound => "RESOURCE_NOT_FOUND",
            ResourceConflict => "RESOURCE_CONFLICT",
            InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            EducationNotFound => "EDUCATION_NOT_FOUND",
            EducationCategoryMismatch => "EDUCATION_CATEGORY_MISMATCH",
            InvalidGraduationYear => "INVALID_GRADUATION_YEAR",
        }
    }

    /// User-facing message
    pub fn message(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            AccountNotFound => "Account not found.",
            EmailAlreadyRegistered => "An account with this email already exists.",
            InvalidCredentials => "Invalid email or password.",
            AccountLocked => "Your account is locked. Please try again later or contact support.",
            AccountInactive => "Your account is inactive. Please contact support.",
            SessionExpired => "Your session has expired. Please sign in again.",
            AccountPendingApproval => "Your account is awaiting administrator approval.",
            RegistrationNotFound => "Registration not found or expired.",
            RegistrationInvalidState => "This registration cannot be processed in its current state.",
            InvalidVerificationToken => "The verification link is invalid.",

            ValidationFailed => "Some fields are invalid.",
            InvalidEmail => "Please enter a valid email address.",
            WeakPassword => "Password must be at least 8 characters and include upper case, lower case, a number and a special character.",
            InvalidPhone => "Please enter a valid phone number.",
            InvalidUrl => "Please enter a valid web address.",
            InvalidDate => "Please enter a valid date.",
            InvalidOrderTotal => "Order totals do not match the line items.",

            MissingToken => "Authentication is required.",
            InvalidToken => "Your credentials are invalid. Please sign in again.",
            InsufficientPrivilege => "You do not have permission to perform this action.",
            RecordAccessDenied => "You do not have access to this record.",

            DataPlatformUnavailable => "The membership service is temporarily unavailable.",
            DataPlatformRequestFailed => "The membership service rejected the request.",
            CacheUnavailable => "The service is temporarily unavailable.",
            EmailDeliveryFailed => "We could not send the email. Please try again later.",

            InternalError => "An unexpected error occurred.",
            ResourceNotFound => "The requested record was not found.",
            ResourceConflict => "A matching record already exists.",
            InvalidStatusTransition => "This status change is not allowed.",
            EducationNotFound => "Education record not found.",
            EducationCategoryMismatch => "The education type does not match the account group.",
            InvalidGraduationYear => "Please enter a valid graduation year.",
        }
    }

    /// HTTP status the code is served with
    pub fn status(&self) -> StatusCode {
        use ErrorCode::*;
        match self {
            AccountNotFound | RegistrationNotFound | ResourceNotFound | EducationNotFound => {
                StatusCode::NOT_FOUND
            }
            EmailAlreadyRegistered
            | RegistrationInvalidState
            | ResourceConflict
            | InvalidStatusTransition => StatusCode::CONFLICT,
            InvalidCredentials | SessionExpired | MissingToken | InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AccountLocked => StatusCode::LOCKED,
            AccountInactive | AccountPendingApproval | InsufficientPrivilege
            | RecordAccessDenied => StatusCode::FORBIDDEN,
            InvalidVerificationToken
            | ValidationFailed
            | InvalidEmail
            | WeakPassword
            | InvalidPhone
            | InvalidUrl
            | InvalidDate
            | InvalidOrderTotal
            | InvalidGraduationYear => StatusCode::BAD_REQUEST,
            EducationCategoryMismatch => StatusCode::UNPROCESSABLE_ENTITY,
            DataPlatformUnavailable | CacheUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            DataPlatformRequestFailed | EmailDeliveryFailed => StatusCode::BAD_GATEWAY,
            InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Codes after which the client must drop its session and go to sign-in
    pub fn force_logout(&self) -> bool {
        matches!(self, ErrorCode::SessionExpired | ErrorCode::AccountLocked)
    }

    /// Whether the error detail is safe to return to the client
    ///
    /// External service and internal failures carry upstream messages that
    /// are only logged.
    pub fn exposes_detail(&self) -> bool {
        !matches!(
            self,
            ErrorCode::DataPlatformUnavailable
                | ErrorCode::DataPlatformRequestFailed
                | ErrorCode::CacheUnavailable
                | ErrorCode::EmailDeliveryFailed
                | ErrorCode::InternalError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Error carried through services and handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub code: ErrorCode,
    pub detail: Option<String>,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.detail.as_deref().unwrap_or(self.code.message());
        write!(f, "{}: {}", self.code, text)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Creates an error with the code's default message only
    pub fn new(code: ErrorCode) -> Self {
        Self { code, detail: None }
    }

    /// Creates an error with an extra detail message
    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: Some(detail.into()),
        }
    }

    /// Shorthand for a 2001 field validation failure
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorCode::ValidationFailed, detail)
    }

    /// Shorthand for a 5002 missing record
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::with_detail(
            ErrorCode::ResourceNotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Shorthand for a 5001 internal failure
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorCode::InternalError, detail)
    }
}

impl From<ErrorCode> for AppError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ErrorCode] = &[
        ErrorCode::AccountNotFound,
        ErrorCode::EmailAlreadyRegistered,
        ErrorCode::InvalidCredentials,
        ErrorCode::AccountLocked,
        ErrorCode::AccountInactive,
        ErrorCode::SessionExpired,
        ErrorCode::AccountPendingApproval,
        ErrorCode::RegistrationNotFound,
        ErrorCode::RegistrationInvalidState,
        ErrorCode::InvalidVerificationToken,
        ErrorCode::ValidationFailed,
        ErrorCode::InvalidEmail,
        ErrorCode::WeakPassword,
        ErrorCode::InvalidPhone,
        ErrorCode::InvalidUrl,
        ErrorCode::InvalidDate,
        ErrorCode::InvalidOrderTotal,
        ErrorCode::MissingToken,
        ErrorCode::InvalidToken,
        ErrorCode::InsufficientPrivilege,
        ErrorCode::RecordAccessDenied,
        ErrorCode::DataPlatformUnavailable,
        ErrorCode::DataPlatformRequestFailed,
        ErrorCode::CacheUnavailable,
        ErrorCode::EmailDeliveryFailed,
        ErrorCode::InternalError,
        ErrorCode::ResourceNotFound,
        ErrorCode::ResourceConflict,
        ErrorCode::InvalidStatusTransition,
        ErrorCode::EducationNotFound,
        ErrorCode::EducationCategoryMismatch,
        ErrorCode::InvalidGraduationYear,
    ];

    #[test]
    fn codes_are_unique() {
        let mut codes: Vec<u16> = ALL.iter().map(|c| c.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ALL.len());
    }

    #[test]
    fn codes_stay_in_their_ranges() {
        assert!((1001..=1010).contains(&ErrorCode::AccountNotFound.code()));
        assert!((1001..=1010).contains(&ErrorCode::InvalidVerificationToken.code()));
        assert!((2001..=2007).contains(&ErrorCode::InvalidOrderTotal.code()));
        assert!((3001..=3004).contains(&ErrorCode::RecordAccessDenied.code()));
        assert!((4001..=4004).contains(&ErrorCode::EmailDeliveryFailed.code()));
        assert!((5001..=5103).contains(&ErrorCode::InvalidGraduationYear.code()));
    }

    #[test]
    fn only_session_expired_and_locked_force_logout() {
        let forcing: Vec<_> = ALL.iter().filter(|c| c.force_logout()).collect();
        assert_eq!(
            forcing,
            vec![&ErrorCode::AccountLocked, &ErrorCode::SessionExpired]
        );
    }

    #[test]
    fn external_failures_hide_detail() {
        assert!(!ErrorCode::DataPlatformRequestFailed.exposes_detail());
        assert!(!ErrorCode::InternalError.exposes_detail());
        assert!(ErrorCode::ValidationFailed.exposes_detail());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ErrorCode::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::AccountLocked.status(), StatusCode::LOCKED);
        assert_eq!(ErrorCode::EmailAlreadyRegistered.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::DataPlatformUnavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::WeakPassword.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn display_uses_detail_when_present() {
        let err = AppError::validation("first_name is required");
        assert_eq!(err.to_string(), "VALIDATION_FAILED (2001): first_name is required");

        let err = AppError::new(ErrorCode::InvalidCredentials);
        assert_eq!(
            err.to_string(),
            "INVALID_CREDENTIALS (1003): Invalid email or password."
        );
    }
}
