//! Stateless field validators and formatters.
//!
//! Every function is single-pass over one value and returns the normalized
//! form on success, so DTOs can validate and normalize in one step.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, ErrorCode};

/// Schemes that are never accepted in user-supplied links
pub const BLOCKED_URL_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:", "file:", "ftp:"];

const MAX_URL_LEN: usize = 2048;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_EMAIL_LEN: usize = 254;
const MIN_AGE_YEARS: i32 = 16;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):(.?)").expect("valid scheme regex"));

static HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9\-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9\-]*[a-z0-9])?)+$")
        .expect("valid host regex")
});

static POSTAL_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ABCEGHJ-NPRSTVXY][0-9][ABCEGHJ-NPRSTV-Z]) ?([0-9][ABCEGHJ-NPRSTV-Z][0-9])$")
        .expect("valid postal code regex")
});

/// Checks password complexity
///
/// # Rules
/// - 8 to 128 characters
/// - At least one upper case letter, one lower case letter, one digit
/// - At least one special character (anything that is not a letter, digit
///   or whitespace)
pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    let mut missing = Vec::new();

    if len < MIN_PASSWORD_LEN {
        missing.push(format!("at least {} characters", MIN_PASSWORD_LEN));
    }
    if len > MAX_PASSWORD_LEN {
        missing.push(format!("at most {} characters", MAX_PASSWORD_LEN));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        missing.push("an upper case letter".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        missing.push("a lower case letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a number".to_string());
    }
    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        missing.push("a special character".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::with_detail(
            ErrorCode::WeakPassword,
            format!("Password requires {}", missing.join(", ")),
        ))
    }
}

/// Sanitizes a user-supplied web address
///
/// Returns the normalized URL. Addresses without a scheme get `https://`.
/// Only `http` and `https` are accepted; `javascript:`, `data:`,
/// `vbscript:`, `file:` and `ftp:` are rejected even when split by
/// whitespace or control characters.
pub fn sanitize_url(input: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid_url("URL is empty"));
    }
    if trimmed.len() > MAX_URL_LEN {
        return Err(invalid_url("URL is too long"));
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if BLOCKED_URL_SCHEMES
        .iter()
        .any(|scheme| compact.starts_with(scheme))
    {
        return Err(invalid_url("URL scheme is not allowed"));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid_url("URL contains whitespace"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let (scheme, rest) = if lower.starts_with("https://") {
        ("https", &trimmed["https://".len()..])
    } else if lower.starts_with("http://") {
        ("http", &trimmed["http://".len()..])
    } else if lower.contains("://") {
        return Err(invalid_url("Only http and https links are allowed"));
    } else {
        // "host:8080/path" is a port, "mailto:x" is a scheme
        if let Some(caps) = SCHEME_RE.captures(trimmed) {
            let after = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            if !after.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                return Err(invalid_url("Only http and https links are allowed"));
            }
        }
        ("https", trimmed)
    };

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    if authority.contains('@') {
        return Err(invalid_url("URL must not contain credentials"));
    }
    let host = match authority.rsplit_once(':') {
        Some((host, port)) => {
            if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid_url("URL port is invalid"));
            }
            host
        }
        None => authority,
    };
    let host = host.to_ascii_lowercase();
    if !HOST_RE.is_match(&host) {
        return Err(invalid_url("URL host is invalid"));
    }

    let port_and_path = &rest[host.len()..];
    Ok(format!("{}://{}{}", scheme, host, port_and_path))
}

/// Sanitizes an optional URL, treating blank strings as absent
pub fn sanitize_optional_url(input: Option<&str>) -> Result<Option<String>, AppError> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(url) => sanitize_url(url).map(Some),
    }
}

fn invalid_url(detail: &str) -> AppError {
    AppError::with_detail(ErrorCode::InvalidUrl, detail)
}

/// Masks the local part of an email address for display and logs
///
/// Keeps the first three characters of the local part (one when it has two
/// or three characters, none when it has one) and replaces the rest with `*`.
///
/// # Example
/// ```
/// use osot_api::validation::mask_email;
///
/// assert_eq!(mask_email("john.doe@gmail.com"), "joh*****@gmail.com");
/// assert_eq!(mask_email("a@x.ca"), "*@x.ca");
/// ```
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return "***".to_string();
    };

    let len = local.chars().count();
    let visible = match len {
        0 | 1 => 0,
        2 | 3 => 1,
        _ => 3,
    };
    let shown: String = local.chars().take(visible).collect();
    let hidden = "*".repeat(len - visible);

    format!("{}{}@{}", shown, hidden, domain)
}

/// Validates an email address and returns it trimmed and lower-cased
pub fn validate_email(email: &str) -> Result<String, AppError> {
    let normalized = email.trim().to_lowercase();
    if normalized.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(&normalized) {
        return Err(AppError::with_detail(
            ErrorCode::InvalidEmail,
            format!("Invalid email: {}", mask_email(&normalized)),
        ));
    }
    Ok(normalized)
}

/// Validates a North American phone number
///
/// Accepts 10 digits, or 11 digits with a leading country code `1`.
/// Separators ` `, `-`, `.`, `(`, `)` and a leading `+` are allowed.
/// Returns the number formatted as `(xxx) xxx-xxxx`.
pub fn validate_phone(phone: &str) -> Result<String, AppError> {
    let trimmed = phone.trim();
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')' | '+');
    if trimmed.is_empty() || !trimmed.chars().all(allowed) {
        return Err(invalid_phone(trimmed));
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => return Err(invalid_phone(trimmed)),
    };
    if national.starts_with(['0', '1']) {
        return Err(invalid_phone(trimmed));
    }

    Ok(format!(
        "({}) {}-{}",
        &national[..3],
        &national[3..6],
        &national[6..]
    ))
}

/// Validates an optional phone number, treating blank strings as absent
pub fn validate_optional_phone(phone: Option<&str>) -> Result<Option<String>, AppError> {
    match phone.map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) => validate_phone(p).map(Some),
    }
}

fn invalid_phone(phone: &str) -> AppError {
    AppError::with_detail(ErrorCode::InvalidPhone, format!("Invalid phone number: {}", phone))
}

/// Validates a Canadian postal code and returns it as `A1A 1A1`
pub fn validate_postal_code(code: &str) -> Result<String, AppError> {
    let upper = code.trim().to_ascii_uppercase();
    let caps = POSTAL_CODE_RE
        .captures(&upper)
        .ok_or_else(|| AppError::validation(format!("Invalid postal code: {}", code.trim())))?;
    Ok(format!("{} {}", &caps[1], &caps[2]))
}

/// Checks a date of birth: not in the future, after 1900, at least 16 years ago
pub fn validate_birth_date(date_of_birth: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if date_of_birth > today || date_of_birth.year() < 1900 {
        return Err(AppError::with_detail(
            ErrorCode::InvalidDate,
            "Date of birth is out of range",
        ));
    }

    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    if age < MIN_AGE_YEARS {
        return Err(AppError::with_detail(
            ErrorCode::InvalidDate,
            format!("Applicants must be at least {} years old", MIN_AGE_YEARS),
        ));
    }
    Ok(())
}

/// Trims a required text field and checks its length
pub fn required_text(field: &str, value: &str, max_len: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text field; blank becomes `None`
pub fn optional_text(
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => required_text(field, text, max_len).map(Some),
    }
}
