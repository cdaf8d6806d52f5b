use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::DomainError;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// Email value object representing a valid email address
///
/// # Invariants
/// - Must contain '@' character
/// - Must be at least 3 characters long
/// - Stored trimmed and lower-cased
/// - Is immutable after construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Creates a new Email value object
    ///
    /// # Example
    /// ```
    /// use portal_api::domain::account::Email;
    ///
    /// let email = Email::new(" Test@Example.com ").expect("valid email");
    /// assert_eq!(email.as_str(), "test@example.com");
    /// ```
    pub fn new(email: impl AsRef<str>) -> Result<Self, DomainError> {
        let email = email.as_ref().trim().to_lowercase();
        if Self::is_valid(&email) {
            Ok(Email(email))
        } else {
            Err(DomainError::InvalidEmail(mask(&email)))
        }
    }

    fn is_valid(email: &str) -> bool {
        email.contains('@') && email.len() >= 3 && !email.chars().any(char::is_whitespace)
    }

    /// Returns the email as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked form for logs, e.g. `joh*****@gmail.com`
    pub fn masked(&self) -> String {
        mask(&self.0)
    }
}

/// Keeps the first three characters of the local part (one when it is short)
fn mask(email: &str) -> String {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return "***".to_string();
    };
    let len = local.chars().count();
    let visible = if len > 3 { 3 } else { len.min(1) };
    let shown: String = local.chars().take(visible).collect();
    format!("{}{}@{}", shown, "*".repeat(len - visible), domain)
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plaintext password that passed the strength rules
///
/// Only lives long enough to be hashed; `Debug` never prints it.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    /// Checks length, upper case, lower case, digit and special character
    pub fn new(password: impl Into<String>) -> Result<Self, DomainError> {
        let password = password.into();
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
            missing.push("a digit".to_string());
        }
        if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
            missing.push("a special character".to_string());
        }

        if missing.is_empty() {
            Ok(Password(password))
        } else {
            Err(DomainError::WeakPassword(missing.join(", ")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Portal role carried in tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Admin,
    Member,
}

impl AccountRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, AccountRole::Admin)
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRole::Admin => write!(f, "admin"),
            AccountRole::Member => write!(f, "member"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email() {
        assert!(Email::new("test@example.com").is_ok());
    }

    #[test]
    fn valid_email_minimum_length() {
        assert!(Email::new("a@b").is_ok());
    }

    #[test]
    fn email_is_normalized() {
        let email = Email::new("  John.Doe@Gmail.COM ").unwrap();
        assert_eq!(email.as_str(), "john.doe@gmail.com");
    }

    #[test]
    fn invalid_email_no_at_symbol() {
        assert!(Email::new("invalid").is_err());
    }

    #[test]
    fn invalid_email_too_short() {
        assert!(Email::new("a@").is_err());
    }

    #[test]
    fn invalid_email_with_inner_space() {
        assert!(Email::new("john doe@example.com").is_err());
    }

    #[test]
    fn masked_email() {
        let email = Email::new("john.doe@gmail.com").unwrap();
        assert_eq!(email.masked(), "joh*****@gmail.com");

        let short = Email::new("ab@x.ca").unwrap();
        assert_eq!(short.masked(), "a*@x.ca");
    }

    #[test]
    fn email_deserializes_through_validation() {
        let email: Email = serde_json::from_str("\"Ada@Example.com\"").unwrap();
        assert_eq!(email.as_str(), "ada@example.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }

    #[test]
    fn strong_password_accepted() {
        assert!(Password::new("Str0ng!Pass").is_ok());
    }

    #[test]
    fn password_without_digit_fails() {
        let err = Password::new("NoDigits!here").unwrap_err();
        assert_eq!(err, DomainError::WeakPassword("a digit".to_string()));
    }

    #[test]
    fn short_password_lists_every_missing_rule() {
        let err = Password::new("abc").unwrap_err().to_string();
        assert!(err.contains("at least 8 characters"));
        assert!(err.contains("an upper case letter"));
        assert!(err.contains("a special character"));
    }

    #[test]
    fn password_debug_is_redacted() {
        let password = Password::new("Str0ng!Pass").unwrap();
        assert_eq!(format!("{:?}", password), "Password(***)");
    }

    #[test]
    fn role_display() {
        assert_eq!(AccountRole::Admin.to_string(), "admin");
        assert_eq!(AccountRole::Member.to_string(), "member");
        assert!(AccountRole::Admin.is_admin());
        assert!(!AccountRole::Member.is_admin());
    }
}
