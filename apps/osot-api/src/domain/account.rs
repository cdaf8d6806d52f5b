use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::record::{Access, Record, Validate};
use crate::error::AppError;
use crate::validation::{
    required_text, validate_birth_date, validate_email, validate_optional_phone,
};

/// Professional group an account registers under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountGroup {
    /// Occupational therapist
    Ot,
    /// Occupational therapist assistant
    Ota,
    Vendor,
    Other,
}

/// Lifecycle status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
    /// Created by a registration, not yet usable
    Pending,
    Locked,
}

/// Access level carried in tokens
///
/// # Ranking
/// ```text
/// Owner < Admin < Main
/// ```
/// `Owner` is a member acting on their own records; `Admin` and `Main` are
/// association staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Owner,
    Admin,
    Main,
}

impl Privilege {
    /// Whether this privilege is staff level
    pub fn is_staff(&self) -> bool {
        *self >= Privilege::Admin
    }

    /// Whether this privilege satisfies `required`
    ///
    /// # Example
    /// ```
    /// use osot_api::domain::account::Privilege;
    ///
    /// assert!(Privilege::Main.allows(Privilege::Admin));
    /// assert!(!Privilege::Owner.allows(Privilege::Admin));
    /// ```
    pub fn allows(&self, required: Privilege) -> bool {
        *self >= required
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Privilege::Owner => write!(f, "owner"),
            Privilege::Admin => write!(f, "admin"),
            Privilege::Main => write!(f, "main"),
        }
    }
}

/// Member account row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Platform-generated public number, e.g. `osot-0001234`
    pub account_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
    pub mobile_phone: Option<String>,
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    pub group: AccountGroup,
    pub status: AccountStatus,
    pub privilege: Privilege,
    #[serde(default)]
    pub accepted_terms: bool,
    pub created_on: Option<DateTime<Utc>>,
    pub modified_on: Option<DateTime<Utc>>,
}

impl Account {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Account creation payload, written by the registration workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDraft {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
    pub mobile_phone: Option<String>,
    pub password_hash: Option<String>,
    pub group: AccountGroup,
    pub status: AccountStatus,
    pub privilege: Privilege,
    pub accepted_terms: bool,
}

impl Validate for AccountDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        self.first_name = required_text("first_name", &self.first_name, 100)?;
        self.last_name = required_text("last_name", &self.last_name, 100)?;
        self.email = validate_email(&self.email)?;
        self.mobile_phone = validate_optional_phone(self.mobile_phone.as_deref())?;
        if let Some(dob) = self.date_of_birth {
            validate_birth_date(dob, Utc::now().date_naive())?;
        }
        if !self.accepted_terms {
            return Err(AppError::validation("Terms and conditions must be accepted"));
        }
        Ok(())
    }
}

/// Partial account update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privilege: Option<Privilege>,
}

impl AccountPatch {
    /// Whether the patch changes fields reserved to staff
    pub fn touches_staff_fields(&self) -> bool {
        self.status.is_some() || self.privilege.is_some()
    }
}

impl Validate for AccountPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(name) = &self.first_name {
            self.first_name = Some(required_text("first_name", name, 100)?);
        }
        if let Some(name) = &self.last_name {
            self.last_name = Some(required_text("last_name", name, 100)?);
        }
        if let Some(email) = &self.email {
            self.email = Some(validate_email(email)?);
        }
        if let Some(phone) = &self.mobile_phone {
            self.mobile_phone = validate_optional_phone(Some(phone.as_str()))?;
        }
        if let Some(dob) = self.date_of_birth {
            validate_birth_date(dob, Utc::now().date_naive())?;
        }
        Ok(())
    }
}

impl Record for Account {
    type Draft = AccountDraft;
    type Patch = AccountPatch;

    const RESOURCE: &'static str = "accounts";
    const ACCESS: Access = Access::OwnedStaffWrite;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        Some(self.id)
    }
}
