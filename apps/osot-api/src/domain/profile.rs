//! Member profile records: address, contact details and identity
//!
//! Each record belongs to one account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{Access, FieldFilter, Record, Validate};
use crate::error::AppError;
use crate::validation::{
    optional_text, required_text, sanitize_optional_url, validate_email, validate_optional_phone,
    validate_postal_code,
};

const PROVINCES: &[&str] = &[
    "AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU", "ON", "PE", "QC", "SK", "YT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Home,
    Work,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
    pub address_type: AddressType,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    pub street1: String,
    #[serde(default)]
    pub street2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub address_type: AddressType,
}

fn default_country() -> String {
    "Canada".to_string()
}

fn is_canada(country: &str) -> bool {
    matches!(country.trim().to_ascii_lowercase().as_str(), "canada" | "ca")
}

/// Validates province and postal code together; Canadian values are normalized
fn check_region(country: &str, province: &str, postal_code: &str) -> Result<(String, String), AppError> {
    if is_canada(country) {
        let province = province.trim().to_ascii_uppercase();
        if !PROVINCES.contains(&province.as_str()) {
            return Err(AppError::validation(format!("Unknown province: {}", province)));
        }
        Ok((province, validate_postal_code(postal_code)?))
    } else {
        Ok((
            required_text("province", province, 100)?,
            required_text("postal_code", postal_code, 20)?,
        ))
    }
}

impl Validate for AddressDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        self.street1 = required_text("street1", &self.street1, 200)?;
        self.street2 = optional_text("street2", self.street2.as_deref(), 200)?;
        self.city = required_text("city", &self.city, 100)?;
        self.country = required_text("country", &self.country, 100)?;
        let (province, postal_code) = check_region(&self.country, &self.province, &self.postal_code)?;
        self.province = province;
        self.postal_code = postal_code;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_type: Option<AddressType>,
}

impl Validate for AddressPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(street) = &self.street1 {
            self.street1 = Some(required_text("street1", street, 200)?);
        }
        if let Some(street) = &self.street2 {
            self.street2 = optional_text("street2", Some(street.as_str()), 200)?;
        }
        if let Some(city) = &self.city {
            self.city = Some(required_text("city", city, 100)?);
        }
        // Province and postal code are only checked as a pair; a patch without
        // a country is assumed to stay in Canada
        let country = self.country.clone().unwrap_or_else(default_country);
        match (self.province.clone(), self.postal_code.clone()) {
            (Some(province), Some(postal_code)) => {
                let (province, postal_code) = check_region(&country, &province, &postal_code)?;
                self.province = Some(province);
                self.postal_code = Some(postal_code);
            }
            (None, Some(postal_code)) if is_canada(&country) => {
                self.postal_code = Some(validate_postal_code(&postal_code)?);
            }
            (Some(province), None) if is_canada(&country) => {
                let province = province.trim().to_ascii_uppercase();
                if !PROVINCES.contains(&province.as_str()) {
                    return Err(AppError::validation(format!("Unknown province: {}", province)));
                }
                self.province = Some(province);
            }
            _ => {}
        }
        Ok(())
    }
}

impl Record for Address {
    type Draft = AddressDraft;
    type Patch = AddressPatch;

    const RESOURCE: &'static str = "addresses";
    const ACCESS: Access = Access::Owned;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &AddressDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut AddressDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub secondary_email: Option<String>,
    pub job_title: Option<String>,
    pub home_phone: Option<String>,
    pub work_phone: Option<String>,
    pub business_website: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub tiktok: Option<String>,
    pub linkedin: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub secondary_email: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub home_phone: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    #[serde(default)]
    pub business_website: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub tiktok: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
}

/// Contact fields shared by the draft and the patch
fn check_contact_fields(
    secondary_email: &mut Option<String>,
    job_title: &mut Option<String>,
    phones: [&mut Option<String>; 2],
    urls: [&mut Option<String>; 5],
) -> Result<(), AppError> {
    if let Some(email) = secondary_email.as_deref().map(str::trim) {
        *secondary_email = if email.is_empty() {
            None
        } else {
            Some(validate_email(email)?)
        };
    }
    *job_title = optional_text("job_title", job_title.as_deref(), 200)?;
    for phone in phones {
        *phone = validate_optional_phone(phone.as_deref())?;
    }
    for url in urls {
        *url = sanitize_optional_url(url.as_deref())?;
    }
    Ok(())
}

impl Validate for ContactDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        check_contact_fields(
            &mut self.secondary_email,
            &mut self.job_title,
            [&mut self.home_phone, &mut self.work_phone],
            [
                &mut self.business_website,
                &mut self.facebook,
                &mut self.instagram,
                &mut self.tiktok,
                &mut self.linkedin,
            ],
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiktok: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

impl Validate for ContactPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        check_contact_fields(
            &mut self.secondary_email,
            &mut self.job_title,
            [&mut self.home_phone, &mut self.work_phone],
            [
                &mut self.business_website,
                &mut self.facebook,
                &mut self.instagram,
                &mut self.tiktok,
                &mut self.linkedin,
            ],
        )
    }
}

impl Record for Contact {
    type Draft = ContactDraft;
    type Patch = ContactPatch;

    const RESOURCE: &'static str = "contacts";
    const ACCESS: Access = Access::Owned;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &ContactDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut ContactDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }

    fn unique_filters(draft: &ContactDraft) -> Vec<FieldFilter> {
        draft
            .account_id
            .map(|id| vec![FieldFilter::eq("account_id", id)])
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    French,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Woman,
    Man,
    NonBinary,
    Other,
    PreferNotToSay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub chosen_name: Option<String>,
    pub language: Language,
    pub gender: Option<Gender>,
    pub indigenous: Option<bool>,
    pub disability: Option<bool>,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub chosen_name: Option<String>,
    pub language: Language,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub indigenous: Option<bool>,
    #[serde(default)]
    pub disability: Option<bool>,
}

impl Validate for IdentityDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        self.chosen_name = optional_text("chosen_name", self.chosen_name.as_deref(), 100)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indigenous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disability: Option<bool>,
}

impl Validate for IdentityPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(name) = &self.chosen_name {
            self.chosen_name = Some(required_text("chosen_name", name, 100)?);
        }
        Ok(())
    }
}

impl Record for Identity {
    type Draft = IdentityDraft;
    type Patch = IdentityPatch;

    const RESOURCE: &'static str = "identities";
    const ACCESS: Access = Access::Owned;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &IdentityDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut IdentityDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }

    fn unique_filters(draft: &IdentityDraft) -> Vec<FieldFilter> {
        draft
            .account_id
            .map(|id| vec![FieldFilter::eq("account_id", id)])
            .unwrap_or_default()
    }
}
