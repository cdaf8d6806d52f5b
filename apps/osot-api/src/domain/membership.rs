//! Yearly membership records
//!
//! Each kind is unique per account and membership year

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{Access, FieldFilter, Record, Validate};
use crate::error::AppError;
use crate::validation::optional_text;

const MAX_WEEKLY_HOURS: u8 = 80;

pub const CLIENT_AGE_GROUPS: &[&str] = &["infants", "children", "adolescents", "adults", "older_adults"];

pub const PRACTICE_AREAS: &[&str] = &[
    "mental_health",
    "physical_rehabilitation",
    "neurology",
    "paediatrics",
    "geriatrics",
    "vocational_rehabilitation",
    "community_care",
    "other",
];

pub const PRACTICE_SETTINGS: &[&str] = &[
    "hospital",
    "community",
    "private_practice",
    "long_term_care",
    "school",
    "academic",
    "other",
];

pub const BENEFITS: &[&str] = &[
    "extended_health",
    "dental",
    "pension",
    "professional_development",
    "other",
];

/// Membership years accepted relative to the current year
fn validate_membership_year(year: i32) -> Result<(), AppError> {
    let current = Utc::now().year();
    if year < current - 1 || year > current + 1 {
        return Err(AppError::validation(format!(
            "membership_year must be between {} and {}",
            current - 1,
            current + 1
        )));
    }
    Ok(())
}

fn year_filters(account_id: Option<Uuid>, membership_year: i32) -> Vec<FieldFilter> {
    match account_id {
        Some(id) => vec![
            FieldFilter::eq("account_id", id),
            FieldFilter::eq("membership_year", membership_year),
        ],
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipCategoryKind {
    OtPractising,
    OtNonPractising,
    OtStudent,
    OtNewGraduate,
    OtaPractising,
    OtaNonPractising,
    OtaStudent,
    OtaNewGraduate,
    Associate,
    Affiliate,
    Retired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipCategory {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub membership_year: i32,
    pub category: MembershipCategoryKind,
    pub parental_leave_expected: bool,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipCategoryDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    pub membership_year: i32,
    pub category: MembershipCategoryKind,
    #[serde(default)]
    pub parental_leave_expected: bool,
}

impl Validate for MembershipCategoryDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        validate_membership_year(self.membership_year)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipCategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<MembershipCategoryKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parental_leave_expected: Option<bool>,
}

impl Validate for MembershipCategoryPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}

impl Record for MembershipCategory {
    type Draft = MembershipCategoryDraft;
    type Patch = MembershipCategoryPatch;

    const RESOURCE: &'static str = "membership-categories";
    const ACCESS: Access = Access::Owned;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &MembershipCategoryDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut MembershipCategoryDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }

    fn unique_filters(draft: &MembershipCategoryDraft) -> Vec<FieldFilter> {
        year_filters(draft.account_id, draft.membership_year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    FullTime,
    PartTime,
    SelfEmployed,
    Unemployed,
    OnLeave,
    Retired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipEmployment {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub membership_year: i32,
    pub employment_status: EmploymentStatus,
    pub weekly_hours: u8,
    pub role_descriptor: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipEmploymentDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    pub membership_year: i32,
    pub employment_status: EmploymentStatus,
    pub weekly_hours: u8,
    #[serde(default)]
    pub role_descriptor: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

fn check_hours(hours: u8) -> Result<(), AppError> {
    if hours > MAX_WEEKLY_HOURS {
        return Err(AppError::validation(format!(
            "weekly_hours must be between 0 and {}",
            MAX_WEEKLY_HOURS
        )));
    }
    Ok(())
}

/// Lower-cases, de-duplicates and checks multi-choice values against `allowed`
fn normalize_choices(
    field: &str,
    values: &[String],
    allowed: &[&str],
) -> Result<Vec<String>, AppError> {
    let mut normalized = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_ascii_lowercase();
        if !allowed.contains(&value.as_str()) {
            return Err(AppError::validation(format!(
                "{} has an unknown value '{}'",
                field, value
            )));
        }
        if !normalized.contains(&value) {
            normalized.push(value);
        }
    }
    Ok(normalized)
}

impl Validate for MembershipEmploymentDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        validate_membership_year(self.membership_year)?;
        check_hours(self.weekly_hours)?;
        self.role_descriptor = optional_text("role_descriptor", self.role_descriptor.as_deref(), 200)?;
        self.benefits = normalize_choices("benefits", &self.benefits, BENEFITS)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipEmploymentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<EmploymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_hours: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_descriptor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefits: Option<Vec<String>>,
}

impl Validate for MembershipEmploymentPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(hours) = self.weekly_hours {
            check_hours(hours)?;
        }
        if let Some(role) = &self.role_descriptor {
            self.role_descriptor = optional_text("role_descriptor", Some(role.as_str()), 200)?;
        }
        if let Some(benefits) = &self.benefits {
            self.benefits = Some(normalize_choices("benefits", benefits, BENEFITS)?);
        }
        Ok(())
    }
}

impl Record for MembershipEmployment {
    type Draft = MembershipEmploymentDraft;
    type Patch = MembershipEmploymentPatch;

    const RESOURCE: &'static str = "membership-employments";
    const ACCESS: Access = Access::Owned;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &MembershipEmploymentDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut MembershipEmploymentDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }

    fn unique_filters(draft: &MembershipEmploymentDraft) -> Vec<FieldFilter> {
        year_filters(draft.account_id, draft.membership_year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipPractices {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub membership_year: i32,
    pub client_ages: Vec<String>,
    #[serde(default)]
    pub practice_areas: Vec<String>,
    #[serde(default)]
    pub practice_settings: Vec<String>,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipPracticesDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    pub membership_year: i32,
    pub client_ages: Vec<String>,
    #[serde(default)]
    pub practice_areas: Vec<String>,
    #[serde(default)]
    pub practice_settings: Vec<String>,
}

fn check_client_ages(values: &[String]) -> Result<Vec<String>, AppError> {
    let ages = normalize_choices("client_ages", values, CLIENT_AGE_GROUPS)?;
    if ages.is_empty() {
        return Err(AppError::validation("client_ages requires at least one value"));
    }
    Ok(ages)
}

impl Validate for MembershipPracticesDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        validate_membership_year(self.membership_year)?;
        self.client_ages = check_client_ages(&self.client_ages)?;
        self.practice_areas = normalize_choices("practice_areas", &self.practice_areas, PRACTICE_AREAS)?;
        self.practice_settings = normalize_choices("practice_settings", &self.practice_settings, PRACTICE_SETTINGS)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipPracticesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_areas: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_settings: Option<Vec<String>>,
}

impl Validate for MembershipPracticesPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(ages) = &self.client_ages {
            self.client_ages = Some(check_client_ages(ages)?);
        }
        if let Some(areas) = &self.practice_areas {
            self.practice_areas = Some(normalize_choices("practice_areas", areas, PRACTICE_AREAS)?);
        }
        if let Some(settings) = &self.practice_settings {
            self.practice_settings = Some(normalize_choices("practice_settings", settings, PRACTICE_SETTINGS)?);
        }
        Ok(())
    }
}

impl Record for MembershipPractices {
    type Draft = MembershipPracticesDraft;
    type Patch = MembershipPracticesPatch;

    const RESOURCE: &'static str = "membership-practices";
    const ACCESS: Access = Access::Owned;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &MembershipPracticesDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut MembershipPracticesDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }

    fn unique_filters(draft: &MembershipPracticesDraft) -> Vec<FieldFilter> {
        year_filters(draft.account_id, draft.membership_year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipPreferences {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub membership_year: i32,
    pub auto_renewal: bool,
    pub practice_promotion: bool,
    pub third_party_search: bool,
    pub shadowing: bool,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipPreferencesDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    pub membership_year: i32,
    #[serde(default)]
    pub auto_renewal: bool,
    #[serde(default)]
    pub practice_promotion: bool,
    #[serde(default)]
    pub third_party_search: bool,
    #[serde(default)]
    pub shadowing: bool,
}

impl Validate for MembershipPreferencesDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        validate_membership_year(self.membership_year)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipPreferencesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_renewal: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_promotion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub third_party_search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadowing: Option<bool>,
}

impl Validate for MembershipPreferencesPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}

impl Record for MembershipPreferences {
    type Draft = MembershipPreferencesDraft;
    type Patch = MembershipPreferencesPatch;

    const RESOURCE: &'static str = "membership-preferences";
    const ACCESS: Access = Access::Owned;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &MembershipPreferencesDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut MembershipPreferencesDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }

    fn unique_filters(draft: &MembershipPreferencesDraft) -> Vec<FieldFilter> {
        year_filters(draft.account_id, draft.membership_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn this_year() -> i32 {
        Utc::now().year()
    }

    #[test]
    fn membership_year_window() {
        assert!(validate_membership_year(this_year()).is_ok());
        assert!(validate_membership_year(this_year() + 1).is_ok());
        assert!(validate_membership_year(this_year() - 3).is_err());
    }

    #[test]
    fn employment_hours_are_capped() {
        let mut draft = MembershipEmploymentDraft {
            account_id: None,
            membership_year: this_year(),
            employment_status: EmploymentStatus::FullTime,
            weekly_hours: 81,
            role_descriptor: None,
            benefits: vec![],
        };
        assert!(draft.validate().is_err());

        draft.weekly_hours = 80;
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn practices_require_client_ages() {
        let mut draft = MembershipPracticesDraft {
            account_id: None,
            membership_year: this_year(),
            client_ages: vec![],
            practice_areas: vec![],
            practice_settings: vec![],
        };
        assert!(draft.validate().is_err());

        draft.client_ages = vec!["seniors".to_string()];
        assert!(draft.validate().is_err());

        draft.client_ages = vec![
            " Adults ".to_string(),
            "adults".to_string(),
            "older_adults".to_string(),
        ];
        draft.validate().expect("valid practices");
        assert_eq!(draft.client_ages, vec!["adults", "older_adults"]);
    }

    #[test]
    fn unique_per_account_and_year() {
        let account_id = Uuid::new_v4();
        let draft = MembershipPreferencesDraft {
            account_id: Some(account_id),
            membership_year: 2026,
            auto_renewal: true,
            practice_promotion: false,
            third_party_search: false,
            shadowing: true,
        };
        let filters = MembershipPreferences::unique_filters(&draft);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].value, json!(account_id.to_string()));
        assert_eq!(filters[1].value, json!(2026));
    }

    #[test]
    fn patch_cannot_change_year() {
        let patch: MembershipCategoryPatch =
            serde_json::from_value(json!({"membership_year": 2030, "parental_leave_expected": true}))
                .unwrap();
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({"parental_leave_expected": true}));
    }
}
