use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountGroup;
use super::record::{Access, FieldFilter, Record, Validate};
use crate::error::{AppError, ErrorCode};
use crate::validation::required_text;

const EARLIEST_GRADUATION_YEAR: i32 = 1950;
const MAX_YEARS_AHEAD: i32 = 5;

/// Registration status with the College of Occupational Therapists of Ontario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CotoStatus {
    General,
    Provisional,
    Temporary,
    Student,
    Resigned,
    Other,
}

impl CotoStatus {
    /// Statuses that come with a college registration number
    pub fn requires_registration(&self) -> bool {
        matches!(
            self,
            CotoStatus::General | CotoStatus::Provisional | CotoStatus::Temporary
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeType {
    Diploma,
    Bachelors,
    Masters,
    Doctorate,
    Other,
}

/// Stage of a member's education relative to the current year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationCategory {
    Graduated,
    NewGraduate,
    Student,
}

impl EducationCategory {
    /// Derives the category from the graduation year
    ///
    /// # Rules
    /// - Graduation after `current_year` -> Student
    /// - Graduation in `current_year` or the year before -> NewGraduate
    /// - Earlier -> Graduated
    ///
    /// # Example
    /// ```
    /// use osot_api::domain::education::EducationCategory;
    ///
    /// assert_eq!(EducationCategory::for_graduation_year(2027, 2026), EducationCategory::Student);
    /// assert_eq!(EducationCategory::for_graduation_year(2025, 2026), EducationCategory::NewGraduate);
    /// assert_eq!(EducationCategory::for_graduation_year(2010, 2026), EducationCategory::Graduated);
    /// ```
    pub fn for_graduation_year(graduation_year: i32, current_year: i32) -> Self {
        if graduation_year > current_year {
            EducationCategory::Student
        } else if graduation_year >= current_year - 1 {
            EducationCategory::NewGraduate
        } else {
            EducationCategory::Graduated
        }
    }
}

/// Checks a graduation year against the accepted window
pub fn validate_graduation_year(year: i32, current_year: i32) -> Result<(), AppError> {
    let latest = current_year + MAX_YEARS_AHEAD;
    if !(EARLIEST_GRADUATION_YEAR..=latest).contains(&year) {
        return Err(AppError::with_detail(
            ErrorCode::InvalidGraduationYear,
            format!(
                "Graduation year must be between {} and {}",
                EARLIEST_GRADUATION_YEAR, latest
            ),
        ));
    }
    Ok(())
}

fn current_year() -> i32 {
    Utc::now().year()
}

fn normalize_coto_registration(value: &str) -> Result<String, AppError> {
    let upper = value.trim().to_ascii_uppercase();
    if upper.len() != 8 || !upper.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::validation(
            "COTO registration must be 8 letters or digits",
        ));
    }
    Ok(upper)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtEducation {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub coto_status: CotoStatus,
    pub coto_registration: Option<String>,
    pub degree_type: DegreeType,
    pub university: String,
    pub graduation_year: i32,
    pub country: String,
    pub education_category: Option<EducationCategory>,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtEducationDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    pub coto_status: CotoStatus,
    #[serde(default)]
    pub coto_registration: Option<String>,
    pub degree_type: DegreeType,
    pub university: String,
    pub graduation_year: i32,
    pub country: String,
    /// Derived from the graduation year during validation
    #[serde(default)]
    pub education_category: Option<EducationCategory>,
}

impl Validate for OtEducationDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        let year = current_year();
        validate_graduation_year(self.graduation_year, year)?;
        self.university = required_text("university", &self.university, 200)?;
        self.country = required_text("country", &self.country, 100)?;

        self.coto_registration = match self.coto_registration.as_deref().map(str::trim) {
            None | Some("") if self.coto_status.requires_registration() => {
                return Err(AppError::validation(
                    "COTO registration is required for registered therapists",
                ));
            }
            None | Some("") => None,
            Some(value) => Some(normalize_coto_registration(value)?),
        };

        self.education_category = Some(EducationCategory::for_graduation_year(
            self.graduation_year,
            year,
        ));
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtEducationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coto_status: Option<CotoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coto_registration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree_type: Option<DegreeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub education_category: Option<EducationCategory>,
}

impl Validate for OtEducationPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        let year = current_year();
        if let Some(graduation_year) = self.graduation_year {
            validate_graduation_year(graduation_year, year)?;
            self.education_category =
                Some(EducationCategory::for_graduation_year(graduation_year, year));
        }
        if let Some(university) = &self.university {
            self.university = Some(required_text("university", university, 200)?);
        }
        if let Some(country) = &self.country {
            self.country = Some(required_text("country", country, 100)?);
        }
        if let Some(registration) = &self.coto_registration {
            self.coto_registration = Some(normalize_coto_registration(registration)?);
        }
        Ok(())
    }
}

impl Record for OtEducation {
    type Draft = OtEducationDraft;
    type Patch = OtEducationPatch;

    const RESOURCE: &'static str = "ot-educations";
    const ACCESS: Access = Access::Owned;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &OtEducationDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut OtEducationDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }

    fn unique_filters(draft: &OtEducationDraft) -> Vec<FieldFilter> {
        draft
            .account_id
            .map(|id| vec![FieldFilter::eq("account_id", id)])
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtaEducation {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub work_declaration: bool,
    pub degree_type: DegreeType,
    pub college: String,
    pub graduation_year: i32,
    pub country: String,
    pub education_category: Option<EducationCategory>,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtaEducationDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub work_declaration: bool,
    pub degree_type: DegreeType,
    pub college: String,
    pub graduation_year: i32,
    pub country: String,
    #[serde(default)]
    pub education_category: Option<EducationCategory>,
}

impl Validate for OtaEducationDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        let year = current_year();
        validate_graduation_year(self.graduation_year, year)?;
        self.college = required_text("college", &self.college, 200)?;
        self.country = required_text("country", &self.country, 100)?;
        self.education_category = Some(EducationCategory::for_graduation_year(
            self.graduation_year,
            year,
        ));
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtaEducationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_declaration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree_type: Option<DegreeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub education_category: Option<EducationCategory>,
}

impl Validate for OtaEducationPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        let year = current_year();
        if let Some(graduation_year) = self.graduation_year {
            validate_graduation_year(graduation_year, year)?;
            self.education_category =
                Some(EducationCategory::for_graduation_year(graduation_year, year));
        }
        if let Some(college) = &self.college {
            self.college = Some(required_text("college", college, 200)?);
        }
        if let Some(country) = &self.country {
            self.country = Some(required_text("country", country, 100)?);
        }
        Ok(())
    }
}

impl Record for OtaEducation {
    type Draft = OtaEducationDraft;
    type Patch = OtaEducationPatch;

    const RESOURCE: &'static str = "ota-educations";
    const ACCESS: Access = Access::Owned;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &OtaEducationDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut OtaEducationDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }

    fn unique_filters(draft: &OtaEducationDraft) -> Vec<FieldFilter> {
        draft
            .account_id
            .map(|id| vec![FieldFilter::eq("account_id", id)])
            .unwrap_or_default()
    }
}

/// Education submitted with a registration, tagged by professional group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EducationDraft {
    Ot(OtEducationDraft),
    Ota(OtaEducationDraft),
}

impl EducationDraft {
    /// Checks that the education kind matches the account group
    ///
    /// Vendors and other groups register without education.
    pub fn check_group(&self, group: AccountGroup) -> Result<(), AppError> {
        match (self, group) {
            (EducationDraft::Ot(_), AccountGroup::Ot) | (EducationDraft::Ota(_), AccountGroup::Ota) => {
                Ok(())
            }
            _ => Err(AppError::with_detail(
                ErrorCode::EducationCategoryMismatch,
                format!("{} education cannot be used for a {:?} account", self.kind(), group),
            )),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EducationDraft::Ot(_) => "OT",
            EducationDraft::Ota(_) => "OTA",
        }
    }
}

impl Validate for EducationDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        match self {
            EducationDraft::Ot(draft) => draft.validate(),
            EducationDraft::Ota(draft) => draft.validate(),
        }
    }
}
