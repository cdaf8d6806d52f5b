use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::{Access, FieldFilter, Record, Validate};
use crate::error::AppError;
use crate::validation::{
    optional_text, required_text, sanitize_optional_url, validate_email, validate_optional_phone,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Membership,
    Insurance,
    Event,
    Publication,
    Merchandise,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Available,
    Unavailable,
    Discontinued,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub product_code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub status: ProductStatus,
    pub general_price: Decimal,
    pub member_price: Option<Decimal>,
    /// Percentage, e.g. `13` for 13 %
    pub tax_rate: Decimal,
    /// Units left; `None` means unlimited
    pub inventory: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the product can be sold on `date`
    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        self.status == ProductStatus::Available
            && self.start_date.map_or(true, |start| start <= date)
            && self.end_date.map_or(true, |end| date <= end)
            && self.inventory.map_or(true, |left| left > 0)
    }

    /// Unit price for a buyer; members pay the member price when one is set
    pub fn unit_price(&self, is_member: bool) -> Decimal {
        match self.member_price {
            Some(price) if is_member => price,
            _ => self.general_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub product_code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: ProductCategory,
    pub status: ProductStatus,
    pub general_price: Decimal,
    #[serde(default)]
    pub member_price: Option<Decimal>,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub inventory: Option<i32>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn check_price(field: &str, price: Decimal) -> Result<(), AppError> {
    if price.is_sign_negative() {
        return Err(AppError::validation(format!("{} cannot be negative", field)));
    }
    Ok(())
}

fn check_tax_rate(rate: Decimal) -> Result<(), AppError> {
    if rate.is_sign_negative() || rate > Decimal::ONE_HUNDRED {
        return Err(AppError::validation("tax_rate must be between 0 and 100"));
    }
    Ok(())
}

fn check_inventory(inventory: Option<i32>) -> Result<(), AppError> {
    if inventory.is_some_and(|n| n < 0) {
        return Err(AppError::validation("inventory cannot be negative"));
    }
    Ok(())
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), AppError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(AppError::validation("end_date must not be before start_date"));
        }
    }
    Ok(())
}

fn normalize_product_code(code: &str) -> Result<String, AppError> {
    let code = required_text("product_code", code, 50)?.to_ascii_uppercase();
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::validation(
            "product_code may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(code)
}

impl Validate for ProductDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        self.product_code = normalize_product_code(&self.product_code)?;
        self.name = required_text("name", &self.name, 200)?;
        self.description = optional_text("description", self.description.as_deref(), 4000)?;
        check_price("general_price", self.general_price)?;
        if let Some(price) = self.member_price {
            check_price("member_price", price)?;
        }
        check_tax_rate(self.tax_rate)?;
        check_inventory(self.inventory)?;
        check_dates(self.start_date, self.end_date)?;
        self.image_url = sanitize_optional_url(self.image_url.as_deref())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ProductCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Validate for ProductPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            self.name = Some(required_text("name", name, 200)?);
        }
        if let Some(description) = &self.description {
            self.description = optional_text("description", Some(description.as_str()), 4000)?;
        }
        if let Some(price) = self.general_price {
            check_price("general_price", price)?;
        }
        if let Some(price) = self.member_price {
            check_price("member_price", price)?;
        }
        if let Some(rate) = self.tax_rate {
            check_tax_rate(rate)?;
        }
        check_inventory(self.inventory)?;
        check_dates(self.start_date, self.end_date)?;
        if let Some(url) = &self.image_url {
            self.image_url = sanitize_optional_url(Some(url.as_str()))?;
        }
        Ok(())
    }
}

impl Record for Product {
    type Draft = ProductDraft;
    type Patch = ProductPatch;

    const RESOURCE: &'static str = "products";
    const ACCESS: Access = Access::Catalog;

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_filters(draft: &ProductDraft) -> Vec<FieldFilter> {
        vec![FieldFilter::eq("product_code", &draft.product_code)]
    }

    fn check_patch(&self, patch: &ProductPatch) -> Result<(), AppError> {
        check_dates(
            patch.start_date.or(self.start_date),
            patch.end_date.or(self.end_date),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceProvider {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceProviderDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn optional_email(email: Option<&str>) -> Result<Option<String>, AppError> {
    match email.map(str::trim) {
        None | Some("") => Ok(None),
        Some(email) => validate_email(email).map(Some),
    }
}

impl Validate for InsuranceProviderDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        self.name = required_text("name", &self.name, 200)?;
        self.description = optional_text("description", self.description.as_deref(), 4000)?;
        self.contact_email = optional_email(self.contact_email.as_deref())?;
        self.phone = validate_optional_phone(self.phone.as_deref())?;
        self.website = sanitize_optional_url(self.website.as_deref())?;
        self.logo_url = sanitize_optional_url(self.logo_url.as_deref())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsuranceProviderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Validate for InsuranceProviderPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            self.name = Some(required_text("name", name, 200)?);
        }
        if let Some(description) = &self.description {
            self.description = optional_text("description", Some(description.as_str()), 4000)?;
        }
        if let Some(email) = &self.contact_email {
            self.contact_email = optional_email(Some(email.as_str()))?;
        }
        if let Some(phone) = &self.phone {
            self.phone = validate_optional_phone(Some(phone.as_str()))?;
        }
        if let Some(url) = &self.website {
            self.website = sanitize_optional_url(Some(url.as_str()))?;
        }
        if let Some(url) = &self.logo_url {
            self.logo_url = sanitize_optional_url(Some(url.as_str()))?;
        }
        Ok(())
    }
}

impl Record for InsuranceProvider {
    type Draft = InsuranceProviderDraft;
    type Patch = InsuranceProviderPatch;

    const RESOURCE: &'static str = "insurance-providers";
    const ACCESS: Access = Access::Catalog;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn product() -> Product {
        Product {
            id: Uuid::new_v4(),
            product_code: "MEM-2026".to_string(),
            name: "Membership 2026".to_string(),
            description: None,
            category: ProductCategory::Membership,
            status: ProductStatus::Available,
            general_price: dec("250.00"),
            member_price: Some(dec("199.00")),
            tax_rate: dec("13"),
            inventory: None,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31),
            image_url: None,
            created_on: None,
        }
    }

    #[test]
    fn patch_dates_are_checked_against_the_stored_product() {
        let product = product();

        let patch = ProductPatch {
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30),
            ..Default::default()
        };
        let err = product.check_patch(&patch).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let patch = ProductPatch {
            start_date: NaiveDate::from_ymd_opt(2027, 1, 1),
            ..Default::default()
        };
        assert!(product.check_patch(&patch).is_err());

        let patch = ProductPatch {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            ..Default::default()
        };
        assert!(product.check_patch(&patch).is_ok());
        assert!(product.check_patch(&ProductPatch::default()).is_ok());
    }

    fn draft() -> ProductDraft {
        ProductDraft {
            product_code: " mem-2026 ".to_string(),
            name: "Membership 2026".to_string(),
            description: None,
            category: ProductCategory::Membership,
            status: ProductStatus::Available,
            general_price: dec("250"),
            member_price: None,
            tax_rate: dec("13"),
            inventory: Some(10),
            start_date: None,
            end_date: None,
            image_url: Some("cdn.example.com/img.png".to_string()),
        }
    }

    #[test]
    fn availability_respects_dates_and_status() {
        let mut product = product();
        let mid_year = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(product.is_available_on(mid_year));
        assert!(!product.is_available_on(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()));

        product.inventory = Some(0);
        assert!(!product.is_available_on(mid_year));

        product.inventory = None;
        product.status = ProductStatus::Discontinued;
        assert!(!product.is_available_on(mid_year));
    }

    #[test]
    fn member_price_applies_to_members_only() {
        let product = product();
        assert_eq!(product.unit_price(true), dec("199.00"));
        assert_eq!(product.unit_price(false), dec("250.00"));
    }

    #[test]
    fn draft_normalizes_code_and_image() {
        let mut draft = draft();
        draft.validate().expect("valid product");
        assert_eq!(draft.product_code, "MEM-2026");
        assert_eq!(draft.image_url.as_deref(), Some("https://cdn.example.com/img.png"));
    }

    #[test]
    fn draft_rejects_bad_numbers() {
        let mut bad_tax = draft();
        bad_tax.tax_rate = dec("101");
        assert!(bad_tax.validate().is_err());

        let mut negative = draft();
        negative.general_price = dec("-1");
        assert!(negative.validate().is_err());

        let mut dates = draft();
        dates.start_date = NaiveDate::from_ymd_opt(2026, 5, 1);
        dates.end_date = NaiveDate::from_ymd_opt(2026, 4, 1);
        assert!(dates.validate().is_err());
    }

    #[test]
    fn dangerous_image_url_is_rejected() {
        let mut draft = draft();
        draft.image_url = Some("javascript:alert(1)".to_string());
        assert_eq!(draft.validate().unwrap_err().code, ErrorCode::InvalidUrl);
    }

    #[test]
    fn provider_defaults_to_active() {
        let json = serde_json::json!({"name": "Acme Insurance", "website": "acme.ca"});
        let mut draft: InsuranceProviderDraft = serde_json::from_value(json).unwrap();
        draft.validate().expect("valid provider");
        assert!(draft.is_active);
        assert_eq!(draft.website.as_deref(), Some("https://acme.ca"));
    }
}
