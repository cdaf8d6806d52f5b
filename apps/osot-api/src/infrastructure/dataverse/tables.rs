//! Platform table definitions for every record type.

use super::client::TableRef;
use super::mapping::{Column, OptionSet};
use crate::domain::account::Account;
use crate::domain::catalog::{InsuranceProvider, Product};
use crate::domain::education::{OtEducation, OtaEducation};
use crate::domain::membership::{
    MembershipCategory, MembershipEmployment, MembershipPractices, MembershipPreferences, BENEFITS,
    CLIENT_AGE_GROUPS, PRACTICE_AREAS, PRACTICE_SETTINGS,
};
use crate::domain::order::Order;
use crate::domain::profile::{Address, Contact, Identity};
use crate::domain::record::Record;

/// Custom option values start here on the platform
const OPTION_BASE: i64 = 100_000_000;

const ACCOUNT_GROUPS: OptionSet = OptionSet::new(OPTION_BASE, &["ot", "ota", "vendor", "other"]);
const ACCOUNT_STATUSES: OptionSet =
    OptionSet::new(OPTION_BASE, &["active", "inactive", "pending", "locked"]);
const PRIVILEGES: OptionSet = OptionSet::new(OPTION_BASE, &["owner", "admin", "main"]);
const ADDRESS_TYPES: OptionSet = OptionSet::new(OPTION_BASE, &["home", "work"]);
const LANGUAGES: OptionSet = OptionSet::new(OPTION_BASE, &["english", "french", "other"]);
const GENDERS: OptionSet = OptionSet::new(
    OPTION_BASE,
    &["woman", "man", "non_binary", "other", "prefer_not_to_say"],
);
const COTO_STATUSES: OptionSet = OptionSet::new(
    OPTION_BASE,
    &["general", "provisional", "temporary", "student", "resigned", "other"],
);
const DEGREE_TYPES: OptionSet = OptionSet::new(
    OPTION_BASE,
    &["diploma", "bachelors", "masters", "doctorate", "other"],
);
const EDUCATION_CATEGORIES: OptionSet =
    OptionSet::new(OPTION_BASE, &["graduated", "new_graduate", "student"]);
const MEMBERSHIP_CATEGORIES: OptionSet = OptionSet::new(
    OPTION_BASE,
    &[
        "ot_practising",
        "ot_non_practising",
        "ot_student",
        "ot_new_graduate",
        "ota_practising",
        "ota_non_practising",
        "ota_student",
        "ota_new_graduate",
        "associate",
        "affiliate",
        "retired",
    ],
);
const EMPLOYMENT_STATUSES: OptionSet = OptionSet::new(
    OPTION_BASE,
    &["full_time", "part_time", "self_employed", "unemployed", "on_leave", "retired"],
);
const PRODUCT_CATEGORIES: OptionSet = OptionSet::new(
    OPTION_BASE,
    &["membership", "insurance", "event", "publication", "merchandise", "other"],
);
const PRODUCT_STATUSES: OptionSet =
    OptionSet::new(OPTION_BASE, &["available", "unavailable", "discontinued"]);
const ORDER_STATUSES: OptionSet = OptionSet::new(
    OPTION_BASE,
    &["draft", "pending", "paid", "cancelled", "refunded"],
);

const ACCOUNT_SET: &str = "osot_table_accounts";
const ACCOUNT_NAV: &str = "osot_Table_Account";

/// A record type stored in a platform table
pub trait Table: Record {
    const ENTITY_SET: &'static str;
    const ID_COLUMN: &'static str;
    /// Every API field except `id`
    const COLUMNS: &'static [Column];

    fn table_ref() -> TableRef {
        TableRef {
            set: Self::ENTITY_SET,
            id_column: Self::ID_COLUMN,
        }
    }
}

const fn owner_column() -> Column {
    Column::lookup("account_id", ACCOUNT_NAV, ACCOUNT_SET)
}

const fn created_column() -> Column {
    Column::plain("created_on", "createdon").read_only()
}

impl Table for Account {
    const ENTITY_SET: &'static str = ACCOUNT_SET;
    const ID_COLUMN: &'static str = "osot_table_accountid";
    const COLUMNS: &'static [Column] = &[
        Column::plain("account_code", "osot_account_id").read_only(),
        Column::plain("first_name", "osot_first_name"),
        Column::plain("last_name", "osot_last_name"),
        Column::date("date_of_birth", "osot_date_of_birth"),
        Column::plain("email", "osot_email"),
        Column::plain("mobile_phone", "osot_mobile_phone"),
        Column::plain("password_hash", "osot_password"),
        Column::choice("group", "osot_account_group", ACCOUNT_GROUPS),
        Column::choice("status", "osot_account_status", ACCOUNT_STATUSES),
        Column::choice("privilege", "osot_privilege", PRIVILEGES),
        Column::plain("accepted_terms", "osot_account_declaration"),
        created_column(),
        Column::plain("modified_on", "modifiedon").read_only(),
    ];
}

impl Table for Address {
    const ENTITY_SET: &'static str = "osot_table_addresses";
    const ID_COLUMN: &'static str = "osot_table_addressid";
    const COLUMNS: &'static [Column] = &[
        owner_column(),
        Column::plain("street1", "osot_address_1"),
        Column::plain("street2", "osot_address_2"),
        Column::plain("city", "osot_city"),
        Column::plain("province", "osot_province"),
        Column::plain("postal_code", "osot_postal_code"),
        Column::plain("country", "osot_country"),
        Column::choice("address_type", "osot_address_type", ADDRESS_TYPES),
        created_column(),
    ];
}

impl Table for Contact {
    const ENTITY_SET: &'static str = "osot_table_contacts";
    const ID_COLUMN: &'static str = "osot_table_contactid";
    const COLUMNS: &'static [Column] = &[
        owner_column(),
        Column::plain("secondary_email", "osot_secondary_email"),
        Column::plain("job_title", "osot_job_title"),
        Column::plain("home_phone", "osot_home_phone"),
        Column::plain("work_phone", "osot_work_phone"),
        Column::plain("business_website", "osot_business_website"),
        Column::plain("facebook", "osot_facebook"),
        Column::plain("instagram", "osot_instagram"),
        Column::plain("tiktok", "osot_tiktok"),
        Column::plain("linkedin", "osot_linkedin"),
        created_column(),
    ];
}

impl Table for Identity {
    const ENTITY_SET: &'static str = "osot_table_identities";
    const ID_COLUMN: &'static str = "osot_table_identityid";
    const COLUMNS: &'static [Column] = &[
        owner_column(),
        Column::plain("chosen_name", "osot_chosen_name"),
        Column::choice("language", "osot_language", LANGUAGES),
        Column::choice("gender", "osot_gender", GENDERS),
        Column::plain("indigenous", "osot_indigenous"),
        Column::plain("disability", "osot_disability"),
        created_column(),
    ];
}

impl Table for OtEducation {
    const ENTITY_SET: &'static str = "osot_table_ot_educations";
    const ID_COLUMN: &'static str = "osot_table_ot_educationid";
    const COLUMNS: &'static [Column] = &[
        owner_column(),
        Column::choice("coto_status", "osot_coto_status", COTO_STATUSES),
        Column::plain("coto_registration", "osot_coto_registration"),
        Column::choice("degree_type", "osot_ot_degree_type", DEGREE_TYPES),
        Column::plain("university", "osot_ot_university"),
        Column::plain("graduation_year", "osot_ot_grad_year"),
        Column::plain("country", "osot_ot_country"),
        Column::choice("education_category", "osot_education_category", EDUCATION_CATEGORIES),
        created_column(),
    ];
}

impl Table for OtaEducation {
    const ENTITY_SET: &'static str = "osot_table_ota_educations";
    const ID_COLUMN: &'static str = "osot_table_ota_educationid";
    const COLUMNS: &'static [Column] = &[
        owner_column(),
        Column::plain("work_declaration", "osot_work_declaration"),
        Column::choice("degree_type", "osot_ota_degree_type", DEGREE_TYPES),
        Column::plain("college", "osot_ota_college"),
        Column::plain("graduation_year", "osot_ota_grad_year"),
        Column::plain("country", "osot_ota_country"),
        Column::choice("education_category", "osot_education_category", EDUCATION_CATEGORIES),
        created_column(),
    ];
}

impl Table for MembershipCategory {
    const ENTITY_SET: &'static str = "osot_table_membership_categories";
    const ID_COLUMN: &'static str = "osot_table_membership_categoryid";
    const COLUMNS: &'static [Column] = &[
        owner_column(),
        Column::plain("membership_year", "osot_membership_year"),
        Column::choice("category", "osot_membership_category", MEMBERSHIP_CATEGORIES),
        Column::plain("parental_leave_expected", "osot_parental_leave_expected"),
        created_column(),
    ];
}

impl Table for MembershipEmployment {
    const ENTITY_SET: &'static str = "osot_table_membership_employments";
    const ID_COLUMN: &'static str = "osot_table_membership_employmentid";
    const COLUMNS: &'static [Column] = &[
        owner_column(),
        Column::plain("membership_year", "osot_membership_year"),
        Column::choice("employment_status", "osot_employment_status", EMPLOYMENT_STATUSES),
        Column::plain("weekly_hours", "osot_work_hours"),
        Column::plain("role_descriptor", "osot_role_descriptor"),
        Column::multi_choice("benefits", "osot_employment_benefits", OptionSet::new(1, BENEFITS)),
        created_column(),
    ];
}

impl Table for MembershipPractices {
    const ENTITY_SET: &'static str = "osot_table_membership_practices";
    const ID_COLUMN: &'static str = "osot_table_membership_practiceid";
    const COLUMNS: &'static [Column] = &[
        owner_column(),
        Column::plain("membership_year", "osot_membership_year"),
        Column::multi_choice("client_ages", "osot_client_ages", OptionSet::new(1, CLIENT_AGE_GROUPS)),
        Column::multi_choice("practice_areas", "osot_practice_areas", OptionSet::new(1, PRACTICE_AREAS)),
        Column::multi_choice(
            "practice_settings",
            "osot_practice_settings",
            OptionSet::new(1, PRACTICE_SETTINGS),
        ),
        created_column(),
    ];
}

impl Table for MembershipPreferences {
    const ENTITY_SET: &'static str = "osot_table_membership_preferences";
    const ID_COLUMN: &'static str = "osot_table_membership_preferenceid";
    const COLUMNS: &'static [Column] = &[
        owner_column(),
        Column::plain("membership_year", "osot_membership_year"),
        Column::plain("auto_renewal", "osot_auto_renewal"),
        Column::plain("practice_promotion", "osot_practice_promotion"),
        Column::plain("third_party_search", "osot_third_party_search"),
        Column::plain("shadowing", "osot_shadowing"),
        created_column(),
    ];
}

impl Table for Product {
    const ENTITY_SET: &'static str = "osot_table_products";
    const ID_COLUMN: &'static str = "osot_table_productid";
    const COLUMNS: &'static [Column] = &[
        Column::plain("product_code", "osot_product_code"),
        Column::plain("name", "osot_product_name"),
        Column::plain("description", "osot_product_description"),
        Column::choice("category", "osot_product_category", PRODUCT_CATEGORIES),
        Column::choice("status", "osot_product_status", PRODUCT_STATUSES),
        Column::money("general_price", "osot_general_price"),
        Column::money("member_price", "osot_member_price"),
        Column::money("tax_rate", "osot_tax_rate"),
        Column::plain("inventory", "osot_inventory"),
        Column::date("start_date", "osot_start_date"),
        Column::date("end_date", "osot_end_date"),
        Column::plain("image_url", "osot_product_picture"),
        created_column(),
    ];
}

impl Table for InsuranceProvider {
    const ENTITY_SET: &'static str = "osot_table_insurance_providers";
    const ID_COLUMN: &'static str = "osot_table_insurance_providerid";
    const COLUMNS: &'static [Column] = &[
        Column::plain("name", "osot_provider_name"),
        Column::plain("description", "osot_description"),
        Column::plain("contact_email", "osot_contact_email"),
        Column::plain("phone", "osot_phone"),
        Column::plain("website", "osot_website"),
        Column::plain("logo_url", "osot_logo_url"),
        Column::plain("is_active", "osot_active"),
        created_column(),
    ];
}

impl Table for Order {
    const ENTITY_SET: &'static str = "osot_table_orders";
    const ID_COLUMN: &'static str = "osot_table_orderid";
    const COLUMNS: &'static [Column] = &[
        Column::plain("order_number", "osot_order_number").read_only(),
        owner_column(),
        Column::choice("status", "osot_order_status", ORDER_STATUSES),
        Column::json("items", "osot_line_items"),
        Column::money("subtotal", "osot_subtotal"),
        Column::money("tax", "osot_tax"),
        Column::money("total", "osot_total"),
        Column::plain("payment_reference", "osot_payment_reference"),
        created_column(),
    ];
}

/// Entity set behind a REST resource name
pub fn entity_set_for(resource: &str) -> Option<&'static str> {
    fn pair<T: Table>() -> (&'static str, &'static str) {
        (T::RESOURCE, T::ENTITY_SET)
    }

    [
        pair::<Account>(),
        pair::<Address>(),
        pair::<Contact>(),
        pair::<Identity>(),
        pair::<OtEducation>(),
        pair::<OtaEducation>(),
        pair::<MembershipCategory>(),
        pair::<MembershipEmployment>(),
        pair::<MembershipPractices>(),
        pair::<MembershipPreferences>(),
        pair::<Product>(),
        pair::<InsuranceProvider>(),
        pair::<Order>(),
    ]
    .into_iter()
    .find(|(name, _)| *name == resource)
    .map(|(_, set)| set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{AccountDraft, AccountGroup, AccountStatus, Privilege};
    use crate::domain::profile::IdentityDraft;
    use crate::infrastructure::dataverse::mapping::{from_remote, to_remote};
    use serde_json::json;

    #[test]
    fn account_draft_maps_to_platform_columns() {
        let draft = AccountDraft {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            date_of_birth: None,
            email: "ada@example.com".to_string(),
            mobile_phone: None,
            password_hash: Some("hash".to_string()),
            group: AccountGroup::Ota,
            status: AccountStatus::Pending,
            privilege: Privilege::Owner,
            accepted_terms: true,
        };
        let fields = serde_json::to_value(&draft).unwrap();
        let row = to_remote(Account::COLUMNS, fields.as_object().unwrap()).unwrap();

        assert_eq!(row["osot_first_name"], "Ada");
        assert_eq!(row["osot_account_group"], json!(100_000_001));
        assert_eq!(row["osot_account_status"], json!(100_000_002));
        assert_eq!(row["osot_password"], "hash");
    }

    #[test]
    fn account_row_reads_back_into_record() {
        let id = uuid::Uuid::new_v4();
        let row = json!({
            "osot_table_accountid": id.to_string(),
            "osot_account_id": "osot-0000042",
            "osot_first_name": "Ada",
            "osot_last_name": "Lovelace",
            "osot_email": "ada@example.com",
            "osot_password": "hash",
            "osot_account_group": 100_000_000,
            "osot_account_status": 100_000_000,
            "osot_privilege": 100_000_002,
            "osot_account_declaration": true,
            "createdon": "2026-03-01T12:00:00Z"
        });
        let fields = from_remote(Account::COLUMNS, Account::ID_COLUMN, &row).unwrap();
        let account: Account = serde_json::from_value(fields).unwrap();

        assert_eq!(account.id, id);
        assert_eq!(account.account_code.as_deref(), Some("osot-0000042"));
        assert_eq!(account.privilege, Privilege::Main);
        assert_eq!(account.password_hash.as_deref(), Some("hash"));
        assert!(account.created_on.is_some());
    }

    #[test]
    fn owned_drafts_bind_the_account() {
        let account_id = uuid::Uuid::new_v4();
        let draft: IdentityDraft = serde_json::from_value(json!({
            "account_id": account_id,
            "language": "french"
        }))
        .unwrap();
        let fields = serde_json::to_value(&draft).unwrap();
        let row = to_remote(Identity::COLUMNS, fields.as_object().unwrap()).unwrap();

        assert_eq!(
            row["osot_Table_Account@odata.bind"],
            format!("/osot_table_accounts({})", account_id)
        );
        assert_eq!(row["osot_language"], json!(100_000_001));
    }

    #[test]
    fn resources_resolve_to_entity_sets() {
        assert_eq!(entity_set_for("products"), Some("osot_table_products"));
        assert_eq!(entity_set_for("ot-educations"), Some(OtEducation::ENTITY_SET));
        assert_eq!(entity_set_for("widgets"), None);
    }

    #[test]
    fn every_table_has_distinct_fields() {
        fn check<T: Table>() {
            let mut fields: Vec<&str> = T::COLUMNS.iter().map(|c| c.field).collect();
            let count = fields.len();
            fields.sort_unstable();
            fields.dedup();
            assert_eq!(fields.len(), count, "{}", T::ENTITY_SET);
        }
        check::<Account>();
        check::<Address>();
        check::<Contact>();
        check::<Identity>();
        check::<OtEducation>();
        check::<OtaEducation>();
        check::<MembershipCategory>();
        check::<MembershipEmployment>();
        check::<MembershipPractices>();
        check::<MembershipPreferences>();
        check::<Product>();
        check::<InsuranceProvider>();
        check::<Order>();
    }
}
