use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;

/// Who may read and write records of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Owned by one account; the owner and staff may read and write
    Owned,
    /// Owned by one account; the owner may read, only staff may write
    OwnedStaffWrite,
    /// Shared catalog; any signed-in user may read, only staff may write
    Catalog,
}

/// Request DTO check that also normalizes fields in place
pub trait Validate {
    fn validate(&mut self) -> Result<(), AppError>;
}

/// Comparison used in a record filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl FilterOp {
    /// OData operator keyword
    pub fn as_odata(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Gt => "gt",
            FilterOp::Ge => "ge",
            FilterOp::Lt => "lt",
            FilterOp::Le => "le",
        }
    }
}

/// Filter on an API-level field name, translated by the repository
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    pub fn new<V: Serialize>(field: &str, op: FilterOp, value: V) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: serde_json::to_value(value).unwrap_or(Value::Null),
        }
    }

    pub fn eq<V: Serialize>(field: &str, value: V) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }
}

/// Query over a resource: conjunction of filters, optional ordering and limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub filters: Vec<FieldFilter>,
    /// Field name and `true` for descending
    pub order_by: Option<(String, bool)>,
    pub top: Option<u32>,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, descending: bool) -> Self {
        self.order_by = Some((field.to_string(), descending));
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }
}

/// An entity row mirrored from the data platform and exposed as a REST resource
///
/// `Draft` is the create DTO and `Patch` the partial update DTO; both are
/// serialized with API field names and translated by the repository.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Draft: Serialize + DeserializeOwned + Validate + Send + Sync + 'static;
    type Patch: Serialize + DeserializeOwned + Validate + Send + Sync + 'static;

    /// Plural resource name used in routes, cache keys and messages
    const RESOURCE: &'static str;
    const ACCESS: Access;

    fn id(&self) -> Uuid;

    /// Owning account, for owned resources
    fn owner(&self) -> Option<Uuid> {
        None
    }

    /// Owning account requested in a draft
    fn draft_owner(_draft: &Self::Draft) -> Option<Uuid> {
        None
    }

    /// Sets the owning account on a draft
    fn assign_owner(_draft: &mut Self::Draft, _account_id: Uuid) {}

    /// Filters matching records that would conflict with the draft
    ///
    /// An empty list means the resource has no uniqueness rule.
    fn unique_filters(_draft: &Self::Draft) -> Vec<FieldFilter> {
        Vec::new()
    }

    /// Rules spanning several fields, checked with the patch applied over `self`
    fn check_patch(&self, _patch: &Self::Patch) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_filter_serializes_values() {
        let id = Uuid::new_v4();
        let filter = FieldFilter::eq("account_id", id);
        assert_eq!(filter.value, json!(id.to_string()));
        assert_eq!(filter.op, FilterOp::Eq);
    }

    #[test]
    fn query_builder_accumulates() {
        let query = RecordQuery::new()
            .filter(FieldFilter::eq("membership_year", 2026))
            .filter(FieldFilter::new("status", FilterOp::Ne, "discontinued"))
            .order_by("created_on", true)
            .top(10);

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.order_by, Some(("created_on".to_string(), true)));
        assert_eq!(query.top, Some(10));
    }

    #[test]
    fn operators_render_as_odata() {
        assert_eq!(FilterOp::Ge.as_odata(), "ge");
        assert_eq!(FilterOp::Ne.as_odata(), "ne");
    }
}
