//! OData query options for entity set reads.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::record::FilterOp;

/// A typed literal in a `$filter` expression
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Guid(Uuid),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

impl Literal {
    /// Renders the literal in OData URL syntax
    ///
    /// Text is single-quoted with embedded quotes doubled; GUIDs, numbers,
    /// booleans and dates are bare.
    pub fn render(&self) -> String {
        match self {
            Literal::Text(text) => format!("'{}'", text.replace('\'', "''")),
            Literal::Guid(id) => id.to_string(),
            Literal::Int(n) => n.to_string(),
            Literal::Float(n) => n.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Date(d) => d.format("%Y-%m-%d").to_string(),
            Literal::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            Literal::Null => "null".to_string(),
        }
    }
}

/// One comparison on a platform column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Literal,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: Literal) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn render(&self) -> String {
        format!("{} {} {}", self.column, self.op.as_odata(), self.value.render())
    }
}

/// Query options for one entity set: filters are joined with `and`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ODataQuery {
    pub filters: Vec<Filter>,
    pub select: Vec<String>,
    /// Column and `true` for descending
    pub order_by: Option<(String, bool)>,
    pub top: Option<u32>,
}

impl ODataQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.select = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some((column.into(), descending));
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    /// The `$filter` expression, if any filters are set
    pub fn filter_expression(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }
        Some(
            self.filters
                .iter()
                .map(Filter::render)
                .collect::<Vec<_>>()
                .join(" and "),
        )
    }

    /// Query string pairs, unencoded
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(filter) = self.filter_expression() {
            params.push(("$filter".to_string(), filter));
        }
        if !self.select.is_empty() {
            params.push(("$select".to_string(), self.select.join(",")));
        }
        if let Some((column, descending)) = &self.order_by {
            let direction = if *descending { "desc" } else { "asc" };
            params.push(("$orderby".to_string(), format!("{} {}", column, direction)));
        }
        if let Some(top) = self.top {
            params.push(("$top".to_string(), top.to_string()));
        }
        params
    }
}
