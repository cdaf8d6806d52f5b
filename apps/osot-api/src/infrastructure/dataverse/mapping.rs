//! Translation between API field names and platform columns.
//!
//! Records are (de)serialized with serde using API names; a table's column
//! list converts those JSON objects to and from the platform's row format.

use serde_json::{Map, Number, Value};
use thiserror::Error;
use uuid::Uuid;

use super::query::Literal;
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("no column for field '{0}'")]
    UnknownField(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<MappingError> for AppError {
    fn from(err: MappingError) -> Self {
        AppError::internal(err.to_string())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> MappingError {
    MappingError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Named options of a choice column; option `i` has value `base + i`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSet {
    pub base: i64,
    pub names: &'static [&'static str],
}

impl OptionSet {
    pub const fn new(base: i64, names: &'static [&'static str]) -> Self {
        Self { base, names }
    }

    pub fn code(&self, name: &str) -> Option<i64> {
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|i| self.base + i as i64)
    }

    pub fn name(&self, code: i64) -> Option<&'static str> {
        let index = usize::try_from(code - self.base).ok()?;
        self.names.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Text, numbers and booleans, passed through unchanged
    Plain,
    /// Date-only value, `YYYY-MM-DD`
    Date,
    /// Decimal string on the API side, JSON number on the platform
    Money,
    /// Reference to another table, written through its navigation property
    Lookup {
        nav: &'static str,
        target_set: &'static str,
    },
    Choice(OptionSet),
    /// Comma separated option values
    MultiChoice(OptionSet),
    /// Structured value stored as JSON text
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// API field name
    pub field: &'static str,
    /// Platform column logical name
    pub remote: &'static str,
    pub kind: ColumnKind,
    /// Maintained by the platform; never written
    pub read_only: bool,
}

impl Column {
    const fn with_kind(field: &'static str, remote: &'static str, kind: ColumnKind) -> Self {
        Self {
            field,
            remote,
            kind,
            read_only: false,
        }
    }

    pub const fn plain(field: &'static str, remote: &'static str) -> Self {
        Self::with_kind(field, remote, ColumnKind::Plain)
    }

    pub const fn date(field: &'static str, remote: &'static str) -> Self {
        Self::with_kind(field, remote, ColumnKind::Date)
    }

    pub const fn money(field: &'static str, remote: &'static str) -> Self {
        Self::with_kind(field, remote, ColumnKind::Money)
    }

    pub const fn lookup(field: &'static str, nav: &'static str, target_set: &'static str) -> Self {
        Self::with_kind(field, nav, ColumnKind::Lookup { nav, target_set })
    }

    pub const fn choice(field: &'static str, remote: &'static str, options: OptionSet) -> Self {
        Self::with_kind(field, remote, ColumnKind::Choice(options))
    }

    pub const fn multi_choice(field: &'static str, remote: &'static str, options: OptionSet) -> Self {
        Self::with_kind(field, remote, ColumnKind::MultiChoice(options))
    }

    pub const fn json(field: &'static str, remote: &'static str) -> Self {
        Self::with_kind(field, remote, ColumnKind::Json)
    }

    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Key holding the column's value in rows read from the platform
    ///
    /// Lookups come back as `_<navigation property lower-cased>_value`.
    pub fn read_key(&self) -> String {
        match self.kind {
            ColumnKind::Lookup { nav, .. } => lookup_value_key(nav),
            _ => self.remote.to_string(),
        }
    }

    /// Converts an API value for writing
    fn to_remote(&self, value: &Value) -> Result<Value, MappingError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self.kind {
            ColumnKind::Plain | ColumnKind::Date => Ok(value.clone()),
            ColumnKind::Money => money_to_number(self.field, value).map(Value::Number),
            ColumnKind::Lookup { .. } => Err(invalid(self.field, "lookups are written as bindings")),
            ColumnKind::Choice(options) => {
                let name = value
                    .as_str()
                    .ok_or_else(|| invalid(self.field, "expected an option name"))?;
                options
                    .code(name)
                    .map(Value::from)
                    .ok_or_else(|| invalid(self.field, format!("unknown option '{}'", name)))
            }
            ColumnKind::MultiChoice(options) => {
                let names = value
                    .as_array()
                    .ok_or_else(|| invalid(self.field, "expected a list of option names"))?;
                if names.is_empty() {
                    return Ok(Value::Null);
                }
                let mut codes = Vec::with_capacity(names.len());
                for name in names {
                    let name = name
                        .as_str()
                        .ok_or_else(|| invalid(self.field, "expected an option name"))?;
                    let code = options
                        .code(name)
                        .ok_or_else(|| invalid(self.field, format!("unknown option '{}'", name)))?;
                    codes.push(code.to_string());
                }
                Ok(Value::String(codes.join(",")))
            }
            ColumnKind::Json => serde_json::to_string(value)
                .map(Value::String)
                .map_err(|e| invalid(self.field, e.to_string())),
        }
    }

    /// Converts a platform value to its API form
    fn from_remote(&self, value: &Value) -> Result<Value, MappingError> {
        match (self.kind, value) {
            (ColumnKind::MultiChoice(_), Value::Null) => Ok(Value::Array(Vec::new())),
            (_, Value::Null) => Ok(Value::Null),
            (ColumnKind::Plain | ColumnKind::Date | ColumnKind::Lookup { .. }, _) => {
                Ok(value.clone())
            }
            (ColumnKind::Money, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (ColumnKind::Money, Value::String(_)) => Ok(value.clone()),
            (ColumnKind::Choice(options), Value::Number(n)) => {
                let code = n
                    .as_i64()
                    .ok_or_else(|| invalid(self.field, "option value is not an integer"))?;
                options
                    .name(code)
                    .map(Value::from)
                    .ok_or_else(|| invalid(self.field, format!("unknown option value {}", code)))
            }
            (ColumnKind::MultiChoice(options), Value::String(joined)) => {
                let mut names = Vec::new();
                for part in joined.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let code: i64 = part
                        .parse()
                        .map_err(|_| invalid(self.field, format!("bad option value '{}'", part)))?;
                    let name = options
                        .name(code)
                        .ok_or_else(|| invalid(self.field, format!("unknown option value {}", code)))?;
                    names.push(Value::from(name));
                }
                Ok(Value::Array(names))
            }
            (ColumnKind::Json, Value::String(text)) => {
                serde_json::from_str(text).map_err(|e| invalid(self.field, e.to_string()))
            }
            _ => Err(invalid(self.field, format!("unexpected platform value {}", value))),
        }
    }

    /// Converts an API value to a filter literal on this column
    pub fn to_literal(&self, value: &Value) -> Result<Literal, MappingError> {
        if value.is_null() {
            return Ok(Literal::Null);
        }
        match self.kind {
            ColumnKind::Lookup { .. } => parse_guid(self.field, value).map(Literal::Guid),
            ColumnKind::Choice(_) => match self.to_remote(value)? {
                Value::Number(n) => n
                    .as_i64()
                    .map(Literal::Int)
                    .ok_or_else(|| invalid(self.field, "option value is not an integer")),
                _ => Err(invalid(self.field, "expected an option name")),
            },
            ColumnKind::Date => value
                .as_str()
                .and_then(|s| s.parse().ok())
                .map(Literal::Date)
                .ok_or_else(|| invalid(self.field, "expected a YYYY-MM-DD date")),
            ColumnKind::Money => match money_to_number(self.field, value)?.as_f64() {
                Some(n) => Ok(Literal::Float(n)),
                None => Err(invalid(self.field, "expected an amount")),
            },
            ColumnKind::Plain => plain_literal(self.field, value),
            ColumnKind::MultiChoice(_) | ColumnKind::Json => {
                Err(invalid(self.field, "column cannot be filtered"))
            }
        }
    }
}

pub fn lookup_value_key(nav: &str) -> String {
    format!("_{}_value", nav.to_ascii_lowercase())
}

fn parse_guid(field: &str, value: &Value) -> Result<Uuid, MappingError> {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| invalid(field, "expected a GUID"))
}

fn money_to_number(field: &str, value: &Value) -> Result<Number, MappingError> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount
        .and_then(Number::from_f64)
        .ok_or_else(|| invalid(field, "expected a decimal amount"))
}

fn plain_literal(field: &str, value: &Value) -> Result<Literal, MappingError> {
    match value {
        Value::Bool(b) => Ok(Literal::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Literal::Int(i)),
            None => n
                .as_f64()
                .map(Literal::Float)
                .ok_or_else(|| invalid(field, "unsupported number")),
        },
        Value::String(s) => Ok(Literal::Text(s.clone())),
        _ => Err(invalid(field, "unsupported filter value")),
    }
}

pub fn find_column<'a>(columns: &'a [Column], field: &str) -> Option<&'a Column> {
    columns.iter().find(|c| c.field == field)
}

/// Builds a platform row body from an API object
///
/// Read-only fields are dropped. Lookups become
/// `"<nav>@odata.bind": "/<target_set>(<id>)"`; null lookups are skipped.
pub fn to_remote(columns: &[Column], fields: &Map<String, Value>) -> Result<Map<String, Value>, MappingError> {
    let mut row = Map::new();
    for (field, value) in fields {
        let column =
            find_column(columns, field).ok_or_else(|| MappingError::UnknownField(field.clone()))?;
        if column.read_only {
            continue;
        }
        match column.kind {
            ColumnKind::Lookup { nav, target_set } => {
                if value.is_null() {
                    continue;
                }
                let id = parse_guid(field, value)?;
                row.insert(
                    format!("{}@odata.bind", nav),
                    Value::String(format!("/{}({})", target_set, id)),
                );
            }
            _ => {
                row.insert(column.remote.to_string(), column.to_remote(value)?);
            }
        }
    }
    Ok(row)
}

/// Builds an API object from a platform row
///
/// The primary key column becomes `id`; missing columns become null.
pub fn from_remote(columns: &[Column], id_column: &str, row: &Value) -> Result<Value, MappingError> {
    let id = row
        .get(id_column)
        .cloned()
        .ok_or_else(|| invalid("id", format!("row has no '{}'", id_column)))?;

    let mut fields = Map::new();
    fields.insert("id".to_string(), id);
    for column in columns {
        let value = row.get(&column.read_key()).unwrap_or(&Value::Null);
        fields.insert(column.field.to_string(), column.from_remote(value)?);
    }
    Ok(Value::Object(fields))
}
