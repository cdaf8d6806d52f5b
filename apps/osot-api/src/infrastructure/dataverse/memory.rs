use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::client::{DataverseApi, DataverseError, TableRef};
use super::mapping::lookup_value_key;
use super::query::{Filter, Literal, ODataQuery};
use crate::domain::record::FilterOp;

const BIND_SUFFIX: &str = "@odata.bind";

/// Process-local data platform
///
/// Stores rows per entity set the way the Web API returns them: lookup
/// bindings become `_<nav>_value` columns and `createdon`/`modifiedon` are
/// maintained. Used when no platform URL is configured, and in tests.
#[derive(Default)]
pub struct InMemoryDataverse {
    tables: RwLock<HashMap<&'static str, Vec<Value>>>,
    unavailable: RwLock<HashSet<&'static str>>,
}

impl InMemoryDataverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes writes to `set` fail as if the platform were down
    pub async fn fail_writes_to(&self, set: &'static str) {
        self.unavailable.write().await.insert(set);
    }

    pub async fn restore_writes_to(&self, set: &str) {
        self.unavailable.write().await.remove(set);
    }

    /// Number of rows stored in `set`
    pub async fn row_count(&self, set: &str) -> usize {
        self.tables.read().await.get(set).map_or(0, Vec::len)
    }

    async fn check_writable(&self, table: TableRef) -> Result<(), DataverseError> {
        if self.unavailable.read().await.contains(table.set) {
            return Err(DataverseError::Unavailable(format!(
                "{} is not accepting writes",
                table.set
            )));
        }
        Ok(())
    }
}

fn row_id(row: &Value, id_column: &str) -> Option<Uuid> {
    row.get(id_column)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Copies `body` into `row`, resolving lookup bindings
fn apply_body(row: &mut Map<String, Value>, body: &Value) -> Result<(), DataverseError> {
    let fields = body
        .as_object()
        .ok_or_else(|| rejected("row body must be a JSON object"))?;

    for (key, value) in fields {
        match key.strip_suffix(BIND_SUFFIX) {
            Some(nav) => {
                let id = value
                    .as_str()
                    .and_then(|path| path.rsplit_once('('))
                    .and_then(|(_, rest)| rest.strip_suffix(')'))
                    .and_then(|id| Uuid::parse_str(id).ok())
                    .ok_or_else(|| rejected(&format!("invalid binding for {}", nav)))?;
                row.insert(lookup_value_key(nav), Value::String(id.to_string()));
            }
            None => {
                row.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(())
}

fn rejected(message: &str) -> DataverseError {
    DataverseError::Rejected {
        status: 400,
        message: message.to_string(),
    }
}

fn compare_literal(value: &Value, literal: &Literal) -> Option<Ordering> {
    match literal {
        Literal::Text(text) => value.as_str().map(|s| s.cmp(text.as_str())),
        Literal::Guid(id) => value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(|v| v.cmp(id)),
        Literal::Int(n) => value.as_f64().and_then(|v| v.partial_cmp(&(*n as f64))),
        Literal::Float(n) => value.as_f64().and_then(|v| v.partial_cmp(n)),
        Literal::Bool(b) => value.as_bool().map(|v| v.cmp(b)),
        Literal::Date(date) => value
            .as_str()
            .and_then(|s| s.get(..10))
            .and_then(|s| s.parse::<NaiveDate>().ok())
            .map(|v| v.cmp(date)),
        Literal::DateTime(at) => value
            .as_str()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
            .map(|v| v.cmp(at)),
        Literal::Null => None,
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    let value = row.get(&filter.column).unwrap_or(&Value::Null);
    if filter.value == Literal::Null {
        return match filter.op {
            FilterOp::Eq => value.is_null(),
            FilterOp::Ne => !value.is_null(),
            _ => false,
        };
    }

    let ordering = compare_literal(value, &filter.value);
    match filter.op {
        FilterOp::Eq => ordering == Some(Ordering::Equal),
        FilterOp::Ne => ordering != Some(Ordering::Equal),
        FilterOp::Gt => ordering == Some(Ordering::Greater),
        FilterOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => ordering == Some(Ordering::Less),
        FilterOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DataverseApi for InMemoryDataverse {
    async fn retrieve(&self, table: TableRef, id: Uuid) -> Result<Value, DataverseError> {
        let tables = self.tables.read().await;
        tables
            .get(table.set)
            .and_then(|rows| rows.iter().find(|row| row_id(row, table.id_column) == Some(id)))
            .cloned()
            .ok_or(DataverseError::NotFound)
    }

    async fn query(&self, table: TableRef, query: &ODataQuery) -> Result<Vec<Value>, DataverseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(table.set)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((column, descending)) = &query.order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                );
                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(top) = query.top {
            rows.truncate(top as usize);
        }
        Ok(rows)
    }

    async fn create(&self, table: TableRef, body: &Value) -> Result<Value, DataverseError> {
        self.check_writable(table).await?;

        let mut row = Map::new();
        apply_body(&mut row, body)?;
        let now = Value::String(Utc::now().to_rfc3339());
        row.insert(
            table.id_column.to_string(),
            Value::String(Uuid::new_v4().to_string()),
        );
        row.insert("createdon".to_string(), now.clone());
        row.insert("modifiedon".to_string(), now);

        let row = Value::Object(row);
        self.tables
            .write()
            .await
            .entry(table.set)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: TableRef, id: Uuid, body: &Value) -> Result<Value, DataverseError> {
        self.check_writable(table).await?;

        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(table.set)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row_id(row, table.id_column) == Some(id))
            })
            .and_then(Value::as_object_mut)
            .ok_or(DataverseError::NotFound)?;

        apply_body(row, body)?;
        row.insert(
            "modifiedon".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        Ok(Value::Object(row.clone()))
    }

    async fn delete(&self, table: TableRef, id: Uuid) -> Result<(), DataverseError> {
        self.check_writable(table).await?;

        let mut tables = self.tables.write().await;
        let rows = tables.get_mut(table.set).ok_or(DataverseError::NotFound)?;
        let before = rows.len();
        rows.retain(|row| row_id(row, table.id_column) != Some(id));
        if rows.len() == before {
            return Err(DataverseError::NotFound);
        }
        Ok(())
    }
}
