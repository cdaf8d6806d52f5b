use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::client::{DataverseApi, DataverseError};
use super::mapping::{find_column, from_remote, to_remote};
use super::query::{Filter, Literal, ODataQuery};
use super::tables::Table;
use crate::domain::record::{FieldFilter, RecordQuery};
use crate::domain::repository::RecordRepository;
use crate::error::{AppError, AppResult};
use crate::infrastructure::cache::Cache;

/// Cache key prefix shared by every cached platform row
pub const RECORDS_PREFIX: &str = "records:";

pub fn record_cache_key(entity_set: &str, id: Uuid) -> String {
    format!("{}{}:{}", RECORDS_PREFIX, entity_set, id)
}

/// Platform-backed repository with read-through caching of rows
///
/// Raw platform rows are cached under `records:<entity_set>:<id>` and
/// dropped on update and delete. Cache failures are logged and bypassed.
pub struct DataverseRepository<R> {
    api: Arc<dyn DataverseApi>,
    cache: Cache,
    _record: PhantomData<fn() -> R>,
}

impl<R: Table> DataverseRepository<R> {
    pub fn new(api: Arc<dyn DataverseApi>, cache: Cache) -> Self {
        Self {
            api,
            cache,
            _record: PhantomData,
        }
    }

    fn decode(row: &Value) -> AppResult<R> {
        let fields = from_remote(R::COLUMNS, R::ID_COLUMN, row)?;
        serde_json::from_value(fields).map_err(|e| {
            AppError::internal(format!("{} row does not decode: {}", R::RESOURCE, e))
        })
    }

    fn encode<T: Serialize>(value: &T) -> AppResult<Value> {
        let fields = serde_json::to_value(value)
            .map_err(|e| AppError::internal(format!("{} body does not encode: {}", R::RESOURCE, e)))?;
        let fields = fields
            .as_object()
            .ok_or_else(|| AppError::internal(format!("{} body is not an object", R::RESOURCE)))?;
        Ok(Value::Object(to_remote(R::COLUMNS, fields)?))
    }

    fn translate_filter(filter: &FieldFilter) -> AppResult<Filter> {
        if filter.field == "id" {
            let id = filter
                .value
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| AppError::validation("id filter must be a UUID"))?;
            return Ok(Filter::new(R::ID_COLUMN, filter.op, Literal::Guid(id)));
        }

        let column = find_column(R::COLUMNS, &filter.field).ok_or_else(|| {
            AppError::validation(format!("{} cannot be filtered by {}", R::RESOURCE, filter.field))
        })?;
        let literal = column
            .to_literal(&filter.value)
            .map_err(|e| AppError::validation(e.to_string()))?;
        Ok(Filter::new(column.read_key(), filter.op, literal))
    }

    fn translate_query(query: &RecordQuery) -> AppResult<ODataQuery> {
        let mut odata = ODataQuery::new();
        for filter in &query.filters {
            odata = odata.filter(Self::translate_filter(filter)?);
        }
        if let Some((field, descending)) = &query.order_by {
            let column = find_column(R::COLUMNS, field).ok_or_else(|| {
                AppError::validation(format!("{} cannot be ordered by {}", R::RESOURCE, field))
            })?;
            odata = odata.order_by(column.read_key(), *descending);
        }
        if let Some(top) = query.top {
            odata = odata.top(top);
        }
        Ok(odata)
    }

    async fn cache_row(&self, id: Uuid, row: &Value) {
        let key = record_cache_key(R::ENTITY_SET, id);
        if let Err(e) = self
            .cache
            .set_json(&key, row, Some(self.cache.default_ttl()))
            .await
        {
            tracing::warn!(error = %e, key = %key, "Failed to cache record");
        }
    }

    async fn evict(&self, id: Uuid) {
        let key = record_cache_key(R::ENTITY_SET, id);
        if let Err(e) = self.cache.delete(&key).await {
            tracing::warn!(error = %e, key = %key, "Failed to evict cached record");
        }
    }
}

#[async_trait]
impl<R: Table> RecordRepository<R> for DataverseRepository<R> {
    async fn create(&self, draft: &R::Draft) -> AppResult<R> {
        let body = Self::encode(draft)?;
        let row = self.api.create(R::table_ref(), &body).await?;
        let record = Self::decode(&row)?;
        self.cache_row(record.id(), &row).await;

        tracing::info!(resource = R::RESOURCE, id = %record.id(), "Record created");
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<R>> {
        let key = record_cache_key(R::ENTITY_SET, id);
        match self.cache.get_json::<Value>(&key).await {
            Ok(Some(row)) => {
                tracing::debug!(key = %key, "Cache hit");
                return Self::decode(&row).map(Some);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, key = %key, "Cache read failed"),
        }

        let row = match self.api.retrieve(R::table_ref(), id).await {
            Ok(row) => row,
            Err(DataverseError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.cache_row(id, &row).await;
        Self::decode(&row).map(Some)
    }

    async fn find(&self, query: &RecordQuery) -> AppResult<Vec<R>> {
        let odata = Self::translate_query(query)?;
        let rows = self.api.query(R::table_ref(), &odata).await?;
        rows.iter().map(Self::decode).collect()
    }

    async fn update(&self, id: Uuid, patch: &R::Patch) -> AppResult<R> {
        let body = Self::encode(patch)?;
        self.evict(id).await;
        let row = match self.api.update(R::table_ref(), id, &body).await {
            Ok(row) => row,
            Err(DataverseError::NotFound) => return Err(AppError::not_found(R::RESOURCE, id)),
            Err(e) => return Err(e.into()),
        };
        self.cache_row(id, &row).await;

        tracing::info!(resource = R::RESOURCE, id = %id, "Record updated");
        Self::decode(&row)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.evict(id).await;
        match self.api.delete(R::table_ref(), id).await {
            Ok(()) => {}
            Err(DataverseError::NotFound) => return Err(AppError::not_found(R::RESOURCE, id)),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(resource = R::RESOURCE, id = %id, "Record deleted");
        Ok(())
    }
}
