use async_trait::async_trait;
use uuid::Uuid;

use super::record::{Record, RecordQuery};
use crate::error::AppResult;

/// Persistence operations for one record type
#[async_trait]
pub trait RecordRepository<R: Record>: Send + Sync {
    async fn create(&self, draft: &R::Draft) -> AppResult<R>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<R>>;

    async fn find(&self, query: &RecordQuery) -> AppResult<Vec<R>>;

    async fn find_one(&self, query: &RecordQuery) -> AppResult<Option<R>> {
        let query = query.clone().top(1);
        Ok(self.find(&query).await?.into_iter().next())
    }

    async fn update(&self, id: Uuid, patch: &R::Patch) -> AppResult<R>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}
