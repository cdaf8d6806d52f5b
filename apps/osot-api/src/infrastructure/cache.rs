use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::{AppError, ErrorCode};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cached value for '{key}' is invalid: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Unavailable(_) => {
                AppError::with_detail(ErrorCode::CacheUnavailable, err.to_string())
            }
            CacheError::Corrupt { .. } => AppError::internal(err.to_string()),
        }
    }
}

/// Key-value store with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value`; `None` keeps it until deleted
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Returns whether the key existed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Deletes every key starting with `prefix` and returns how many were removed
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;

    /// Live keys starting with `prefix`
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Entry count at which a write first sweeps out expired entries
pub const DEFAULT_PURGE_THRESHOLD: usize = 1024;

/// In-process cache
///
/// Expired entries are dropped on access, and a write that finds the map at
/// its purge mark sweeps every expired entry. The mark then moves to twice
/// the surviving size so a map of live entries is not rescanned on each write.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    threshold: usize,
    purge_at: AtomicUsize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_purge_threshold(DEFAULT_PURGE_THRESHOLD)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_purge_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            entries: RwLock::new(HashMap::new()),
            threshold,
            purge_at: AtomicUsize::new(threshold),
        }
    }

    /// Drops every expired entry and returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        self.purge_at
            .store(self.threshold.max(entries.len() * 2), Ordering::Relaxed);
        before - entries.len()
    }

    /// Stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        let len = {
            let mut entries = self.entries.write().await;
            entries.insert(key.to_string(), entry);
            entries.len()
        };
        if len >= self.purge_at.load(Ordering::Relaxed) {
            let purged = self.purge_expired().await;
            tracing::debug!(purged, "Purged expired cache entries");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Typed JSON access over a [`CacheStore`]
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    pub fn in_memory(default_ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryCache::new()), default_ttl)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CacheError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.set(key, raw, ttl).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.store.delete(key).await
    }

    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        self.store.delete_prefix(prefix).await
    }

    pub async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        self.store.keys(prefix).await
    }
}
