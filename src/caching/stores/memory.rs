//! # In-Memory Cache Store
//!
//! Process-local [`CacheStore`] for development and tests. Entries expire
//! lazily on access; when the store is full, expired entries are purged first
//! and then the entry closest to expiry is evicted.

use super::CacheStore;
use crate::caching::CacheResult;
use crate::core::context::RequestContext;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// In-memory cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self { max_entries: 10_000 }
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    data: Vec<u8>,
    expires_at: Instant,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory cache implementation
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    config: InMemoryCacheConfig,
    entries: Arc<DashMap<String, StoredValue>>,
}

impl InMemoryCache {
    /// Create a new in-memory cache
    pub fn new(config: InMemoryCacheConfig) -> Self {
        Self {
            config,
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.value().is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, value| !value.is_expired(now));
        before - self.entries.len()
    }

    /// Make room for one more entry
    fn ensure_capacity(&self) {
        if self.entries.len() < self.config.max_entries {
            return;
        }

        let purged = self.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired in-memory cache entries", purged);
        }

        while self.entries.len() >= self.config.max_entries.max(1) {
            let victim = self
                .entries
                .iter()
                .min_by_key(|e| e.value().expires_at)
                .map(|e| e.key().clone());

            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                    debug!("Evicted in-memory cache key: {}", key);
                }
                None => break,
            }
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(InMemoryCacheConfig::default())
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, ctx: &RequestContext, key: &str) -> CacheResult<Option<Vec<u8>>> {
        ctx.check()?;
        let now = Instant::now();

        let value = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.data.clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        if value.is_none() {
            self.entries.remove_if(key, |_, v| v.is_expired(now));
        }
        Ok(value)
    }

    async fn set(&self, ctx: &RequestContext, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        ctx.check()?;

        if !self.entries.contains_key(key) {
            self.ensure_capacity();
        }

        self.entries.insert(
            key.to_string(),
            StoredValue {
                data: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, keys: &[String]) -> CacheResult<()> {
        ctx.check()?;
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn delete_pattern(&self, ctx: &RequestContext, pattern: &str) -> CacheResult<()> {
        ctx.check()?;
        let pattern = glob::Pattern::new(pattern)?;

        let before = self.entries.len();
        self.entries.retain(|key, _| !pattern.matches(key));
        debug!(
            pattern = %pattern,
            deleted = before.saturating_sub(self.entries.len()),
            "Invalidated in-memory cache keys"
        );
        Ok(())
    }

    async fn exists(&self, ctx: &RequestContext, key: &str) -> CacheResult<bool> {
        ctx.check()?;
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false))
    }
}
