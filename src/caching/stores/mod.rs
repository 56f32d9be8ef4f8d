//! # Cache Stores Module
//!
//! The [`CacheStore`] capability and its backends: Redis, in-memory and no-op.

pub mod memory;
pub mod noop;
pub mod redis_store;

pub use memory::{InMemoryCache, InMemoryCacheConfig};
pub use noop::NoOpCache;
pub use redis_store::{RedisCache, RedisCacheConfig};

use super::CacheResult;
use crate::core::context::RequestContext;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store with TTL and pattern-based bulk delete.
///
/// A miss is `Ok(None)`, distinct from a present-but-empty value
/// (`Ok(Some(vec![]))`). Keys are relative to the store's namespace.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, ctx: &RequestContext, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Set a value in the cache with TTL
    async fn set(&self, ctx: &RequestContext, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Delete the given keys; an empty slice is a no-op
    async fn delete(&self, ctx: &RequestContext, keys: &[String]) -> CacheResult<()>;

    /// Delete every key matching a glob pattern
    async fn delete_pattern(&self, ctx: &RequestContext, pattern: &str) -> CacheResult<()>;

    /// Check if a key exists in the cache
    async fn exists(&self, ctx: &RequestContext, key: &str) -> CacheResult<bool>;
}
