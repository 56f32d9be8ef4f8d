//! # Caching System Module
//!
//! Response cache for the CMS access layer.
//!
//! ## Architecture
//! 1. **Cache Stores**: the [`CacheStore`] capability with three interchangeable
//!    backends: Redis, in-memory and a disabled no-op store
//! 2. **Key Generation**: deterministic keys from resource name + query options, or
//!    from a hash of a GraphQL document and its variables
//! 3. **Deduplication**: single-flight coalescing of concurrent misses on one key
//!
//! The concrete store is chosen once at startup by [`connect`] and injected into
//! the transport client as `Arc<dyn CacheStore>`.
//!
//! ## Usage Example
//! ```rust,no_run
//! use std::time::Duration;
//! use cms_gateway::caching::{self, CacheConfig};
//! use cms_gateway::core::context::RequestContext;
//!
//! # async fn example() -> cms_gateway::caching::CacheResult<()> {
//! let cache = caching::connect(&CacheConfig::default()).await;
//! let ctx = RequestContext::new();
//!
//! cache.set(&ctx, "cms_brands:page:1", b"[]", Duration::from_secs(300)).await?;
//! if let Some(bytes) = cache.get(&ctx, "cms_brands:page:1").await? {
//!     assert_eq!(bytes, b"[]");
//! }
//! # Ok(())
//! # }
//! ```

pub mod deduplication;
pub mod key_generator;
pub mod stores;

pub use deduplication::RequestCoalescer;
pub use key_generator::{graphql_key, graphql_pattern, CacheKeyBuilder, GRAPHQL_NAMESPACE, KEY_NAMESPACE};
pub use stores::{CacheStore, InMemoryCache, InMemoryCacheConfig, NoOpCache, RedisCache, RedisCacheConfig};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::context::Interrupted;
use crate::core::error::CmsError;

/// Cache operation result
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache store error: {message}")]
    Store { message: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid key pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Cache configuration error: {message}")]
    Configuration { message: String },

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Cache operation cancelled")]
    Cancelled,
}

impl From<Interrupted> for CacheError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded { .. } => Self::Timeout,
        }
    }
}

impl From<CacheError> for CmsError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Cancelled => CmsError::Cancelled,
            other => CmsError::Cache {
                message: other.to_string(),
            },
        }
    }
}

/// Which store backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disable to always fetch fresh data
    pub enabled: bool,

    /// Store used when enabled
    pub backend: CacheBackend,

    /// Redis backend settings
    pub redis: RedisCacheConfig,

    /// In-memory backend settings
    pub memory: InMemoryCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Redis,
            redis: RedisCacheConfig::default(),
            memory: InMemoryCacheConfig::default(),
        }
    }
}

/// Build the configured cache store.
///
/// An unreachable Redis is not fatal: the gateway falls back to [`NoOpCache`]
/// and keeps serving fresh upstream data.
pub async fn connect(config: &CacheConfig) -> Arc<dyn CacheStore> {
    if !config.enabled {
        info!("CMS cache disabled by configuration");
        return Arc::new(NoOpCache);
    }

    match config.backend {
        CacheBackend::Memory => {
            info!(max_entries = config.memory.max_entries, "Using in-memory CMS cache");
            Arc::new(InMemoryCache::new(config.memory.clone()))
        }
        CacheBackend::Redis => match RedisCache::connect(config.redis.clone()).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                warn!(
                    error = %e,
                    url = %config.redis.redacted_url(),
                    "Redis connection failed, running without cache"
                );
                Arc::new(NoOpCache)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::RequestContext;
    use std::time::Duration;

    #[tokio::test]
    async fn test_disabled_cache_is_noop() {
        let config = CacheConfig {
            enabled: false,
            backend: CacheBackend::Memory,
            ..Default::default()
        };
        let cache = connect(&config).await;
        let ctx = RequestContext::new();

        cache.set(&ctx, "k", b"v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&ctx, "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_noop() {
        let mut config = CacheConfig::default();
        config.redis.url = "redis://127.0.0.1:1".to_string();
        config.redis.connection_timeout = Duration::from_millis(200);

        let cache = connect(&config).await;
        let ctx = RequestContext::new();

        cache.set(&ctx, "k", b"v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&ctx, "k").await.unwrap(), None);
        assert!(!cache.exists(&ctx, "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_backend_round_trip() {
        let config = CacheConfig {
            backend: CacheBackend::Memory,
            ..Default::default()
        };
        let cache = connect(&config).await;
        let ctx = RequestContext::new();

        cache.set(&ctx, "k", b"v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&ctx, "k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_cancelled_cache_error_maps_to_cancelled() {
        let err: CmsError = CacheError::Cancelled.into();
        assert_eq!(err, CmsError::Cancelled);

        let err: CmsError = CacheError::Timeout.into();
        assert!(matches!(err, CmsError::Cache { .. }));
    }
}
