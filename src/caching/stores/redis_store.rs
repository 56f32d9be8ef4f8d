//! # Redis Cache Store
//!
//! Redis-backed [`CacheStore`] sharing one multiplexed `ConnectionManager`
//! across all requests. Every key is namespaced with a configurable prefix so
//! the gateway's entries never collide with other users of the same Redis.

use super::CacheStore;
use crate::caching::{CacheError, CacheResult};
use crate::core::context::RequestContext;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, IntoConnectionInfo, RedisResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisCacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Password, applied on top of the URL when set
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Logical database
    pub db: i64,

    /// Key prefix for all cache entries
    pub key_prefix: String,

    /// Connection and initial PING timeout
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,

    /// Upper bound for a single cache round trip
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// SCAN page size used by pattern deletes
    pub scan_count: usize,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            password: None,
            db: 0,
            key_prefix: "cms:".to_string(),
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(2),
            scan_count: 100,
        }
    }
}

impl RedisCacheConfig {
    /// URL safe to log
    pub fn redacted_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut parsed) if parsed.password().is_some() => {
                let _ = parsed.set_password(Some("***"));
                parsed.to_string()
            }
            _ => self.url.clone(),
        }
    }
}

/// Redis cache implementation
#[derive(Clone)]
pub struct RedisCache {
    config: RedisCacheConfig,
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("url", &self.config.redacted_url())
            .field("key_prefix", &self.config.key_prefix)
            .finish()
    }
}

impl RedisCache {
    /// Connect and verify the server answers PING within the connection timeout
    pub async fn connect(config: RedisCacheConfig) -> CacheResult<Self> {
        let mut info = config.url.as_str().into_connection_info()?;
        if let Some(password) = config.password.as_ref().filter(|p| !p.is_empty()) {
            info.redis.password = Some(password.clone());
        }
        info.redis.db = config.db;

        let client = Client::open(info)?;

        let connect = async {
            let mut connection = ConnectionManager::new(client).await?;
            redis::cmd("PING")
                .query_async::<_, String>(&mut connection)
                .await?;
            Ok::<_, redis::RedisError>(connection)
        };

        let connection = tokio::time::timeout(config.connection_timeout, connect)
            .await
            .map_err(|_| CacheError::Timeout)??;

        info!(
            url = %config.redacted_url(),
            prefix = %config.key_prefix,
            "Redis cache connected"
        );

        Ok(Self { config, connection })
    }

    /// Get the full cache key with prefix
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    /// Run one Redis round trip under the request context and the operation timeout
    async fn run<T, F>(&self, ctx: &RequestContext, operation: F) -> CacheResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match ctx
            .guard(tokio::time::timeout(self.config.operation_timeout, operation))
            .await?
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, ctx: &RequestContext, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();

        let value = self
            .run(ctx, conn.get::<_, Option<Vec<u8>>>(&full_key))
            .await?;

        match &value {
            Some(_) => debug!("Redis cache hit for key: {}", key),
            None => debug!("Redis cache miss for key: {}", key),
        }
        Ok(value)
    }

    async fn set(&self, ctx: &RequestContext, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let full_key = self.full_key(key);
        // SETEX rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);
        let mut conn = self.connection.clone();

        self.run(ctx, conn.set_ex::<_, _, ()>(&full_key, value.to_vec(), ttl_seconds))
            .await?;

        debug!("Set Redis cache key: {} with TTL: {:?}", key, ttl);
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, keys: &[String]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let full_keys: Vec<String> = keys.iter().map(|k| self.full_key(k)).collect();
        let mut conn = self.connection.clone();

        self.run(ctx, conn.del::<_, ()>(&full_keys)).await?;
        debug!("Deleted {} Redis cache keys", full_keys.len());
        Ok(())
    }

    async fn delete_pattern(&self, ctx: &RequestContext, pattern: &str) -> CacheResult<()> {
        let full_pattern = self.full_key(pattern);
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;
        let mut deleted = 0usize;

        // Each SCAN page is deleted before the next one is requested, so memory
        // stays bounded regardless of the key space size.
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = self
                .run(
                    ctx,
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&full_pattern)
                        .arg("COUNT")
                        .arg(self.config.scan_count)
                        .query_async(&mut conn),
                )
                .await?;

            if !keys.is_empty() {
                deleted += keys.len();
                let mut del_conn = self.connection.clone();
                self.run(ctx, del_conn.del::<_, ()>(&keys)).await?;
            }

            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        info!(pattern = %full_pattern, deleted, "Invalidated Redis cache keys");
        Ok(())
    }

    async fn exists(&self, ctx: &RequestContext, key: &str) -> CacheResult<bool> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();

        self.run(ctx, conn.exists::<_, bool>(&full_key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testcontainers::core::WaitFor;
    use testcontainers::{clients::Cli, GenericImage};

    fn redis_image() -> GenericImage {
        GenericImage::new("redis", "7.2-alpine")
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
    }

    async fn connect_to(port: u16, prefix: &str) -> RedisCache {
        let config = RedisCacheConfig {
            url: format!("redis://127.0.0.1:{}", port),
            key_prefix: prefix.to_string(),
            ..Default::default()
        };
        RedisCache::connect(config).await.unwrap()
    }

    #[test]
    fn test_redacted_url() {
        let config = RedisCacheConfig {
            url: "redis://:secret@cache.internal:6379".to_string(),
            ..Default::default()
        };
        assert!(!config.redacted_url().contains("secret"));

        let config = RedisCacheConfig::default();
        assert_eq!(config.redacted_url(), "redis://localhost:6379");
    }

    #[tokio::test]
    #[ignore] // Requires Docker for Redis container
    async fn test_basic_operations() {
        let docker = Cli::default();
        let container = docker.run(redis_image());
        let cache = connect_to(container.get_host_port_ipv4(6379), "cms:").await;
        let ctx = RequestContext::new();

        cache.set(&ctx, "brands", b"payload", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&ctx, "brands").await.unwrap(), Some(b"payload".to_vec()));
        assert!(cache.exists(&ctx, "brands").await.unwrap());

        cache.set(&ctx, "empty", b"", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&ctx, "empty").await.unwrap(), Some(Vec::new()));
        assert_eq!(cache.get(&ctx, "missing").await.unwrap(), None);

        cache.delete(&ctx, &["brands".to_string()]).await.unwrap();
        assert!(!cache.exists(&ctx, "brands").await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires Docker for Redis container
    async fn test_delete_pattern_stays_in_namespace() {
        let docker = Cli::default();
        let container = docker.run(redis_image());
        let port = container.get_host_port_ipv4(6379);
        let cms = connect_to(port, "cms:").await;
        let other = connect_to(port, "other:").await;
        let ctx = RequestContext::new();
        let ttl = Duration::from_secs(60);

        for i in 0..250 {
            cms.set(&ctx, &format!("cms_brands:page:{}", i), b"x", ttl).await.unwrap();
        }
        cms.set(&ctx, "cms_car-models:page:1", b"x", ttl).await.unwrap();
        other.set(&ctx, "cms_brands:page:1", b"x", ttl).await.unwrap();

        cms.delete_pattern(&ctx, "cms_brands*").await.unwrap();

        assert!(!cms.exists(&ctx, "cms_brands:page:1").await.unwrap());
        assert!(!cms.exists(&ctx, "cms_brands:page:249").await.unwrap());
        assert!(cms.exists(&ctx, "cms_car-models:page:1").await.unwrap());
        assert!(other.exists(&ctx, "cms_brands:page:1").await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires Docker for Redis container
    async fn test_ttl_expiration() {
        let docker = Cli::default();
        let container = docker.run(redis_image());
        let cache = connect_to(container.get_host_port_ipv4(6379), "cms:").await;
        let ctx = RequestContext::new();

        cache.set(&ctx, "expire_test", b"value", Duration::from_secs(1)).await.unwrap();
        assert!(cache.exists(&ctx, "expire_test").await.unwrap());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&ctx, "expire_test").await.unwrap(), None);
    }
}
