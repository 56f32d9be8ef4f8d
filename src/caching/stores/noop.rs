//! # No-op Cache Store
//!
//! Used when caching is disabled or the backing store is unreachable.

use super::CacheStore;
use crate::caching::CacheResult;
use crate::core::context::RequestContext;
use async_trait::async_trait;
use std::time::Duration;

/// Store that accepts every write and never returns data
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

#[async_trait]
impl CacheStore for NoOpCache {
    async fn get(&self, _ctx: &RequestContext, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _ctx: &RequestContext, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _ctx: &RequestContext, _keys: &[String]) -> CacheResult<()> {
        Ok(())
    }

    async fn delete_pattern(&self, _ctx: &RequestContext, _pattern: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn exists(&self, _ctx: &RequestContext, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_operation_succeeds_and_misses() {
        let cache = NoOpCache;
        let ctx = RequestContext::new();

        cache.set(&ctx, "brands", b"payload", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&ctx, "brands").await.unwrap(), None);
        assert!(!cache.exists(&ctx, "brands").await.unwrap());
        cache.delete(&ctx, &["brands".to_string()]).await.unwrap();
        cache.delete_pattern(&ctx, "*").await.unwrap();
    }
}
