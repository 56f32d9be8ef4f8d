//! # Configuration Module
//!
//! Configuration for the CMS access layer.
//!
//! ## Key Features
//! - YAML parsing with serde; every section has defaults
//! - Environment variable overrides for deployment-specific values
//! - Validation with detailed error messages
//!
//! Overrides go through an injectable lookup function so they can be tested
//! without touching the process environment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::caching::{CacheBackend, CacheConfig};
use crate::core::error::{CmsError, CmsResult};
use crate::observability::logging::{LogConfig, LogFormat};

/// Root configuration of the CMS access layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayCmsConfig {
    /// Upstream CMS connection
    pub cms: CmsConfig,

    /// Response cache
    pub cache: CacheConfig,

    /// Logging
    pub logging: LogConfig,
}

/// Which upstream transport and schema generation the deployment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamFlavor {
    /// Strapi REST API, v4 `{id, attributes}` envelopes or v5 flat entries
    Rest,
    /// Strapi v5 GraphQL API
    #[serde(alias = "graph_ql")]
    GraphQl,
}

impl FromStr for UpstreamFlavor {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rest" => Ok(Self::Rest),
            "graphql" => Ok(Self::GraphQl),
            other => Err(CmsError::config(format!("Unknown upstream flavor: {}", other))),
        }
    }
}

/// Upstream CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// REST API base, e.g. `http://localhost:1337/api`
    pub base_url: String,

    /// GraphQL endpoint
    pub graphql_url: String,

    /// Prefix for relative media URLs
    pub media_base_url: String,

    /// Bearer token for the upstream API
    #[serde(skip_serializing)]
    pub token: Option<String>,

    pub flavor: UpstreamFlavor,

    /// Whole-request timeout for one upstream call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Idle pooled connections kept per upstream host
    pub max_idle_per_host: usize,

    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// TTL used when a call does not supply one
    #[serde(with = "humantime_serde")]
    pub default_cache_ttl: Duration,

    /// Share one upstream fetch between concurrent misses on a key
    pub coalesce_requests: bool,

    /// Parallel variant lookups inside aggregate views
    pub aggregate_concurrency: usize,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1337/api".to_string(),
            graphql_url: "http://localhost:1337/graphql".to_string(),
            media_base_url: "http://localhost:1337".to_string(),
            token: None,
            flavor: UpstreamFlavor::GraphQl,
            request_timeout: Duration::from_secs(30),
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            default_cache_ttl: Duration::from_secs(300),
            coalesce_requests: true,
            aggregate_concurrency: 4,
        }
    }
}

impl GatewayCmsConfig {
    /// Load configuration from a YAML file, then apply environment overrides
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> CmsResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CmsError::config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text without overrides
    pub fn from_yaml(content: &str) -> CmsResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| CmsError::config(format!("Failed to parse config: {}", e)))
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> CmsResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> CmsResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> CmsResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // Upstream
        if let Some(url) = var("CMS_SERVICE_URL") {
            self.cms.base_url = url;
        }
        if let Some(url) = var("CMS_GRAPHQL_URL") {
            self.cms.graphql_url = url;
        }
        if let Some(url) = var("CMS_MEDIA_BASE_URL") {
            self.cms.media_base_url = url;
        }
        if let Some(token) = var("CMS_SERVICE_TOKEN") {
            self.cms.token = Some(token);
        }
        if let Some(flavor) = var("CMS_UPSTREAM_FLAVOR") {
            self.cms.flavor = flavor.parse()?;
        }
        if let Some(timeout) = var("CMS_REQUEST_TIMEOUT") {
            self.cms.request_timeout = parse_duration("CMS_REQUEST_TIMEOUT", &timeout)?;
        }
        if let Some(ttl) = var("CMS_DEFAULT_CACHE_TTL") {
            self.cms.default_cache_ttl = parse_duration("CMS_DEFAULT_CACHE_TTL", &ttl)?;
        }

        // Cache
        if let Some(enabled) = var("CMS_CACHE_ENABLED") {
            self.cache.enabled = parse_bool("CMS_CACHE_ENABLED", &enabled)?;
        }
        if let Some(backend) = var("CMS_CACHE_BACKEND") {
            self.cache.backend = match backend.trim().to_lowercase().as_str() {
                "redis" => CacheBackend::Redis,
                "memory" => CacheBackend::Memory,
                other => {
                    return Err(CmsError::config(format!(
                        "Invalid CMS_CACHE_BACKEND: {}",
                        other
                    )))
                }
            };
        }
        if let Some(addr) = var("REDIS_ADDR") {
            self.cache.redis.url = if addr.contains("://") {
                addr
            } else {
                format!("redis://{}", addr)
            };
        }
        if let Some(password) = var("REDIS_PASSWORD") {
            self.cache.redis.password = Some(password);
        }
        if let Some(prefix) = var("CMS_CACHE_PREFIX") {
            self.cache.redis.key_prefix = prefix;
        }

        // Logging
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = format.parse::<LogFormat>()?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> CmsResult<()> {
        match self.cms.flavor {
            UpstreamFlavor::Rest => validate_url("cms.base_url", &self.cms.base_url)?,
            UpstreamFlavor::GraphQl => validate_url("cms.graphql_url", &self.cms.graphql_url)?,
        }

        if !self.cms.media_base_url.is_empty() {
            validate_url("cms.media_base_url", &self.cms.media_base_url)?;
        }

        if self.cms.request_timeout.is_zero() {
            return Err(CmsError::config("cms.request_timeout must be greater than zero"));
        }

        if self.cms.aggregate_concurrency == 0 {
            return Err(CmsError::config("cms.aggregate_concurrency must be at least 1"));
        }

        if self.cache.enabled {
            match self.cache.backend {
                CacheBackend::Redis => {
                    if !self.cache.redis.url.starts_with("redis://")
                        && !self.cache.redis.url.starts_with("rediss://")
                    {
                        return Err(CmsError::config(format!(
                            "cache.redis.url must use redis:// or rediss://, got {}",
                            self.cache.redis.redacted_url()
                        )));
                    }
                    if self.cache.redis.scan_count == 0 {
                        return Err(CmsError::config("cache.redis.scan_count must be at least 1"));
                    }
                }
                CacheBackend::Memory => {
                    if self.cache.memory.max_entries == 0 {
                        return Err(CmsError::config("cache.memory.max_entries must be at least 1"));
                    }
                }
            }
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> CmsResult<()> {
    let url = Url::parse(value)
        .map_err(|e| CmsError::config(format!("Invalid {} '{}': {}", field, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(CmsError::config(format!(
            "Invalid {}: unsupported scheme {}",
            field, scheme
        ))),
    }
}

fn parse_duration(name: &str, value: &str) -> CmsResult<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| CmsError::config(format!("Invalid {}: {}", name, e)))
}

fn parse_bool(name: &str, value: &str) -> CmsResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CmsError::config(format!("Invalid {}: {}", name, other))),
    }
}
