//! # CMS Transport Client
//!
//! HTTP access to the upstream CMS over REST or GraphQL with cache-around-fetch.
//!
//! ## Request flow
//! 1. Build the cache key from the resource and query (or the GraphQL document)
//! 2. On a hit, return the cached body
//! 3. On a miss, fetch upstream (once per key when coalescing is enabled)
//! 4. Store the body only when it was fully read, 2xx, valid JSON and, for
//!    GraphQL, free of `errors`
//!
//! A failing cache never fails a request: read errors count as misses and
//! write errors are logged. Every await is raced against the request context
//! so a cancelled client aborts its upstream call.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::caching::{self, graphql_key, CacheError, CacheKeyBuilder, CacheStore, RequestCoalescer};
use crate::cms::models::{
    CacheOptions, CollectionQuery, ItemQuery, MediaBase, MediaUrlResolver, StrapiErrorEnvelope,
};
use crate::core::config::{CmsConfig, GatewayCmsConfig, UpstreamFlavor};
use crate::core::context::RequestContext;
use crate::core::error::{CmsError, CmsResult};

/// Upper bound of upstream body text copied into error messages
const ERROR_BODY_LIMIT: usize = 512;

/// One GraphQL operation
#[derive(Debug, Clone)]
pub struct GraphQlRequest<'a> {
    /// Resource the operation reads; scopes its cache key for invalidation
    pub scope: &'a str,
    pub query: &'a str,
    pub variables: Value,
}

impl<'a> GraphQlRequest<'a> {
    pub fn new(scope: &'a str, query: &'a str) -> Self {
        Self {
            scope,
            query,
            variables: Value::Object(Default::default()),
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }
}

/// Upstream access used by the resource services
#[async_trait]
pub trait CmsTransport: MediaUrlResolver + Send + Sync {
    /// Transport and schema generation this client talks to
    fn flavor(&self) -> UpstreamFlavor;

    /// `GET {base}/{endpoint}` with pagination, populate, locale, sort, fields and filters
    async fn fetch_collection(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        query: &CollectionQuery,
        cache: CacheOptions,
    ) -> CmsResult<Bytes>;

    /// `GET {base}/{endpoint}/{id}`
    async fn fetch_item(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        id: &str,
        query: &ItemQuery,
        cache: CacheOptions,
    ) -> CmsResult<Bytes>;

    /// `GET {base}/{endpoint}` for single types
    async fn fetch_singleton(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        query: &ItemQuery,
        cache: CacheOptions,
    ) -> CmsResult<Bytes>;

    /// POST a GraphQL operation and return its `data` member
    async fn execute_graphql(
        &self,
        ctx: &RequestContext,
        request: &GraphQlRequest<'_>,
        cache: CacheOptions,
    ) -> CmsResult<Bytes>;

    /// Delete cached entries matching `pattern`; `None` clears the whole namespace
    async fn invalidate(&self, ctx: &RequestContext, pattern: Option<&str>) -> CmsResult<()>;
}

/// Pooled HTTP client for the upstream CMS
pub struct CmsClient {
    http: HttpClient,
    rest_base: Url,
    graphql_url: Url,
    media: MediaBase,
    token: Option<String>,
    flavor: UpstreamFlavor,
    cache: Arc<dyn CacheStore>,
    default_ttl: Duration,
    coalescer: Option<RequestCoalescer>,
}

#[derive(Serialize)]
struct GraphQlBody<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

impl CmsClient {
    /// Create a client sharing the given cache store
    pub fn new(config: &CmsConfig, cache: Arc<dyn CacheStore>) -> CmsResult<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.idle_timeout)
            .build()
            .map_err(|e| CmsError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            rest_base: parse_base("cms.base_url", &config.base_url)?,
            graphql_url: parse_base("cms.graphql_url", &config.graphql_url)?,
            media: MediaBase::new(config.media_base_url.clone()),
            token: config.token.clone().filter(|t| !t.is_empty()),
            flavor: config.flavor,
            cache,
            default_ttl: config.default_cache_ttl,
            coalescer: config.coalesce_requests.then(RequestCoalescer::new),
        })
    }

    /// Validate the configuration, connect the configured cache and build the client
    pub async fn from_config(config: &GatewayCmsConfig) -> CmsResult<Self> {
        config.validate()?;
        let cache = caching::connect(&config.cache).await;

        info!(
            flavor = ?config.cms.flavor,
            base_url = %config.cms.base_url,
            graphql_url = %config.cms.graphql_url,
            "CMS client configured"
        );
        Self::new(&config.cms, cache)
    }

    pub fn media_base(&self) -> &str {
        self.media.as_str()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn resource_url(&self, segments: &[&str]) -> CmsResult<Url> {
        let mut url = self.rest_base.clone();
        url.path_segments_mut()
            .map_err(|_| CmsError::config(format!("CMS base URL cannot carry a path: {}", self.rest_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send one request and read the whole body
    async fn round_trip(
        &self,
        ctx: &RequestContext,
        request: RequestBuilder,
        resource: &str,
    ) -> CmsResult<(StatusCode, Bytes)> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = ctx.guard(request.send()).await??;
        let status = response.status();
        let body = ctx.guard(response.bytes()).await??;

        metrics::counter!(
            "cms_upstream_requests_total",
            "resource" => resource.to_string(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);
        debug!(resource, status = status.as_u16(), bytes = body.len(), "Upstream response");

        Ok((status, body))
    }

    async fn get_rest(&self, ctx: &RequestContext, url: Url, resource: &str) -> CmsResult<Bytes> {
        let (status, body) = self.round_trip(ctx, self.http.get(url), resource).await?;
        if !status.is_success() {
            return Err(rest_error(status, &body));
        }
        if serde_json::from_slice::<serde::de::IgnoredAny>(&body).is_err() {
            return Err(CmsError::transport(
                Some(status.as_u16()),
                format!("malformed upstream body: {}", excerpt(&body)),
            ));
        }
        Ok(body)
    }

    async fn post_graphql(&self, ctx: &RequestContext, request: &GraphQlRequest<'_>) -> CmsResult<Bytes> {
        let builder = self.http.post(self.graphql_url.clone()).json(&GraphQlBody {
            query: request.query,
            variables: &request.variables,
        });
        let (status, body) = self.round_trip(ctx, builder, request.scope).await?;

        let response: GraphQlResponse = match serde_json::from_slice(&body) {
            Ok(response) => response,
            Err(_) if !status.is_success() => return Err(rest_error(status, &body)),
            Err(e) => {
                return Err(CmsError::transport(
                    Some(status.as_u16()),
                    format!("malformed GraphQL response: {}", e),
                ))
            }
        };

        // Errors fail the call even when partial data came back
        let errors = response.errors.unwrap_or_default();
        if !errors.is_empty() {
            return Err(CmsError::GraphQl {
                messages: errors.into_iter().map(|e| e.message).collect(),
            });
        }
        if !status.is_success() {
            return Err(rest_error(status, &body));
        }

        let data = response.data.unwrap_or(Value::Null);
        serde_json::to_vec(&data)
            .map(Bytes::from)
            .map_err(|e| CmsError::transport(Some(status.as_u16()), e.to_string()))
    }

    /// Serve from cache or run `fetch` and store its body
    async fn cached<F>(&self, ctx: &RequestContext, key: String, cache: CacheOptions, fetch: F) -> CmsResult<Bytes>
    where
        F: Future<Output = CmsResult<Bytes>> + Send,
    {
        if !cache.enabled {
            return fetch.await;
        }

        match self.cache.get(ctx, &key).await {
            Ok(Some(bytes)) => {
                metrics::counter!("cms_cache_hits_total").increment(1);
                debug!("Cache hit for key: {}", key);
                return Ok(Bytes::from(bytes));
            }
            Ok(None) => {
                metrics::counter!("cms_cache_misses_total").increment(1);
                debug!("Cache miss for key: {}", key);
            }
            Err(CacheError::Cancelled) => return Err(CmsError::Cancelled),
            Err(e) => {
                metrics::counter!("cms_cache_misses_total").increment(1);
                warn!(error = %e, key = %key, "Cache read failed, fetching from upstream");
            }
        }

        let ttl = cache.ttl.unwrap_or(self.default_ttl);
        let fetch_and_store = async {
            let body = fetch.await?;
            if let Err(e) = self.cache.set(ctx, &key, &body, ttl).await {
                warn!(error = %e, key = %key, "Failed to store upstream response in cache");
            }
            Ok(body)
        };

        match &self.coalescer {
            Some(coalescer) => coalescer.run(ctx, &key, fetch_and_store).await,
            None => fetch_and_store.await,
        }
    }
}

impl MediaUrlResolver for CmsClient {
    fn resolve_media_url(&self, url: &str) -> String {
        self.media.resolve_media_url(url)
    }
}

#[async_trait]
impl CmsTransport for CmsClient {
    fn flavor(&self) -> UpstreamFlavor {
        self.flavor
    }

    #[instrument(skip(self, ctx, query, cache), fields(trace_id = %ctx.trace_id))]
    async fn fetch_collection(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        query: &CollectionQuery,
        cache: CacheOptions,
    ) -> CmsResult<Bytes> {
        let mut url = self.resource_url(&[endpoint])?;
        let params = collection_params(query);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        let key = CacheKeyBuilder::new(endpoint).collection(query).build();
        self.cached(ctx, key, cache, self.get_rest(ctx, url, endpoint)).await
    }

    #[instrument(skip(self, ctx, query, cache), fields(trace_id = %ctx.trace_id))]
    async fn fetch_item(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        id: &str,
        query: &ItemQuery,
        cache: CacheOptions,
    ) -> CmsResult<Bytes> {
        let mut url = self.resource_url(&[endpoint, id])?;
        let params = item_params(query);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        let key = CacheKeyBuilder::new(endpoint).part(id).item(query).build();
        self.cached(ctx, key, cache, self.get_rest(ctx, url, endpoint)).await
    }

    #[instrument(skip(self, ctx, query, cache), fields(trace_id = %ctx.trace_id))]
    async fn fetch_singleton(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        query: &ItemQuery,
        cache: CacheOptions,
    ) -> CmsResult<Bytes> {
        let mut url = self.resource_url(&[endpoint])?;
        let params = item_params(query);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        let key = CacheKeyBuilder::new(endpoint).part("single").item(query).build();
        self.cached(ctx, key, cache, self.get_rest(ctx, url, endpoint)).await
    }

    #[instrument(skip(self, ctx, request, cache), fields(trace_id = %ctx.trace_id, scope = request.scope))]
    async fn execute_graphql(
        &self,
        ctx: &RequestContext,
        request: &GraphQlRequest<'_>,
        cache: CacheOptions,
    ) -> CmsResult<Bytes> {
        let key = graphql_key(request.scope, request.query, &request.variables);
        self.cached(ctx, key, cache, self.post_graphql(ctx, request)).await
    }

    async fn invalidate(&self, ctx: &RequestContext, pattern: Option<&str>) -> CmsResult<()> {
        let pattern = pattern.unwrap_or("*");
        info!(pattern, "Invalidating CMS cache");
        self.cache.delete_pattern(ctx, pattern).await?;
        Ok(())
    }
}

fn parse_base(field: &str, value: &str) -> CmsResult<Url> {
    Url::parse(value.trim_end_matches('/'))
        .map_err(|e| CmsError::config(format!("Invalid {} '{}': {}", field, value, e)))
}

/// Upstream query parameters of a collection request, in wire order
pub fn collection_params(query: &CollectionQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if query.page > 0 {
        params.push(("pagination[page]".to_string(), query.page.to_string()));
    }
    if query.page_size > 0 {
        params.push(("pagination[pageSize]".to_string(), query.page_size.to_string()));
    }
    if !query.populate.is_empty() {
        params.push(("populate".to_string(), query.populate.clone()));
    }
    if !query.locale.is_empty() {
        params.push(("locale".to_string(), query.locale.clone()));
    }
    for (i, sort) in query.sort.iter().enumerate() {
        params.push((format!("sort[{}]", i), sort.clone()));
    }
    for (i, field) in query.fields.iter().enumerate() {
        params.push((format!("fields[{}]", i), field.clone()));
    }
    for (key, value) in &query.filters {
        params.push((key.clone(), value.clone()));
    }
    params
}

/// Upstream query parameters of an item or singleton request
pub fn item_params(query: &ItemQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if !query.populate.is_empty() {
        params.push(("populate".to_string(), query.populate.clone()));
    }
    if !query.locale.is_empty() {
        params.push(("locale".to_string(), query.locale.clone()));
    }
    for (i, field) in query.fields.iter().enumerate() {
        params.push((format!("fields[{}]", i), field.clone()));
    }
    params
}

/// Error for a non-2xx upstream response, preferring the Strapi error envelope
fn rest_error(status: StatusCode, body: &[u8]) -> CmsError {
    if let Ok(envelope) = serde_json::from_slice::<StrapiErrorEnvelope>(body) {
        if !envelope.error.message.is_empty() {
            return CmsError::Upstream {
                status: status.as_u16(),
                name: envelope.error.name,
                message: envelope.error.message,
            };
        }
    }
    CmsError::transport(
        Some(status.as_u16()),
        format!("request failed with status {}: {}", status.as_u16(), excerpt(body)),
    )
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::InMemoryCache;

    fn client(config: CmsConfig) -> CmsClient {
        CmsClient::new(&config, Arc::new(InMemoryCache::new(Default::default()))).unwrap()
    }

    #[test]
    fn test_collection_params_order() {
        let query = CollectionQuery::new()
            .with_page(2)
            .with_page_size(25)
            .with_populate("*")
            .with_locale("ar")
            .with_sort("Name:asc")
            .with_field("Name")
            .with_filter("filters[brand][id][$eq]", "7");

        let params = collection_params(&query);
        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "pagination[page]",
                "pagination[pageSize]",
                "populate",
                "locale",
                "sort[0]",
                "fields[0]",
                "filters[brand][id][$eq]"
            ]
        );
        assert!(collection_params(&CollectionQuery::new()).is_empty());
    }

    #[test]
    fn test_resource_url_trims_trailing_slash() {
        let client = client(CmsConfig {
            base_url: "http://cms.local/api/".to_string(),
            ..Default::default()
        });
        let url = client.resource_url(&["car-models", "abc"]).unwrap();
        assert_eq!(url.as_str(), "http://cms.local/api/car-models/abc");
    }

    #[test]
    fn test_rest_error_prefers_envelope() {
        let body = br#"{"data":null,"error":{"status":404,"name":"NotFoundError","message":"Not Found","details":{}}}"#;
        assert_eq!(
            rest_error(StatusCode::NOT_FOUND, body),
            CmsError::Upstream {
                status: 404,
                name: "NotFoundError".to_string(),
                message: "Not Found".to_string(),
            }
        );

        let err = rest_error(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert_eq!(err.upstream_status(), Some(502));
        assert!(err.to_string().contains("request failed with status 502"));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(ERROR_BODY_LIMIT + 10);
        assert_eq!(excerpt(long.as_bytes()).len(), ERROR_BODY_LIMIT + 3);
        assert_eq!(excerpt(b"short"), "short");
    }

    #[test]
    fn test_media_resolution_uses_media_base() {
        let client = client(CmsConfig {
            media_base_url: "https://media.example.com/".to_string(),
            ..Default::default()
        });
        assert_eq!(
            client.resolve_media_url("/uploads/a.png"),
            "https://media.example.com/uploads/a.png"
        );
        assert_eq!(client.resolve_media_url(""), "");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = CmsClient::new(
            &CmsConfig {
                base_url: "not a url".to_string(),
                ..Default::default()
            },
            Arc::new(InMemoryCache::new(Default::default())),
        )
        .err()
        .unwrap();
        assert!(matches!(err, CmsError::Configuration { .. }));
    }
}
