//! # Resource Services
//!
//! One stateless service per CMS resource. Each owns its endpoint name and
//! cache TTL, dispatches on the transport flavor and maps upstream records
//! into the response contracts in [`crate::cms::models::responses`].
//!
//! | Service | Endpoint | TTL |
//! |---|---|---|
//! | [`BrandService`] | `brands` | 1h |
//! | [`CarModelService`] | `car-models` | 20min |
//! | [`CarVariantService`] | `car-variants` | 15min |
//! | [`ShowroomService`] | `showrooms` | 30min |
//! | [`AdvertisementService`] | `advertisements` | 5min |
//! | [`GovernorateService`] | `governorates` | 24h |
//! | [`CityService`] | `cities` | 1h |
//! | [`AppVersionService`] | `application-version` | 10min |

pub mod advertisements;
pub mod aggregate;
pub mod app_version;
pub mod brands;
pub mod car_models;
pub mod car_variants;
pub mod cities;
pub mod governorates;
pub mod showrooms;

pub use advertisements::AdvertisementService;
pub use app_version::AppVersionService;
pub use brands::BrandService;
pub use car_models::CarModelService;
pub use car_variants::CarVariantService;
pub use cities::CityService;
pub use governorates::GovernorateService;
pub use showrooms::ShowroomService;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::caching::{graphql_pattern, CacheKeyBuilder};
use crate::cms::client::{CmsClient, CmsTransport, GraphQlRequest};
use crate::cms::models::{CacheOptions, CollectionEnvelope, CollectionQuery, Entry, ItemEnvelope, ItemQuery};
use crate::core::config::{GatewayCmsConfig, UpstreamFlavor};
use crate::core::context::RequestContext;
use crate::core::error::{CmsError, CmsResult};

/// Page size used to fetch a whole collection in one round trip
pub const FULL_SET_PAGE_SIZE: u32 = 1000;

/// Fetch and decode helpers bound to one endpoint
#[derive(Clone)]
pub struct ResourceClient {
    transport: Arc<dyn CmsTransport>,
    endpoint: &'static str,
    ttl: Duration,
}

impl ResourceClient {
    pub fn new(transport: Arc<dyn CmsTransport>, endpoint: &'static str, ttl: Duration) -> Self {
        Self {
            transport,
            endpoint,
            ttl,
        }
    }

    pub fn transport(&self) -> &dyn CmsTransport {
        self.transport.as_ref()
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn flavor(&self) -> UpstreamFlavor {
        self.transport.flavor()
    }

    pub fn cache_options(&self, use_cache: bool) -> CacheOptions {
        CacheOptions::when(use_cache, self.ttl)
    }

    /// REST collection; the request locale applies when the query has none
    pub async fn rest_collection<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        query: CollectionQuery,
        use_cache: bool,
    ) -> CmsResult<CollectionEnvelope<T>> {
        let query = query.or_locale(ctx.locale());
        let bytes = self
            .transport
            .fetch_collection(ctx, self.endpoint, &query, self.cache_options(use_cache))
            .await?;
        decode(self.endpoint, &bytes)
    }

    /// REST item; an upstream 404 or a null entity is `NotFound`
    pub async fn rest_item<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        id: &str,
        query: ItemQuery,
        use_cache: bool,
    ) -> CmsResult<Entry<T>> {
        let query = query.or_locale(ctx.locale());
        let bytes = self
            .transport
            .fetch_item(ctx, self.endpoint, id, &query, self.cache_options(use_cache))
            .await
            .map_err(|e| self.not_found_on_404(e, id))?;

        let envelope: ItemEnvelope<T> = decode(self.endpoint, &bytes)?;
        envelope
            .data
            .ok_or_else(|| CmsError::not_found(self.endpoint, id))
    }

    /// REST single type
    pub async fn rest_singleton<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        query: ItemQuery,
        use_cache: bool,
    ) -> CmsResult<Entry<T>> {
        let query = query.or_locale(ctx.locale());
        let bytes = self
            .transport
            .fetch_singleton(ctx, self.endpoint, &query, self.cache_options(use_cache))
            .await
            .map_err(|e| self.not_found_on_404(e, self.endpoint))?;

        let envelope: ItemEnvelope<T> = decode(self.endpoint, &bytes)?;
        envelope
            .data
            .ok_or_else(|| CmsError::not_found(self.endpoint, self.endpoint))
    }

    /// GraphQL list under `data.<field>`; a null list is empty
    pub async fn graphql_list<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        document: &str,
        field: &str,
        variables: Value,
        use_cache: bool,
    ) -> CmsResult<Vec<Entry<T>>> {
        match self.graphql_field(ctx, document, field, variables, use_cache).await? {
            Value::Null => Ok(Vec::new()),
            value => serde_json::from_value(value).map_err(|e| CmsError::deserialization(self.endpoint, e)),
        }
    }

    /// GraphQL entity under `data.<field>`; null is `NotFound`
    pub async fn graphql_item<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        document: &str,
        field: &str,
        id: &str,
        variables: Value,
        use_cache: bool,
    ) -> CmsResult<Entry<T>> {
        match self.graphql_field(ctx, document, field, variables, use_cache).await? {
            Value::Null => Err(CmsError::not_found(self.endpoint, id)),
            value => serde_json::from_value(value).map_err(|e| CmsError::deserialization(self.endpoint, e)),
        }
    }

    async fn graphql_field(
        &self,
        ctx: &RequestContext,
        document: &str,
        field: &str,
        variables: Value,
        use_cache: bool,
    ) -> CmsResult<Value> {
        let request = GraphQlRequest::new(self.endpoint, document).with_variables(variables);
        let bytes = self
            .transport
            .execute_graphql(ctx, &request, self.cache_options(use_cache))
            .await?;

        let mut data: Value = decode(self.endpoint, &bytes)?;
        data.get_mut(field).map(Value::take).ok_or_else(|| {
            CmsError::deserialization(self.endpoint, format!("missing field `{}` in GraphQL data", field))
        })
    }

    /// Drop every REST and GraphQL entry cached for this endpoint
    pub async fn invalidate(&self, ctx: &RequestContext) -> CmsResult<()> {
        self.transport
            .invalidate(ctx, Some(&CacheKeyBuilder::resource_pattern(self.endpoint)))
            .await?;
        self.transport
            .invalidate(ctx, Some(&graphql_pattern(self.endpoint)))
            .await
    }

    fn not_found_on_404(&self, err: CmsError, id: &str) -> CmsError {
        if err.upstream_status() == Some(404) {
            CmsError::not_found(self.endpoint, id)
        } else {
            err
        }
    }
}

fn decode<T: DeserializeOwned>(resource: &str, bytes: &[u8]) -> CmsResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CmsError::deserialization(resource, e))
}

/// Every resource service over one shared transport
#[derive(Clone)]
pub struct CmsServices {
    transport: Arc<dyn CmsTransport>,
    pub brands: BrandService,
    pub car_models: CarModelService,
    pub car_variants: CarVariantService,
    pub showrooms: ShowroomService,
    pub advertisements: AdvertisementService,
    pub governorates: GovernorateService,
    pub cities: CityService,
    pub app_version: AppVersionService,
}

impl CmsServices {
    pub fn new(transport: Arc<dyn CmsTransport>) -> Self {
        Self {
            brands: BrandService::new(transport.clone()),
            car_models: CarModelService::new(transport.clone()),
            car_variants: CarVariantService::new(transport.clone()),
            showrooms: ShowroomService::new(transport.clone()),
            advertisements: AdvertisementService::new(transport.clone()),
            governorates: GovernorateService::new(transport.clone()),
            cities: CityService::new(transport.clone()),
            app_version: AppVersionService::new(transport.clone()),
            transport,
        }
    }

    /// Build the HTTP client and its cache from configuration
    pub async fn connect(config: &GatewayCmsConfig) -> CmsResult<Self> {
        let client = CmsClient::from_config(config).await?;
        Ok(Self::new(Arc::new(client)).with_aggregate_concurrency(config.cms.aggregate_concurrency))
    }

    /// Bound the parallel variant lookups of aggregate views
    pub fn with_aggregate_concurrency(mut self, concurrency: usize) -> Self {
        self.car_models = self.car_models.with_concurrency(concurrency);
        self
    }

    /// Clear the transport's whole cache namespace
    pub async fn invalidate_all(&self, ctx: &RequestContext) -> CmsResult<()> {
        self.transport.invalidate(ctx, None).await
    }
}
