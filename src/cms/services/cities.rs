//! City service (`cities`)

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::aggregate::graphql_variables;
use super::governorates::governorate_ref;
use super::ResourceClient;
use crate::cms::client::CmsTransport;
use crate::cms::models::{City, CityRecord, CollectionQuery, Entry, ItemQuery, Paginated, PlaceRef};
use crate::cms::queries;
use crate::core::config::UpstreamFlavor;
use crate::core::context::RequestContext;
use crate::core::error::CmsResult;

pub const CITY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
pub struct CityService {
    resource: ResourceClient,
}

impl CityService {
    pub const ENDPOINT: &'static str = "cities";

    pub fn new(transport: Arc<dyn CmsTransport>) -> Self {
        Self {
            resource: ResourceClient::new(transport, Self::ENDPOINT, CITY_CACHE_TTL),
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_all(&self, ctx: &RequestContext, query: CollectionQuery, use_cache: bool) -> CmsResult<Paginated<City>> {
        match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                let envelope = self
                    .resource
                    .rest_collection::<CityRecord>(ctx, query.or_populate("governorate"), use_cache)
                    .await?;
                let pagination = envelope.pagination();
                Ok(Paginated::new(envelope.data.iter().map(city).collect(), pagination))
            }
            UpstreamFlavor::GraphQl => {
                let cities = self
                    .resource
                    .graphql_list::<CityRecord>(ctx, queries::CITIES, "cities", graphql_variables(&query), use_cache)
                    .await?;
                Ok(Paginated::new(cities.iter().map(city).collect(), None))
            }
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_by_id(&self, ctx: &RequestContext, id: &str, query: ItemQuery, use_cache: bool) -> CmsResult<City> {
        let entry = match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_item::<CityRecord>(ctx, id, query.or_populate("governorate"), use_cache)
                    .await?
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_item::<CityRecord>(
                        ctx,
                        queries::CITY_BY_ID,
                        "city",
                        id,
                        json!({ "documentId": id }),
                        use_cache,
                    )
                    .await?
            }
        };
        Ok(city(&entry))
    }

    pub async fn invalidate_cache(&self, ctx: &RequestContext) -> CmsResult<()> {
        self.resource.invalidate(ctx).await
    }
}

fn city(entry: &Entry<CityRecord>) -> City {
    City {
        id: entry.identifier(),
        name: entry.attributes.name.clone(),
        governorate: entry.attributes.governorate.get().map(governorate_ref),
    }
}

pub(crate) fn city_ref(entry: &Entry<CityRecord>) -> PlaceRef {
    PlaceRef {
        id: entry.identifier(),
        name: entry.attributes.name.clone(),
    }
}
