//! Advertisement service (`advertisements`)

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::aggregate::graphql_variables;
use super::{ResourceClient, FULL_SET_PAGE_SIZE};
use crate::cms::client::CmsTransport;
use crate::cms::models::{
    media, Advertisement, AdvertisementItem, AdvertisementRecord, CollectionQuery, Entry, ItemQuery, Paginated,
};
use crate::cms::queries;
use crate::core::config::UpstreamFlavor;
use crate::core::context::RequestContext;
use crate::core::error::CmsResult;

/// Campaigns rotate often
pub const ADVERTISEMENT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct AdvertisementService {
    resource: ResourceClient,
}

impl AdvertisementService {
    pub const ENDPOINT: &'static str = "advertisements";

    pub fn new(transport: Arc<dyn CmsTransport>) -> Self {
        Self {
            resource: ResourceClient::new(transport, Self::ENDPOINT, ADVERTISEMENT_CACHE_TTL),
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_all(
        &self,
        ctx: &RequestContext,
        query: CollectionQuery,
        use_cache: bool,
    ) -> CmsResult<Paginated<Advertisement>> {
        match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                let envelope = self
                    .resource
                    .rest_collection::<AdvertisementRecord>(ctx, query.or_populate("Banner"), use_cache)
                    .await?;
                let pagination = envelope.pagination();
                let ads = envelope.data.iter().map(|a| self.to_advertisement(a)).collect();
                Ok(Paginated::new(ads, pagination))
            }
            UpstreamFlavor::GraphQl => {
                let ads = self
                    .resource
                    .graphql_list::<AdvertisementRecord>(
                        ctx,
                        queries::ADVERTISEMENTS,
                        "advertisements",
                        graphql_variables(&query),
                        use_cache,
                    )
                    .await?;
                Ok(Paginated::new(
                    ads.iter().map(|a| self.to_advertisement(a)).collect(),
                    None,
                ))
            }
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_by_id(
        &self,
        ctx: &RequestContext,
        id: &str,
        query: ItemQuery,
        use_cache: bool,
    ) -> CmsResult<Advertisement> {
        let entry = match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_item::<AdvertisementRecord>(ctx, id, query.or_populate("Banner"), use_cache)
                    .await?
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_item::<AdvertisementRecord>(
                        ctx,
                        queries::ADVERTISEMENT_BY_ID,
                        "advertisement",
                        id,
                        json!({ "documentId": id }),
                        use_cache,
                    )
                    .await?
            }
        };
        Ok(self.to_advertisement(&entry))
    }

    /// Every advertisement as `{id, action, bannerUrl}`
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get_simplified(&self, ctx: &RequestContext, use_cache: bool) -> CmsResult<Vec<AdvertisementItem>> {
        let query = CollectionQuery::new()
            .with_page(1)
            .with_page_size(FULL_SET_PAGE_SIZE);

        let ads = self.get_all(ctx, query, use_cache).await?;
        Ok(ads
            .data
            .into_iter()
            .map(|ad| AdvertisementItem {
                id: ad.id,
                action: ad.action,
                banner_url: ad.banner.map(|b| b.url).unwrap_or_default(),
            })
            .collect())
    }

    pub async fn invalidate_cache(&self, ctx: &RequestContext) -> CmsResult<()> {
        self.resource.invalidate(ctx).await
    }

    fn to_advertisement(&self, entry: &Entry<AdvertisementRecord>) -> Advertisement {
        Advertisement {
            id: entry.identifier(),
            action: entry.attributes.action.clone(),
            banner: media(&entry.attributes.banner, self.resource.transport()),
        }
    }
}
