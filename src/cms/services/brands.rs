//! Brand service (`brands`)

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::aggregate::graphql_variables;
use super::{ResourceClient, FULL_SET_PAGE_SIZE};
use crate::cms::client::CmsTransport;
use crate::cms::models::{
    media, Brand, BrandRecord, CollectionQuery, Entry, ItemQuery, MediaUrlResolver, Paginated, SimpleBrand,
};
use crate::cms::queries;
use crate::core::config::UpstreamFlavor;
use crate::core::context::RequestContext;
use crate::core::error::CmsResult;

/// Brands change rarely
pub const BRAND_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
pub struct BrandService {
    resource: ResourceClient,
}

impl BrandService {
    pub const ENDPOINT: &'static str = "brands";

    pub fn new(transport: Arc<dyn CmsTransport>) -> Self {
        Self {
            resource: ResourceClient::new(transport, Self::ENDPOINT, BRAND_CACHE_TTL),
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_all(
        &self,
        ctx: &RequestContext,
        query: CollectionQuery,
        use_cache: bool,
    ) -> CmsResult<Paginated<Brand>> {
        match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                let envelope = self
                    .resource
                    .rest_collection::<BrandRecord>(ctx, query.or_populate("*"), use_cache)
                    .await?;
                let pagination = envelope.pagination();
                let brands = envelope.data.iter().map(|b| self.to_brand(b)).collect();
                Ok(Paginated::new(brands, pagination))
            }
            UpstreamFlavor::GraphQl => {
                let brands = self
                    .resource
                    .graphql_list::<BrandRecord>(ctx, queries::BRANDS, "brands", graphql_variables(&query), use_cache)
                    .await?;
                Ok(Paginated::new(brands.iter().map(|b| self.to_brand(b)).collect(), None))
            }
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_by_id(&self, ctx: &RequestContext, id: &str, query: ItemQuery, use_cache: bool) -> CmsResult<Brand> {
        let entry = match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_item::<BrandRecord>(ctx, id, query.or_populate("*"), use_cache)
                    .await?
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_item::<BrandRecord>(
                        ctx,
                        queries::BRAND_BY_ID,
                        "brand",
                        id,
                        json!({ "documentId": id }),
                        use_cache,
                    )
                    .await?
            }
        };
        Ok(self.to_brand(&entry))
    }

    /// Every brand as `{id, title, thumbnail}`, without pagination
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get_simplified(&self, ctx: &RequestContext, use_cache: bool) -> CmsResult<Vec<SimpleBrand>> {
        let query = CollectionQuery::new()
            .with_page(1)
            .with_page_size(FULL_SET_PAGE_SIZE);

        let brands = match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_collection::<BrandRecord>(ctx, query.with_populate("*"), use_cache)
                    .await?
                    .data
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_list::<BrandRecord>(ctx, queries::BRANDS, "brands", graphql_variables(&query), use_cache)
                    .await?
            }
        };

        Ok(brands
            .iter()
            .map(|b| simple_brand(b, self.resource.transport()))
            .collect())
    }

    pub async fn invalidate_cache(&self, ctx: &RequestContext) -> CmsResult<()> {
        self.resource.invalidate(ctx).await
    }

    fn to_brand(&self, entry: &Entry<BrandRecord>) -> Brand {
        Brand {
            id: entry.identifier(),
            name: entry.attributes.name.clone(),
            slug: entry.attributes.slug.clone(),
            logo: media(&entry.attributes.logo, self.resource.transport()),
        }
    }
}

/// `{id, title, thumbnail}` view of a brand
pub fn simple_brand<R>(entry: &Entry<BrandRecord>, resolver: &R) -> SimpleBrand
where
    R: MediaUrlResolver + ?Sized,
{
    SimpleBrand {
        id: entry.identifier(),
        title: entry.attributes.name.clone(),
        thumbnail: media(&entry.attributes.logo, resolver),
    }
}
