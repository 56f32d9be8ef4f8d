//! Car variant service (`car-variants`)

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use super::aggregate::{aggregate_variants, graphql_variables, id_filter, showroom_offer};
use super::{ResourceClient, FULL_SET_PAGE_SIZE};
use crate::cms::client::CmsTransport;
use crate::cms::models::{
    media_list, CarModelRecord, CarVariant, CarVariantRecord, CollectionQuery, DetailedVariant, Entry, ItemQuery,
    MediaReference, MediaUrlResolver, ModelReference, Paginated,
};
use crate::cms::queries;
use crate::core::config::UpstreamFlavor;
use crate::core::context::RequestContext;
use crate::core::error::CmsResult;

pub const CAR_VARIANT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Relations a variant view needs populated on REST upstreams
const VARIANT_POPULATE: &str = "Images,Specs,car_model.Images,ShowroomPricing.showroom.Logo";

#[derive(Clone)]
pub struct CarVariantService {
    resource: ResourceClient,
}

impl CarVariantService {
    pub const ENDPOINT: &'static str = "car-variants";

    pub fn new(transport: Arc<dyn CmsTransport>) -> Self {
        Self {
            resource: resource(transport),
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_all(
        &self,
        ctx: &RequestContext,
        query: CollectionQuery,
        use_cache: bool,
    ) -> CmsResult<Paginated<CarVariant>> {
        let resolver = self.resource.transport();
        match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                let envelope = self
                    .resource
                    .rest_collection::<CarVariantRecord>(ctx, query.or_populate(VARIANT_POPULATE), use_cache)
                    .await?;
                let pagination = envelope.pagination();
                let variants = envelope.data.iter().map(|v| car_variant(v, resolver)).collect();
                Ok(Paginated::new(variants, pagination))
            }
            UpstreamFlavor::GraphQl => {
                let variants = self
                    .resource
                    .graphql_list::<CarVariantRecord>(
                        ctx,
                        queries::CAR_VARIANTS,
                        "carVariants",
                        graphql_variables(&query),
                        use_cache,
                    )
                    .await?;
                Ok(Paginated::new(
                    variants.iter().map(|v| car_variant(v, resolver)).collect(),
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
    ) -> CmsResult<CarVariant> {
        let entry = self.fetch_entry(ctx, id, query, use_cache).await?;
        Ok(car_variant(&entry, self.resource.transport()))
    }

    /// Variant page with deduplicated showroom offers, review and brochure links
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get_detailed_by_id(&self, ctx: &RequestContext, id: &str, use_cache: bool) -> CmsResult<DetailedVariant> {
        let entry = self.fetch_entry(ctx, id, ItemQuery::new(), use_cache).await?;
        let resolver = self.resource.transport();
        let aggregate = aggregate_variants(std::slice::from_ref(&entry), resolver);
        let variant = &entry.attributes;

        Ok(DetailedVariant {
            id: entry.identifier(),
            title: variant_title(variant),
            price: variant.price.unwrap_or(0),
            year: variant.year,
            warranty: variant.warranty.clone(),
            minimum_down_payment: variant.minimum_down_payment.unwrap_or(0),
            minimum_installments: variant.minimum_installments.unwrap_or(0),
            specs: variant.specs.clone(),
            features: variant.features.clone(),
            images: media_list(&variant.images, resolver),
            car_model: variant.car_model.get().map(|m| model_reference(m, resolver)),
            showrooms: aggregate.showrooms,
            reviews: aggregate.reviews,
            catalogs: aggregate.catalogs,
        })
    }

    /// Every variant of one car model, in upstream order
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn list_for_model(&self, ctx: &RequestContext, model_id: &str, use_cache: bool) -> CmsResult<Vec<CarVariant>> {
        let variants = fetch_for_model(&self.resource, ctx, model_id, use_cache).await?;
        let resolver = self.resource.transport();
        Ok(variants.iter().map(|v| car_variant(v, resolver)).collect())
    }

    pub async fn invalidate_cache(&self, ctx: &RequestContext) -> CmsResult<()> {
        self.resource.invalidate(ctx).await
    }

    async fn fetch_entry(
        &self,
        ctx: &RequestContext,
        id: &str,
        query: ItemQuery,
        use_cache: bool,
    ) -> CmsResult<Entry<CarVariantRecord>> {
        match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_item::<CarVariantRecord>(ctx, id, query.or_populate(VARIANT_POPULATE), use_cache)
                    .await
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_item::<CarVariantRecord>(
                        ctx,
                        queries::CAR_VARIANT_BY_ID,
                        "carVariant",
                        id,
                        json!({ "documentId": id }),
                        use_cache,
                    )
                    .await
            }
        }
    }
}

/// Resource client for the variants endpoint, shared with the aggregate views
pub(crate) fn resource(transport: Arc<dyn CmsTransport>) -> ResourceClient {
    ResourceClient::new(transport, CarVariantService::ENDPOINT, CAR_VARIANT_CACHE_TTL)
}

/// All variant records of a model, with showroom pricing populated
pub(crate) async fn fetch_for_model(
    variants: &ResourceClient,
    ctx: &RequestContext,
    model_id: &str,
    use_cache: bool,
) -> CmsResult<Vec<Entry<CarVariantRecord>>> {
    match variants.flavor() {
        UpstreamFlavor::Rest => {
            let (key, value) = id_filter(&["car_model"], model_id);
            let query = CollectionQuery::new()
                .with_page(1)
                .with_page_size(FULL_SET_PAGE_SIZE)
                .with_populate(VARIANT_POPULATE)
                .with_filter(key, value);
            Ok(variants
                .rest_collection::<CarVariantRecord>(ctx, query, use_cache)
                .await?
                .data)
        }
        UpstreamFlavor::GraphQl => {
            variants
                .graphql_list::<CarVariantRecord>(
                    ctx,
                    queries::CAR_VARIANTS_BY_MODEL,
                    "carVariants",
                    json!({ "carModelDocumentId": model_id }),
                    use_cache,
                )
                .await
        }
    }
}

/// Display name when the CMS has one, else the plain name
pub(crate) fn variant_title(variant: &CarVariantRecord) -> String {
    if variant.display_name.trim().is_empty() {
        variant.name.clone()
    } else {
        variant.display_name.clone()
    }
}

pub(crate) fn model_reference<R>(model: &Entry<CarModelRecord>, resolver: &R) -> ModelReference
where
    R: MediaUrlResolver + ?Sized,
{
    ModelReference {
        id: model.identifier(),
        title: model.attributes.name.clone(),
        thumbnail: model
            .attributes
            .images
            .first()
            .map(|image| MediaReference::from_entry(image, resolver)),
    }
}

fn car_variant<R>(entry: &Entry<CarVariantRecord>, resolver: &R) -> CarVariant
where
    R: MediaUrlResolver + ?Sized,
{
    let variant = &entry.attributes;
    CarVariant {
        id: entry.identifier(),
        name: variant.name.clone(),
        display_name: variant.display_name.clone(),
        price: variant.price.unwrap_or(0),
        year: variant.year,
        brochure_url: resolver.resolve_media_url(&variant.brochure_url),
        review_link: variant.review_link.clone(),
        warranty: variant.warranty.clone(),
        minimum_down_payment: variant.minimum_down_payment.unwrap_or(0),
        minimum_installments: variant.minimum_installments.unwrap_or(0),
        specs: variant.specs.clone(),
        features: variant.features.clone(),
        images: media_list(&variant.images, resolver),
        car_model: variant.car_model.get().map(|m| model_reference(m, resolver)),
        showrooms: variant
            .showroom_pricing
            .iter()
            .filter_map(|p| showroom_offer(p, resolver))
            .collect(),
    }
}
