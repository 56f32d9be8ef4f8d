//! Car model service (`car-models`)
//!
//! Besides plain listings this service builds the two model-level aggregate
//! views: the brand car listing (one price range per model) and the detailed
//! model (every variant joined). Variant lookups inside those views are best
//! effort: an upstream failure yields zero-valued figures, never a failed
//! view. Cancellation, deadline expiry and undecodable variants still fail it.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use super::aggregate::{aggregate_variants, graphql_variables, id_filter, market_price, price_range};
use super::brands::simple_brand;
use super::car_variants::{self, fetch_for_model, variant_title};
use super::{ResourceClient, FULL_SET_PAGE_SIZE};
use crate::cms::client::CmsTransport;
use crate::cms::models::{
    media_list, CarModel, CarModelRecord, CarVariantRecord, CollectionQuery, DetailedCarModel, Entry, ItemQuery,
    MediaReference, Paginated, SimpleCarModel, VariantSummary,
};
use crate::cms::queries;
use crate::core::config::UpstreamFlavor;
use crate::core::context::RequestContext;
use crate::core::error::CmsResult;

pub const CAR_MODEL_CACHE_TTL: Duration = Duration::from_secs(20 * 60);

/// Default parallel variant lookups in the brand car listing
pub const DEFAULT_AGGREGATE_CONCURRENCY: usize = 4;

#[derive(Clone)]
pub struct CarModelService {
    resource: ResourceClient,
    variants: ResourceClient,
    concurrency: usize,
}

impl CarModelService {
    pub const ENDPOINT: &'static str = "car-models";

    pub fn new(transport: Arc<dyn CmsTransport>) -> Self {
        Self {
            resource: ResourceClient::new(transport.clone(), Self::ENDPOINT, CAR_MODEL_CACHE_TTL),
            variants: car_variants::resource(transport),
            concurrency: DEFAULT_AGGREGATE_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_all(
        &self,
        ctx: &RequestContext,
        query: CollectionQuery,
        use_cache: bool,
    ) -> CmsResult<Paginated<CarModel>> {
        match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                let envelope = self
                    .resource
                    .rest_collection::<CarModelRecord>(ctx, query.or_populate("*"), use_cache)
                    .await?;
                let pagination = envelope.pagination();
                let models = envelope.data.iter().map(|m| self.to_car_model(m)).collect();
                Ok(Paginated::new(models, pagination))
            }
            UpstreamFlavor::GraphQl => {
                let models = self
                    .resource
                    .graphql_list::<CarModelRecord>(
                        ctx,
                        queries::CAR_MODELS,
                        "carModels",
                        graphql_variables(&query),
                        use_cache,
                    )
                    .await?;
                Ok(Paginated::new(
                    models.iter().map(|m| self.to_car_model(m)).collect(),
                    None,
                ))
            }
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_by_id(&self, ctx: &RequestContext, id: &str, query: ItemQuery, use_cache: bool) -> CmsResult<CarModel> {
        let entry = self.fetch_entry(ctx, id, query, use_cache).await?;
        Ok(self.to_car_model(&entry))
    }

    /// A brand's models, each with the price range of its variants
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get_by_brand_id(
        &self,
        ctx: &RequestContext,
        brand_id: &str,
        use_cache: bool,
    ) -> CmsResult<Vec<SimpleCarModel>> {
        let models = match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                let (key, value) = id_filter(&["brand"], brand_id);
                let query = CollectionQuery::new()
                    .with_page(1)
                    .with_page_size(FULL_SET_PAGE_SIZE)
                    .with_populate("*")
                    .with_filter(key, value);
                self.resource
                    .rest_collection::<CarModelRecord>(ctx, query, use_cache)
                    .await?
                    .data
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_list::<CarModelRecord>(
                        ctx,
                        queries::CAR_MODELS_BY_BRAND,
                        "carModels",
                        json!({ "brandDocumentId": brand_id }),
                        use_cache,
                    )
                    .await?
            }
        };

        // buffered keeps upstream order while bounding in-flight lookups
        let listing = stream::iter(models.iter())
            .map(|model| self.simple_car_model(ctx, model, use_cache))
            .buffered(self.concurrency)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(listing)
    }

    /// The model joined with all of its variants
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get_detailed_by_id(&self, ctx: &RequestContext, id: &str, use_cache: bool) -> CmsResult<DetailedCarModel> {
        let entry = self.fetch_entry(ctx, id, ItemQuery::new(), use_cache).await?;
        let variants = self.variants_or_empty(ctx, &entry, use_cache).await?;

        let resolver = self.resource.transport();
        let aggregate = aggregate_variants(&variants, resolver);
        let market = market_price(aggregate.price, self.resource.flavor());
        let model = &entry.attributes;

        Ok(DetailedCarModel {
            id: entry.identifier(),
            title: model.name.clone(),
            body_type: model.body_type.clone(),
            fuel_type: model.fuel_type.clone(),
            slug: model.slug.clone(),
            brand: model.brand.get().map(|b| simple_brand(b, resolver)),
            images: media_list(&model.images, resolver),
            price_from: aggregate.price.from,
            price_to: aggregate.price.to,
            market_price_from: market.from,
            market_price_to: market.to,
            minimum_down_payment: aggregate.minimum_down_payment,
            minimum_installments: aggregate.minimum_installments,
            warranty: aggregate.warranty,
            variants: variants
                .iter()
                .map(|v| VariantSummary {
                    id: v.identifier(),
                    name: v.attributes.name.clone(),
                    display_name: variant_title(&v.attributes),
                    price: v.attributes.price.unwrap_or(0),
                    year: v.attributes.year,
                })
                .collect(),
            showrooms: aggregate.showrooms,
            reviews: aggregate.reviews,
            catalogs: aggregate.catalogs,
        })
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
    ) -> CmsResult<Entry<CarModelRecord>> {
        match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_item::<CarModelRecord>(ctx, id, query.or_populate("*"), use_cache)
                    .await
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_item::<CarModelRecord>(
                        ctx,
                        queries::CAR_MODEL_BY_ID,
                        "carModel",
                        id,
                        json!({ "documentId": id }),
                        use_cache,
                    )
                    .await
            }
        }
    }

    async fn variants_or_empty(
        &self,
        ctx: &RequestContext,
        model: &Entry<CarModelRecord>,
        use_cache: bool,
    ) -> CmsResult<Vec<Entry<CarVariantRecord>>> {
        let model_id = model.identifier();
        match fetch_for_model(&self.variants, ctx, &model_id, use_cache).await {
            Ok(variants) => Ok(variants),
            Err(e) if e.is_transport() => {
                warn!(model_id = %model_id, error = %e, "Variant lookup failed, using empty variant set");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn simple_car_model(
        &self,
        ctx: &RequestContext,
        model: &Entry<CarModelRecord>,
        use_cache: bool,
    ) -> CmsResult<SimpleCarModel> {
        let variants = self.variants_or_empty(ctx, model, use_cache).await?;
        let price = price_range(variants.iter().map(|v| v.attributes.price));
        let market = market_price(price, self.resource.flavor());

        Ok(SimpleCarModel {
            id: model.identifier(),
            title: model.attributes.name.clone(),
            thumbnail: model
                .attributes
                .images
                .first()
                .map(|image| MediaReference::from_entry(image, self.resource.transport()).into_thumbnail()),
            price_from: price.from,
            price_to: price.to,
            market_price_from: market.from,
            market_price_to: market.to,
        })
    }

    fn to_car_model(&self, entry: &Entry<CarModelRecord>) -> CarModel {
        let resolver = self.resource.transport();
        let model = &entry.attributes;
        CarModel {
            id: entry.identifier(),
            name: model.name.clone(),
            body_type: model.body_type.clone(),
            fuel_type: model.fuel_type.clone(),
            slug: model.slug.clone(),
            brand: model.brand.get().map(|b| simple_brand(b, resolver)),
            images: media_list(&model.images, resolver),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::services::testing::{Call, FakeTransport};
    use crate::core::error::CmsError;
    use serde_json::json;

    fn graphql_transport() -> FakeTransport {
        FakeTransport::new(UpstreamFlavor::GraphQl)
            .graphql(
                queries::CAR_MODEL_BY_ID,
                Ok(json!({"carModel": {
                    "documentId": "m1",
                    "Name": "Sportage",
                    "BodyType": "SUV",
                    "FuelType": "92",
                    "Slug": "sportage",
                    "Images": [{"documentId": "i1", "url": "/uploads/sportage.png"}],
                    "brand": {"documentId": "b1", "Name": "Kia"}
                }})),
            )
            .graphql(
                queries::CAR_VARIANTS_BY_MODEL,
                Ok(json!({"carVariants": [
                    {"documentId": "v1", "Name": "LX", "Price": 500, "Warranty": "",
                     "ReviewLink": "r1", "BrochureURL": "/uploads/b1.pdf",
                     "ShowroomPricing": [{"Price": 200, "MinimuDownpayment": 20, "MinimumInstallements": 2,
                                          "showroom": {"documentId": "S1", "Name": "Alpha"}}]},
                    {"documentId": "v2", "Name": "EX", "Price": 100, "Warranty": "7 years",
                     "ReviewLink": "r1",
                     "ShowroomPricing": [{"Price": 150, "MinimuDownpayment": 15, "MinimumInstallements": 1,
                                          "showroom": {"documentId": "S1", "Name": "Alpha"}}]},
                    {"documentId": "v3", "Name": "GT", "Price": 300, "Warranty": "3 years", "ReviewLink": "r1"}
                ]})),
            )
    }

    #[tokio::test]
    async fn test_graphql_detailed_model() {
        let service = CarModelService::new(Arc::new(graphql_transport()));

        let detailed = service
            .get_detailed_by_id(&RequestContext::new(), "m1", true)
            .await
            .unwrap();

        assert_eq!(detailed.title, "Sportage");
        assert_eq!(detailed.brand.as_ref().unwrap().title, "Kia");
        assert_eq!((detailed.price_from, detailed.price_to), (100, 500));
        assert_eq!((detailed.market_price_from, detailed.market_price_to), (20_100, 20_500));
        assert_eq!(detailed.warranty, "7 years");
        assert_eq!(detailed.variants.len(), 3);
        assert_eq!(detailed.variants[0].id, "v1");

        assert_eq!(detailed.showrooms.len(), 1);
        assert_eq!(detailed.showrooms[0].price, 150);
        assert_eq!(detailed.showrooms[0].minimum_down_payment, 15);
        assert_eq!(detailed.showrooms[0].minimum_installments, 1);

        assert_eq!(detailed.reviews.len(), 1);
        assert_eq!(detailed.reviews[0].id, 1);
        assert_eq!(detailed.catalogs.len(), 1);
    }

    #[tokio::test]
    async fn test_detailed_model_survives_variant_failure() {
        let transport = FakeTransport::new(UpstreamFlavor::GraphQl)
            .graphql(
                queries::CAR_MODEL_BY_ID,
                Ok(json!({"carModel": {"documentId": "m1", "Name": "Sportage"}})),
            )
            .graphql(
                queries::CAR_VARIANTS_BY_MODEL,
                Err(CmsError::transport(Some(503), "unavailable")),
            );
        let service = CarModelService::new(Arc::new(transport));

        let detailed = service
            .get_detailed_by_id(&RequestContext::new(), "m1", true)
            .await
            .unwrap();
        assert!(detailed.variants.is_empty());
        assert_eq!((detailed.price_from, detailed.price_to), (0, 0));
        assert_eq!(detailed.market_price_from, 20_000);
        assert_eq!(detailed.minimum_down_payment, 0);
        assert_eq!(detailed.warranty, "");
    }

    #[tokio::test]
    async fn test_detailed_model_variant_timeout_fails() {
        let transport = FakeTransport::new(UpstreamFlavor::GraphQl)
            .graphql(
                queries::CAR_MODEL_BY_ID,
                Ok(json!({"carModel": {"documentId": "m1", "Name": "Sportage"}})),
            )
            .graphql(
                queries::CAR_VARIANTS_BY_MODEL,
                Err(CmsError::Timeout { timeout_ms: 500 }),
            );
        let service = CarModelService::new(Arc::new(transport));

        let err = service
            .get_detailed_by_id(&RequestContext::new(), "m1", true)
            .await
            .unwrap_err();
        assert_eq!(err, CmsError::Timeout { timeout_ms: 500 });
    }

    #[tokio::test]
    async fn test_detailed_model_malformed_variant_price_fails() {
        let transport = FakeTransport::new(UpstreamFlavor::GraphQl)
            .graphql(
                queries::CAR_MODEL_BY_ID,
                Ok(json!({"carModel": {"documentId": "m1", "Name": "Sportage"}})),
            )
            .graphql(
                queries::CAR_VARIANTS_BY_MODEL,
                Ok(json!({"carVariants": [{"documentId": "v1", "Price": {"amount": 900}}]})),
            );
        let service = CarModelService::new(Arc::new(transport));

        let err = service
            .get_detailed_by_id(&RequestContext::new(), "m1", true)
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::Deserialization { .. }));
    }

    #[tokio::test]
    async fn test_detailed_model_fails_when_model_fails() {
        let transport = FakeTransport::new(UpstreamFlavor::GraphQl)
            .graphql(queries::CAR_MODEL_BY_ID, Ok(json!({"carModel": null})));
        let service = CarModelService::new(Arc::new(transport));

        let err = service
            .get_detailed_by_id(&RequestContext::new(), "missing", true)
            .await
            .unwrap_err();
        assert_eq!(err, CmsError::not_found("car-models", "missing"));
    }

    #[tokio::test]
    async fn test_rest_brand_listing() {
        let transport = Arc::new(
            FakeTransport::new(UpstreamFlavor::Rest)
                .rest(
                    "car-models",
                    Ok(json!({"data": [
                        {"id": 1, "attributes": {"Name": "Corolla",
                            "Images": {"data": [{"id": 5, "attributes": {
                                "url": "/uploads/corolla.png", "width": 1920, "height": 1080,
                                "formats": {"thumbnail": {"url": "/uploads/thumbnail_corolla.png", "width": 245, "height": 138}}
                            }}]}}},
                        {"id": 2, "attributes": {"Name": "Camry"}}
                    ]})),
                )
                .rest(
                    "car-variants",
                    Ok(json!({"data": [
                        {"id": 10, "attributes": {"Price": 500}},
                        {"id": 11, "attributes": {"Price": 100}},
                        {"id": 12, "attributes": {"Price": 300}}
                    ]})),
                ),
        );
        let service = CarModelService::new(transport.clone()).with_concurrency(2);

        let listing = service
            .get_by_brand_id(&RequestContext::new(), "7", true)
            .await
            .unwrap();

        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].title, "Corolla");
        assert_eq!((listing[0].price_from, listing[0].price_to), (100, 500));
        assert_eq!((listing[0].market_price_from, listing[0].market_price_to), (0, 0));
        let thumbnail = listing[0].thumbnail.as_ref().unwrap();
        assert_eq!(thumbnail.url, "https://cms.example.com/uploads/thumbnail_corolla.png");
        assert_eq!((thumbnail.width, thumbnail.height), (Some(245), Some(138)));
        assert!(thumbnail.formats.is_none());
        assert_eq!(listing[1].title, "Camry");

        let calls = transport.calls();
        match &calls[0] {
            Call::Collection { endpoint, query } => {
                assert_eq!(endpoint, "car-models");
                assert_eq!(
                    query.filters.get("filters[brand][id][$eq]").map(String::as_str),
                    Some("7")
                );
            }
            other => panic!("unexpected call {:?}", other),
        }
        let variant_filters: Vec<_> = calls[1..]
            .iter()
            .filter_map(|call| match call {
                Call::Collection { query, .. } => query.filters.get("filters[car_model][id][$eq]").cloned(),
                _ => None,
            })
            .collect();
        assert_eq!(variant_filters.len(), 2);
        assert!(variant_filters.contains(&"1".to_string()));
        assert!(variant_filters.contains(&"2".to_string()));
    }

    #[tokio::test]
    async fn test_brand_listing_variant_failure_is_zero_priced() {
        let transport = FakeTransport::new(UpstreamFlavor::GraphQl)
            .graphql(
                queries::CAR_MODELS_BY_BRAND,
                Ok(json!({"carModels": [{"documentId": "m1", "Name": "Sportage", "Images": []}]})),
            )
            .graphql(
                queries::CAR_VARIANTS_BY_MODEL,
                Err(CmsError::transport(None, "connection reset")),
            );
        let service = CarModelService::new(Arc::new(transport));

        let listing = service
            .get_by_brand_id(&RequestContext::new(), "b1", true)
            .await
            .unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!((listing[0].price_from, listing[0].price_to), (0, 0));
        assert!(listing[0].thumbnail.is_none());
    }

    #[tokio::test]
    async fn test_brand_listing_cancellation_fails() {
        let transport = FakeTransport::new(UpstreamFlavor::GraphQl)
            .graphql(
                queries::CAR_MODELS_BY_BRAND,
                Ok(json!({"carModels": [
                    {"documentId": "m1", "Name": "Sportage"},
                    {"documentId": "m2", "Name": "Sorento"}
                ]})),
            )
            .graphql(queries::CAR_VARIANTS_BY_MODEL, Err(CmsError::Cancelled));
        let service = CarModelService::new(Arc::new(transport));

        let err = service
            .get_by_brand_id(&RequestContext::new(), "b1", true)
            .await
            .unwrap_err();
        assert_eq!(err, CmsError::Cancelled);
    }
}
