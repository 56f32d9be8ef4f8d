//! Showroom service (`showrooms`)

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use super::aggregate::{graphql_variables, id_filter};
use super::car_variants::{self, variant_title};
use super::cities::city_ref;
use super::governorates::governorate_ref;
use super::{ResourceClient, FULL_SET_PAGE_SIZE};
use crate::cms::client::CmsTransport;
use crate::cms::models::{
    media, CarVariantRecord, CollectionQuery, DetailedShowroom, Entry, EntryMeta, ItemQuery, Location,
    LocationRecord, MediaReference, MediaUrlResolver, Paginated, Showroom, ShowroomCarVariant, ShowroomRecord,
    ShowroomSummary,
};
use crate::cms::queries;
use crate::core::config::UpstreamFlavor;
use crate::core::context::RequestContext;
use crate::core::error::CmsResult;

pub const SHOWROOM_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

const SHOWROOM_POPULATE: &str = "Logo,Cover,Location.governorate,Location.city,ContactInfo";
const SHOWROOM_CARS_POPULATE: &str = "Images,ShowroomPricing.showroom";

#[derive(Clone)]
pub struct ShowroomService {
    resource: ResourceClient,
    variants: ResourceClient,
}

impl ShowroomService {
    pub const ENDPOINT: &'static str = "showrooms";

    pub fn new(transport: Arc<dyn CmsTransport>) -> Self {
        Self {
            resource: ResourceClient::new(transport.clone(), Self::ENDPOINT, SHOWROOM_CACHE_TTL),
            variants: car_variants::resource(transport),
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_all(
        &self,
        ctx: &RequestContext,
        query: CollectionQuery,
        use_cache: bool,
    ) -> CmsResult<Paginated<Showroom>> {
        match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                let envelope = self
                    .resource
                    .rest_collection::<ShowroomRecord>(ctx, query.or_populate(SHOWROOM_POPULATE), use_cache)
                    .await?;
                let pagination = envelope.pagination();
                let showrooms = envelope.data.iter().map(|s| self.to_showroom(s)).collect();
                Ok(Paginated::new(showrooms, pagination))
            }
            UpstreamFlavor::GraphQl => {
                let showrooms = self
                    .resource
                    .graphql_list::<ShowroomRecord>(
                        ctx,
                        queries::SHOWROOMS,
                        "showrooms",
                        graphql_variables(&query),
                        use_cache,
                    )
                    .await?;
                Ok(Paginated::new(
                    showrooms.iter().map(|s| self.to_showroom(s)).collect(),
                    None,
                ))
            }
        }
    }

    #[instrument(skip(self, ctx, query), fields(trace_id = %ctx.trace_id))]
    pub async fn get_by_id(&self, ctx: &RequestContext, id: &str, query: ItemQuery, use_cache: bool) -> CmsResult<Showroom> {
        let entry = match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_item::<ShowroomRecord>(ctx, id, query.or_populate(SHOWROOM_POPULATE), use_cache)
                    .await?
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_item::<ShowroomRecord>(
                        ctx,
                        queries::SHOWROOM_BY_ID,
                        "showroom",
                        id,
                        json!({ "documentId": id }),
                        use_cache,
                    )
                    .await?
            }
        };
        Ok(self.to_showroom(&entry))
    }

    /// Every showroom as a card, without pagination
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get_simplified(&self, ctx: &RequestContext, use_cache: bool) -> CmsResult<Vec<ShowroomSummary>> {
        let query = CollectionQuery::new()
            .with_page(1)
            .with_page_size(FULL_SET_PAGE_SIZE);

        let showrooms = match self.resource.flavor() {
            UpstreamFlavor::Rest => {
                self.resource
                    .rest_collection::<ShowroomRecord>(ctx, query.with_populate("Logo"), use_cache)
                    .await?
                    .data
            }
            UpstreamFlavor::GraphQl => {
                self.resource
                    .graphql_list::<ShowroomRecord>(
                        ctx,
                        queries::SHOWROOMS,
                        "showrooms",
                        graphql_variables(&query),
                        use_cache,
                    )
                    .await?
            }
        };

        let resolver = self.resource.transport();
        Ok(showrooms
            .iter()
            .map(|s| ShowroomSummary {
                id: s.identifier(),
                name: s.attributes.name.clone(),
                logo: media(&s.attributes.logo, resolver),
                is_verified: s.attributes.is_verified,
                is_featured: s.attributes.is_featured,
            })
            .collect())
    }

    /// Variants priced by this showroom, at this showroom's price
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get_car_variants(
        &self,
        ctx: &RequestContext,
        showroom_id: &str,
        use_cache: bool,
    ) -> CmsResult<Vec<ShowroomCarVariant>> {
        let variants = match self.variants.flavor() {
            UpstreamFlavor::Rest => {
                let (key, value) = id_filter(&["ShowroomPricing", "showroom"], showroom_id);
                let query = CollectionQuery::new()
                    .with_page(1)
                    .with_page_size(FULL_SET_PAGE_SIZE)
                    .with_populate(SHOWROOM_CARS_POPULATE)
                    .with_filter(key, value);
                self.variants
                    .rest_collection::<CarVariantRecord>(ctx, query, use_cache)
                    .await?
                    .data
            }
            UpstreamFlavor::GraphQl => {
                self.variants
                    .graphql_list::<CarVariantRecord>(
                        ctx,
                        queries::CAR_VARIANTS_BY_SHOWROOM,
                        "carVariants",
                        json!({ "showroomDocumentId": showroom_id }),
                        use_cache,
                    )
                    .await?
            }
        };

        let resolver = self.resource.transport();
        Ok(variants
            .iter()
            .map(|v| showroom_car_variant(v, showroom_id, resolver))
            .collect())
    }

    /// Showroom profile with its cars; the car list survives upstream failures
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn get_detailed_by_id(&self, ctx: &RequestContext, id: &str, use_cache: bool) -> CmsResult<DetailedShowroom> {
        let showroom = self.get_by_id(ctx, id, ItemQuery::new(), use_cache).await?;

        let cars = match self.get_car_variants(ctx, id, use_cache).await {
            Ok(cars) => cars,
            Err(e) if e.is_transport() => {
                warn!(showroom_id = %id, error = %e, "Showroom car lookup failed, returning profile only");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        Ok(DetailedShowroom {
            showroom,
            car_count: cars.len(),
            cars,
        })
    }

    pub async fn invalidate_cache(&self, ctx: &RequestContext) -> CmsResult<()> {
        self.resource.invalidate(ctx).await
    }

    fn to_showroom(&self, entry: &Entry<ShowroomRecord>) -> Showroom {
        let resolver = self.resource.transport();
        let showroom = &entry.attributes;
        Showroom {
            id: entry.identifier(),
            name: showroom.name.clone(),
            description: showroom.description.clone(),
            is_verified: showroom.is_verified,
            is_featured: showroom.is_featured,
            logo: media(&showroom.logo, resolver),
            cover: media(&showroom.cover, resolver),
            operating_hours: showroom.operating_hours.clone(),
            location: showroom.location.as_ref().map(location),
            contact_info: showroom.contact_info.clone(),
        }
    }
}

fn location(record: &LocationRecord) -> Location {
    Location {
        address: record.address.clone(),
        governorate: record.governorate.get().map(governorate_ref),
        city: record.city.get().map(city_ref),
        latitude: record.latitude,
        longitude: record.longitude,
    }
}

/// Whether an entry is the one a caller named, by document id or numeric id
fn is_entry(meta: &EntryMeta, id: &str) -> bool {
    (!meta.document_id.is_empty() && meta.document_id == id) || meta.id.map_or(false, |n| n.to_string() == id)
}

fn showroom_car_variant<R>(entry: &Entry<CarVariantRecord>, showroom_id: &str, resolver: &R) -> ShowroomCarVariant
where
    R: MediaUrlResolver + ?Sized,
{
    let variant = &entry.attributes;
    let pricing = variant
        .showroom_pricing
        .iter()
        .find(|p| p.showroom.get().map_or(false, |s| is_entry(&s.meta, showroom_id)))
        .or_else(|| variant.showroom_pricing.first());

    ShowroomCarVariant {
        id: entry.identifier(),
        title: variant_title(variant),
        thumbnail: variant
            .images
            .first()
            .map(|image| MediaReference::from_entry(image, resolver)),
        price: pricing.and_then(|p| p.price).unwrap_or(0),
        minimum_down_payment: pricing.and_then(|p| p.minimum_down_payment).unwrap_or(0),
        minimum_installments: pricing.and_then(|p| p.minimum_installments).unwrap_or(0),
    }
}
