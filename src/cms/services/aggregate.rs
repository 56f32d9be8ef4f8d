//! Aggregate computations behind the detailed and listing views.
//!
//! Everything here is a pure function of already-fetched records. Iteration
//! order is the upstream order and decides every "first seen" tie-break.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::cms::models::{
    media, CarVariantRecord, CatalogItem, CollectionQuery, Entry, MediaUrlResolver, PriceRange,
    ReviewItem, ShowroomOffer, ShowroomPricingRecord,
};
use crate::core::config::UpstreamFlavor;

/// Market price placeholder: the GraphQL schema generation has no market
/// price yet, so it is derived from the price range by a fixed offset.
// TODO: replace with the market price field once the CMS content type carries one
pub const MARKET_PRICE_PLACEHOLDER_OFFSET: i64 = 20_000;

/// Min and max over the priced values; `(0, 0)` when nothing is priced
pub fn price_range<I>(prices: I) -> PriceRange
where
    I: IntoIterator<Item = Option<i64>>,
{
    prices
        .into_iter()
        .flatten()
        .fold(None, |range: Option<PriceRange>, price| {
            Some(match range {
                Some(r) => PriceRange {
                    from: r.from.min(price),
                    to: r.to.max(price),
                },
                None => PriceRange { from: price, to: price },
            })
        })
        .unwrap_or_default()
}

/// Market price range shown next to the price range
pub fn market_price(range: PriceRange, flavor: UpstreamFlavor) -> PriceRange {
    match flavor {
        UpstreamFlavor::GraphQl => PriceRange {
            from: range.from + MARKET_PRICE_PLACEHOLDER_OFFSET,
            to: range.to + MARKET_PRICE_PLACEHOLDER_OFFSET,
        },
        UpstreamFlavor::Rest => PriceRange::default(),
    }
}

/// Smallest strictly positive value; zero and missing values mean "not specified"
pub fn min_positive<I>(values: I) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    values
        .into_iter()
        .flatten()
        .filter(|v| *v > 0)
        .min()
        .unwrap_or(0)
}

/// First non-empty string in iteration order
pub fn first_non_empty<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .find(|v| !v.trim().is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Showroom offers keyed by showroom id.
///
/// A later offer replaces an earlier one only when its price is strictly
/// lower; the entry keeps its first-seen position.
#[derive(Debug, Default)]
pub struct ShowroomOffers {
    offers: Vec<ShowroomOffer>,
    index: HashMap<String, usize>,
}

impl ShowroomOffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, offer: ShowroomOffer) {
        match self.index.get(&offer.id) {
            Some(&i) => {
                if offer.price < self.offers[i].price {
                    self.offers[i] = offer;
                }
            }
            None => {
                self.index.insert(offer.id.clone(), self.offers.len());
                self.offers.push(offer);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn into_vec(self) -> Vec<ShowroomOffer> {
        self.offers
    }
}

/// Unique non-empty links in first-seen order, numbered from 1
pub fn unique_links<'a, I>(links: I) -> Vec<(u32, String)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    links
        .into_iter()
        .filter(|link| !link.is_empty() && seen.insert(*link))
        .zip(1u32..)
        .map(|(link, id)| (id, link.to_string()))
        .collect()
}

/// Offer of one showroom pricing entry; `None` without a showroom or a price
pub fn showroom_offer<R>(pricing: &ShowroomPricingRecord, resolver: &R) -> Option<ShowroomOffer>
where
    R: MediaUrlResolver + ?Sized,
{
    let showroom = pricing.showroom.get()?;
    let price = pricing.price?;
    Some(ShowroomOffer {
        id: showroom.identifier(),
        name: showroom.attributes.name.clone(),
        logo: media(&showroom.attributes.logo, resolver),
        price,
        minimum_down_payment: pricing.minimum_down_payment.unwrap_or(0),
        minimum_installments: pricing.minimum_installments.unwrap_or(0),
    })
}

/// Derived figures over a set of variants
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantAggregate {
    pub price: PriceRange,
    pub minimum_down_payment: i64,
    pub minimum_installments: i64,
    pub warranty: String,
    pub showrooms: Vec<ShowroomOffer>,
    pub reviews: Vec<ReviewItem>,
    pub catalogs: Vec<CatalogItem>,
}

/// Join variants into one aggregate, in upstream order
pub fn aggregate_variants<R>(variants: &[Entry<CarVariantRecord>], resolver: &R) -> VariantAggregate
where
    R: MediaUrlResolver + ?Sized,
{
    let records = || variants.iter().map(|v| &v.attributes);

    let mut showrooms = ShowroomOffers::new();
    for pricing in records().flat_map(|v| v.showroom_pricing.iter()) {
        if let Some(offer) = showroom_offer(pricing, resolver) {
            showrooms.offer(offer);
        }
    }

    VariantAggregate {
        price: price_range(records().map(|v| v.price)),
        minimum_down_payment: min_positive(records().map(|v| v.minimum_down_payment)),
        minimum_installments: min_positive(records().map(|v| v.minimum_installments)),
        warranty: first_non_empty(records().map(|v| v.warranty.as_str())),
        showrooms: showrooms.into_vec(),
        reviews: unique_links(records().map(|v| v.review_link.as_str()))
            .into_iter()
            .map(|(id, url)| ReviewItem { id, url })
            .collect(),
        catalogs: unique_links(records().map(|v| v.brochure_url.as_str()))
            .into_iter()
            .map(|(id, url)| CatalogItem {
                id,
                url: resolver.resolve_media_url(&url),
            })
            .collect(),
    }
}

/// Filter on a relation's identifier: numeric ids match `id`, anything else `documentId`
pub fn id_filter(path: &[&str], id: &str) -> (String, String) {
    let field = if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        "id"
    } else {
        "documentId"
    };

    let mut key = String::from("filters");
    for segment in path.iter().chain(std::iter::once(&field)) {
        key.push('[');
        key.push_str(segment);
        key.push(']');
    }
    key.push_str("[$eq]");
    (key, id.to_string())
}

/// Convert REST bracket filters into a nested GraphQL filter input.
///
/// `filters[brand][documentId][$eq]=x` becomes
/// `{"brand": {"documentId": {"eq": "x"}}}`. Keys outside `filters[...]` are ignored.
pub fn graphql_filters(filters: &BTreeMap<String, String>) -> Value {
    let mut root = Value::Object(Map::new());
    for (key, value) in filters {
        if let Some(path) = filter_path(key) {
            merge(&mut root, nest(&path, Value::String(value.clone())));
        }
    }
    root
}

/// GraphQL variables of a collection document
pub fn graphql_variables(query: &CollectionQuery) -> Value {
    let mut variables = Map::new();

    let filters = graphql_filters(&query.filters);
    if filters.as_object().map_or(false, |f| !f.is_empty()) {
        variables.insert("filters".to_string(), filters);
    }

    let mut pagination = Map::new();
    if query.page > 0 {
        pagination.insert("page".to_string(), query.page.into());
    }
    if query.page_size > 0 {
        pagination.insert("pageSize".to_string(), query.page_size.into());
    }
    if !pagination.is_empty() {
        variables.insert("pagination".to_string(), Value::Object(pagination));
    }

    if !query.sort.is_empty() {
        variables.insert("sort".to_string(), query.sort.clone().into());
    }

    Value::Object(variables)
}

fn filter_path(key: &str) -> Option<Vec<&str>> {
    let mut rest = key.strip_prefix("filters")?;
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let end = inner.find(']')?;
        segments.push(&inner[..end]);
        rest = &inner[end + 1..];
    }
    (!segments.is_empty()).then_some(segments)
}

fn nest(path: &[&str], leaf: Value) -> Value {
    path.iter().rev().fold(leaf, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.trim_start_matches('$').to_string(), inner);
        Value::Object(map)
    })
}

fn merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}
