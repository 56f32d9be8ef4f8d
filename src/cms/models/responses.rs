//! Gateway-facing response contracts.
//!
//! Every type serializes in camelCase. Identifiers are strings (`documentId`
//! or the stringified numeric id), money amounts are whole currency units.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::media::MediaReference;
use super::records::{ContactInfo, VariantSpecs};
use super::strapi::Pagination;

/// A page of results with the upstream pagination block when one was sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, pagination: Option<Pagination>) -> Self {
        Self { data, pagination }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// Brands

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub logo: Option<MediaReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleBrand {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<MediaReference>,
}

// Car models

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarModel {
    pub id: String,
    pub name: String,
    pub body_type: String,
    pub fuel_type: String,
    pub slug: String,
    pub brand: Option<SimpleBrand>,
    pub images: Vec<MediaReference>,
}

/// Entry of a brand's car listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleCarModel {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<MediaReference>,
    pub price_from: i64,
    pub price_to: i64,
    pub market_price_from: i64,
    pub market_price_to: i64,
}

/// Parent model as embedded in variant views
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReference {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<MediaReference>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub id: u32,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: u32,
    pub url: String,
}

/// One showroom's offer for a variant (or the best offer across a model's variants)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowroomOffer {
    pub id: String,
    pub name: String,
    pub logo: Option<MediaReference>,
    pub price: i64,
    pub minimum_down_payment: i64,
    pub minimum_installments: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub price: i64,
    pub year: Option<i64>,
}

/// Car model joined with all of its variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedCarModel {
    pub id: String,
    pub title: String,
    pub body_type: String,
    pub fuel_type: String,
    pub slug: String,
    pub brand: Option<SimpleBrand>,
    pub images: Vec<MediaReference>,
    pub price_from: i64,
    pub price_to: i64,
    pub market_price_from: i64,
    pub market_price_to: i64,
    pub minimum_down_payment: i64,
    pub minimum_installments: i64,
    pub warranty: String,
    pub variants: Vec<VariantSummary>,
    pub showrooms: Vec<ShowroomOffer>,
    pub reviews: Vec<ReviewItem>,
    pub catalogs: Vec<CatalogItem>,
}

// Car variants

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarVariant {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub price: i64,
    pub year: Option<i64>,
    pub brochure_url: String,
    pub review_link: String,
    pub warranty: String,
    pub minimum_down_payment: i64,
    pub minimum_installments: i64,
    pub specs: Vec<VariantSpecs>,
    pub features: Map<String, Value>,
    pub images: Vec<MediaReference>,
    pub car_model: Option<ModelReference>,
    pub showrooms: Vec<ShowroomOffer>,
}

/// Variant page: the variant with its offers, reviews and brochures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedVariant {
    pub id: String,
    pub title: String,
    pub price: i64,
    pub year: Option<i64>,
    pub warranty: String,
    pub minimum_down_payment: i64,
    pub minimum_installments: i64,
    pub specs: Vec<VariantSpecs>,
    pub features: Map<String, Value>,
    pub images: Vec<MediaReference>,
    pub car_model: Option<ModelReference>,
    pub showrooms: Vec<ShowroomOffer>,
    pub reviews: Vec<ReviewItem>,
    pub catalogs: Vec<CatalogItem>,
}

// Showrooms

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub address: String,
    pub governorate: Option<PlaceRef>,
    pub city: Option<PlaceRef>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showroom {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_verified: bool,
    pub is_featured: bool,
    pub logo: Option<MediaReference>,
    pub cover: Option<MediaReference>,
    pub operating_hours: String,
    pub location: Option<Location>,
    pub contact_info: Option<ContactInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowroomSummary {
    pub id: String,
    pub name: String,
    pub logo: Option<MediaReference>,
    pub is_verified: bool,
    pub is_featured: bool,
}

/// A variant as sold by one showroom, at that showroom's price
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowroomCarVariant {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<MediaReference>,
    pub price: i64,
    pub minimum_down_payment: i64,
    pub minimum_installments: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedShowroom {
    #[serde(flatten)]
    pub showroom: Showroom,
    pub cars: Vec<ShowroomCarVariant>,
    pub car_count: usize,
}

// Advertisements

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub id: String,
    pub action: String,
    pub banner: Option<MediaReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementItem {
    pub id: String,
    pub action: String,
    pub banner_url: String,
}

// Places

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Governorate {
    pub id: String,
    pub name: String,
    pub cities: Vec<PlaceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: String,
    pub name: String,
    pub governorate: Option<PlaceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationVersion {
    pub mobile_app_version: String,
    pub mobile_app_build_number: String,
    pub web_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detailed_showroom_is_flat() {
        let detailed = DetailedShowroom {
            showroom: Showroom {
                id: "s1".into(),
                name: "Nile Cars".into(),
                is_verified: true,
                ..Default::default()
            },
            cars: Vec::new(),
            car_count: 0,
        };

        let value = serde_json::to_value(&detailed).unwrap();
        assert_eq!(value["id"], json!("s1"));
        assert_eq!(value["isVerified"], json!(true));
        assert_eq!(value["carCount"], json!(0));
        assert!(value.get("showroom").is_none());
    }

    #[test]
    fn test_paginated_omits_missing_pagination() {
        let page = Paginated::new(vec![PlaceRef { id: "c1".into(), name: "Giza".into() }], None);
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({"data": [{"id": "c1", "name": "Giza"}]})
        );
    }

    #[test]
    fn test_simple_car_model_wire_names() {
        let model = SimpleCarModel {
            id: "m1".into(),
            title: "Tucson".into(),
            price_from: 100,
            price_to: 500,
            ..Default::default()
        };
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["priceFrom"], json!(100));
        assert_eq!(value["marketPriceTo"], json!(0));
    }
}
