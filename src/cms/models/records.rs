//! Upstream attribute records.
//!
//! Field names follow the CMS content types. Aliases cover the spelling
//! differences between schema generations (`name`/`Name`, `Brand`/`brand`)
//! and the upstream's own misspellings (`MinimumDownPaymet`,
//! `MinimuDownpayment`, `MinimumInstallements`), which are part of the
//! contract and must not be "fixed" here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::media::MediaFile;
use super::strapi::{
    amount, lenient, nullable, one_or_many, string_or_number, Relation, RelationList,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrandRecord {
    #[serde(rename = "Name", alias = "name", deserialize_with = "nullable")]
    pub name: String,

    #[serde(rename = "Slug", alias = "slug", deserialize_with = "nullable")]
    pub slug: String,

    #[serde(rename = "Logo", alias = "logo")]
    pub logo: Relation<MediaFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarModelRecord {
    #[serde(rename = "Name", alias = "name", deserialize_with = "nullable")]
    pub name: String,

    /// Sedan, SUV, ...
    #[serde(rename = "BodyType", alias = "bodyType", deserialize_with = "nullable")]
    pub body_type: String,

    /// Electric, Hybrid, 80, 92, 95, ...
    #[serde(rename = "FuelType", alias = "fuelType", deserialize_with = "nullable")]
    pub fuel_type: String,

    #[serde(rename = "Slug", alias = "slug", deserialize_with = "nullable")]
    pub slug: String,

    #[serde(rename = "brand", alias = "Brand")]
    pub brand: Relation<BrandRecord>,

    #[serde(rename = "Images", alias = "images")]
    pub images: RelationList<MediaFile>,
}

/// Technical specification component
///
/// Decoded from the upstream PascalCase keys, exposed in camelCase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct VariantSpecs {
    #[serde(rename(deserialize = "Motor"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub motor: Option<f64>,
    #[serde(rename(deserialize = "Speed"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(rename(deserialize = "Transmission"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(rename(deserialize = "Horsepower"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub horsepower: Option<f64>,
    #[serde(rename(deserialize = "LiterPerKM"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub liter_per_km: Option<f64>,
    #[serde(rename(deserialize = "MaxSpeed"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    #[serde(rename(deserialize = "Origin"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(rename(deserialize = "AssembledIn"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub assembled_in: Option<String>,
    #[serde(rename(deserialize = "Acceleration"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<f64>,
    #[serde(rename(deserialize = "LengthInMM"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub length_in_mm: Option<f64>,
    #[serde(rename(deserialize = "WidthInMM"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub width_in_mm: Option<f64>,
    #[serde(rename(deserialize = "HeightInMM"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub height_in_mm: Option<f64>,
    #[serde(rename(deserialize = "GroundClearanceInMM"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ground_clearance_in_mm: Option<f64>,
    #[serde(rename(deserialize = "WheelBase"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub wheel_base: Option<f64>,
    #[serde(rename(deserialize = "TractionType"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub traction_type: Option<String>,
    #[serde(rename(deserialize = "TrunkSize"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub trunk_size: Option<f64>,
    #[serde(rename(deserialize = "Seats"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub seats: Option<f64>,
}

/// Price offered by one showroom for a variant
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShowroomPricingRecord {
    #[serde(rename = "Price", alias = "price", deserialize_with = "amount")]
    pub price: Option<i64>,

    #[serde(
        rename = "MinimuDownpayment",
        alias = "MinimumDownpayment",
        alias = "MinimumDownPayment",
        deserialize_with = "amount"
    )]
    pub minimum_down_payment: Option<i64>,

    #[serde(
        rename = "MinimumInstallements",
        alias = "MinimumInstallments",
        deserialize_with = "amount"
    )]
    pub minimum_installments: Option<i64>,

    #[serde(rename = "showroom", alias = "Showroom")]
    pub showroom: Relation<ShowroomRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarVariantRecord {
    #[serde(rename = "Name", alias = "name", deserialize_with = "nullable")]
    pub name: String,

    #[serde(rename = "DisplayName", alias = "displayName", deserialize_with = "nullable")]
    pub display_name: String,

    #[serde(rename = "Price", alias = "price", deserialize_with = "amount")]
    pub price: Option<i64>,

    #[serde(rename = "Year", alias = "year", deserialize_with = "amount")]
    pub year: Option<i64>,

    #[serde(rename = "BrochureURL", alias = "brochureUrl", deserialize_with = "nullable")]
    pub brochure_url: String,

    #[serde(rename = "ReviewLink", alias = "reviewLink", deserialize_with = "nullable")]
    pub review_link: String,

    #[serde(rename = "Warranty", alias = "warranty", deserialize_with = "nullable")]
    pub warranty: String,

    #[serde(
        rename = "MinimumDownPaymet",
        alias = "MinimumDownPayment",
        deserialize_with = "amount"
    )]
    pub minimum_down_payment: Option<i64>,

    #[serde(rename = "MinimumInstallments", deserialize_with = "amount")]
    pub minimum_installments: Option<i64>,

    #[serde(rename = "Specs", alias = "specs", deserialize_with = "one_or_many")]
    pub specs: Vec<VariantSpecs>,

    /// Free-form feature bag, kept as dynamic JSON
    #[serde(rename = "Features", alias = "features", deserialize_with = "nullable")]
    pub features: Map<String, Value>,

    #[serde(rename = "Images", alias = "images")]
    pub images: RelationList<MediaFile>,

    #[serde(rename = "car_model", alias = "CarModel", alias = "carModel")]
    pub car_model: Relation<CarModelRecord>,

    #[serde(rename = "ShowroomPricing", alias = "showroomPricing", deserialize_with = "one_or_many")]
    pub showroom_pricing: Vec<ShowroomPricingRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocationRecord {
    #[serde(rename = "Address", alias = "address", deserialize_with = "nullable")]
    pub address: String,

    #[serde(rename = "governorate", alias = "Governorate")]
    pub governorate: Relation<GovernorateRecord>,

    #[serde(rename = "city", alias = "City")]
    pub city: Relation<CityRecord>,

    #[serde(rename = "Latitude", alias = "latitude", deserialize_with = "lenient")]
    pub latitude: Option<f64>,

    #[serde(rename = "Longitude", alias = "longitude", deserialize_with = "lenient")]
    pub longitude: Option<f64>,
}

/// Showroom contact component, exposed as-is in camelCase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct ContactInfo {
    #[serde(rename(deserialize = "Phone"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename(deserialize = "Whatsapp"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(rename(deserialize = "Email"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename(deserialize = "WebsiteURL"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(rename(deserialize = "Tiktok"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tiktok: Option<String>,
    #[serde(rename(deserialize = "Youtube"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(rename(deserialize = "X"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(rename(deserialize = "Instagram"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(rename(deserialize = "Facebook"), deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShowroomRecord {
    #[serde(rename = "Name", alias = "name", deserialize_with = "nullable")]
    pub name: String,

    #[serde(rename = "Description", alias = "description", deserialize_with = "nullable")]
    pub description: String,

    #[serde(rename = "IsVerified", alias = "isVerified", deserialize_with = "nullable")]
    pub is_verified: bool,

    #[serde(rename = "IsFeatured", alias = "isFeatured", deserialize_with = "nullable")]
    pub is_featured: bool,

    #[serde(rename = "Logo", alias = "logo")]
    pub logo: Relation<MediaFile>,

    #[serde(rename = "Cover", alias = "cover")]
    pub cover: Relation<MediaFile>,

    #[serde(rename = "OperatingHours", alias = "operatingHours", deserialize_with = "nullable")]
    pub operating_hours: String,

    #[serde(rename = "Location", alias = "location")]
    pub location: Option<LocationRecord>,

    #[serde(rename = "ContactInfo", alias = "contactInfo")]
    pub contact_info: Option<ContactInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GovernorateRecord {
    #[serde(rename = "Name", alias = "name", deserialize_with = "nullable")]
    pub name: String,

    #[serde(rename = "cities", alias = "Cities")]
    pub cities: RelationList<CityRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CityRecord {
    #[serde(rename = "Name", alias = "name", deserialize_with = "nullable")]
    pub name: String,

    #[serde(rename = "governorate", alias = "Governorate")]
    pub governorate: Relation<GovernorateRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdvertisementRecord {
    #[serde(rename = "Action", alias = "action", deserialize_with = "nullable")]
    pub action: String,

    #[serde(rename = "Banner", alias = "banner")]
    pub banner: Relation<MediaFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApplicationVersionRecord {
    #[serde(rename = "MobileAppVersion", alias = "mobileAppVersion", deserialize_with = "nullable")]
    pub mobile_app_version: String,

    /// A number in the REST schema, a string in GraphQL
    #[serde(
        rename = "MobileAppBuildNumber",
        alias = "mobileAppBuildNumber",
        deserialize_with = "string_or_number"
    )]
    pub mobile_app_build_number: String,

    #[serde(rename = "WebVersion", alias = "webVersion", deserialize_with = "nullable")]
    pub web_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::models::strapi::Entry;
    use serde_json::json;

    #[test]
    fn test_car_variant_v4_shape() {
        let entry: Entry<CarVariantRecord> = serde_json::from_value(json!({
            "id": 11,
            "attributes": {
                "Name": "1.6 Highline",
                "Price": 1250000,
                "Year": 2024,
                "MinimumDownPaymet": 250000,
                "MinimumInstallments": 18000,
                "Specs": {"Motor": 1.6, "Transmission": "Automatic", "Horsepower": "n/a"},
                "Features": {"Sunroof": true},
                "CarModel": {"data": {"id": 3, "attributes": {"Name": "Tiguan"}}},
                "ShowroomPricing": [
                    {"Price": 1240000, "MinimuDownpayment": 200000, "showroom": {"data": {"id": 9, "attributes": {"Name": "Cairo Motors"}}}}
                ]
            }
        }))
        .unwrap();

        let variant = &entry.attributes;
        assert_eq!(entry.identifier(), "11");
        assert_eq!(variant.price, Some(1_250_000));
        assert_eq!(variant.minimum_down_payment, Some(250_000));
        assert_eq!(variant.specs.len(), 1);
        assert_eq!(variant.specs[0].motor, Some(1.6));
        assert_eq!(variant.specs[0].horsepower, None);
        assert_eq!(variant.features.get("Sunroof"), Some(&json!(true)));
        assert_eq!(variant.car_model.get().unwrap().attributes.name, "Tiguan");

        let pricing = &variant.showroom_pricing[0];
        assert_eq!(pricing.minimum_down_payment, Some(200_000));
        assert_eq!(pricing.showroom.get().unwrap().identifier(), "9");
    }

    #[test]
    fn test_car_variant_graphql_shape() {
        let entry: Entry<CarVariantRecord> = serde_json::from_value(json!({
            "documentId": "v1",
            "Name": "Base",
            "Price": null,
            "Warranty": null,
            "Features": null,
            "Specs": [{"Motor": 1200}],
            "car_model": {"documentId": "m1", "Name": "Sunny"},
            "ShowroomPricing": null
        }))
        .unwrap();

        let variant = &entry.attributes;
        assert_eq!(variant.price, None);
        assert_eq!(variant.warranty, "");
        assert!(variant.features.is_empty());
        assert!(variant.showroom_pricing.is_empty());
        assert_eq!(variant.car_model.get().unwrap().identifier(), "m1");
    }

    #[test]
    fn test_wrong_typed_amounts_fail_the_entry() {
        let object_price = serde_json::from_value::<Entry<CarVariantRecord>>(json!({
            "documentId": "v1",
            "Price": {"amount": 900}
        }));
        assert!(object_price.is_err());

        let prose_price = serde_json::from_value::<Entry<CarVariantRecord>>(json!({
            "documentId": "v1",
            "Price": 100,
            "ShowroomPricing": [{"Price": "about 300", "showroom": {"documentId": "s1"}}]
        }));
        assert!(prose_price.is_err());

        let numeric_text: Entry<CarVariantRecord> = serde_json::from_value(json!({
            "documentId": "v1",
            "Price": "1250000",
            "Year": 2024.0,
            "MinimumInstallments": ""
        }))
        .unwrap();
        assert_eq!(numeric_text.attributes.price, Some(1_250_000));
        assert_eq!(numeric_text.attributes.year, Some(2024));
        assert_eq!(numeric_text.attributes.minimum_installments, None);
    }

    #[test]
    fn test_specs_serialize_camel_case() {
        let specs = VariantSpecs {
            liter_per_km: Some(6.5),
            ground_clearance_in_mm: Some(180.0),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&specs).unwrap(),
            json!({"literPerKm": 6.5, "groundClearanceInMm": 180.0})
        );
    }

    #[test]
    fn test_showroom_location_and_contact() {
        let entry: Entry<ShowroomRecord> = serde_json::from_value(json!({
            "documentId": "s1",
            "Name": "Nile Cars",
            "IsVerified": null,
            "IsFeatured": true,
            "Location": {
                "Address": "90th St",
                "governorate": {"documentId": "g1", "Name": "Cairo"},
                "city": null,
                "Latitude": 30.02,
                "Longitude": "bad"
            },
            "ContactInfo": {"Phone": "+20100", "WebsiteURL": "https://nile.example"}
        }))
        .unwrap();

        let showroom = &entry.attributes;
        assert!(!showroom.is_verified);
        assert!(showroom.is_featured);

        let location = showroom.location.as_ref().unwrap();
        assert_eq!(location.governorate.get().unwrap().attributes.name, "Cairo");
        assert!(location.city.is_empty());
        assert_eq!(location.latitude, Some(30.02));
        assert_eq!(location.longitude, None);

        let contact = showroom.contact_info.as_ref().unwrap();
        assert_eq!(contact.website_url.as_deref(), Some("https://nile.example"));
        assert_eq!(
            serde_json::to_value(contact).unwrap(),
            json!({"phone": "+20100", "websiteUrl": "https://nile.example"})
        );
    }

    #[test]
    fn test_app_version_build_number() {
        let rest: Entry<ApplicationVersionRecord> = serde_json::from_value(json!({
            "id": 1,
            "attributes": {"mobileAppVersion": "2.1.0", "mobileAppBuildNumber": 42, "webVersion": "2.1.1"}
        }))
        .unwrap();
        let graphql: Entry<ApplicationVersionRecord> = serde_json::from_value(json!({
            "documentId": "av",
            "MobileAppVersion": "2.1.0",
            "MobileAppBuildNumber": "42",
            "WebVersion": "2.1.1"
        }))
        .unwrap();

        assert_eq!(rest.attributes, graphql.attributes);
        assert_eq!(rest.attributes.mobile_app_build_number, "42");
    }
}
