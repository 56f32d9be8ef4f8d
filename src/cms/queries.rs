//! GraphQL documents for the Strapi v5 GraphQL API.
//!
//! Collection documents take `$filters`, `$pagination` and `$sort` so one
//! document serves plain listings and filtered lookups. Field names follow the
//! CMS content types, misspellings included.

/// Selection set of a media field
macro_rules! media {
    () => {
        "{ documentId url width height formats alternativeText }"
    };
}

/// Selection set of a showroom relation inside variant pricing
macro_rules! pricing_showroom {
    () => {
        concat!("showroom { documentId Name IsVerified IsFeatured Logo ", media!(), " }")
    };
}

/// Selection set of a full variant
macro_rules! variant_fields {
    () => {
        concat!(
            "documentId Name DisplayName Price Year BrochureURL ReviewLink Warranty ",
            "MinimumDownPaymet MinimumInstallments ",
            "Specs { Motor Speed Transmission Horsepower LiterPerKM MaxSpeed Origin AssembledIn ",
            "Acceleration LengthInMM WidthInMM HeightInMM GroundClearanceInMM WheelBase ",
            "TractionType TrunkSize Seats } ",
            "Features ",
            "Images ", media!(), " ",
            "car_model { documentId Name Slug Images ", media!(), " } ",
            "ShowroomPricing { Price MinimuDownpayment MinimumInstallements ", pricing_showroom!(), " }"
        )
    };
}

pub const BRANDS: &str = concat!(
    "query Brands($filters: BrandFiltersInput, $pagination: PaginationArg, $sort: [String]) { ",
    "brands(filters: $filters, pagination: $pagination, sort: $sort) { documentId Name Slug Logo ",
    media!(),
    " } }"
);

pub const BRAND_BY_ID: &str = concat!(
    "query Brand($documentId: ID!) { brand(documentId: $documentId) { documentId Name Slug Logo ",
    media!(),
    " } }"
);

pub const CAR_MODELS: &str = concat!(
    "query CarModels($filters: CarModelFiltersInput, $pagination: PaginationArg, $sort: [String]) { ",
    "carModels(filters: $filters, pagination: $pagination, sort: $sort) { ",
    "documentId Name BodyType FuelType Slug Images ",
    media!(),
    " brand { documentId Name Slug Logo ",
    media!(),
    " } } }"
);

pub const CAR_MODEL_BY_ID: &str = concat!(
    "query CarModel($documentId: ID!) { carModel(documentId: $documentId) { ",
    "documentId Name BodyType FuelType Slug Images ",
    media!(),
    " brand { documentId Name Slug Logo ",
    media!(),
    " } } }"
);

pub const CAR_MODELS_BY_BRAND: &str = concat!(
    "query CarModelsByBrand($brandDocumentId: ID!) { ",
    "carModels(filters: { brand: { documentId: { eq: $brandDocumentId } } }, pagination: { limit: 1000 }) { ",
    "documentId Name Images ",
    media!(),
    " } }"
);

pub const CAR_VARIANTS: &str = concat!(
    "query CarVariants($filters: CarVariantFiltersInput, $pagination: PaginationArg, $sort: [String]) { ",
    "carVariants(filters: $filters, pagination: $pagination, sort: $sort) { ",
    variant_fields!(),
    " } }"
);

pub const CAR_VARIANTS_BY_MODEL: &str = concat!(
    "query CarVariantsByModel($carModelDocumentId: ID!) { ",
    "carVariants(filters: { car_model: { documentId: { eq: $carModelDocumentId } } }, pagination: { limit: 1000 }) { ",
    variant_fields!(),
    " } }"
);

pub const CAR_VARIANT_BY_ID: &str = concat!(
    "query CarVariant($documentId: ID!) { carVariant(documentId: $documentId) { ",
    variant_fields!(),
    " } }"
);

pub const SHOWROOMS: &str = concat!(
    "query Showrooms($filters: ShowroomFiltersInput, $pagination: PaginationArg, $sort: [String]) { ",
    "showrooms(filters: $filters, pagination: $pagination, sort: $sort) { ",
    "documentId Name Description IsVerified IsFeatured Logo ",
    media!(),
    " } }"
);

pub const SHOWROOM_BY_ID: &str = concat!(
    "query ShowroomProfile($documentId: ID!) { showroom(documentId: $documentId) { ",
    "documentId Name Description IsVerified IsFeatured OperatingHours ",
    "Logo ",
    media!(),
    " Cover ",
    media!(),
    " Location { Address Latitude Longitude governorate { documentId Name } city { documentId Name } } ",
    "ContactInfo { Phone Whatsapp Email WebsiteURL Tiktok Youtube X Instagram Facebook } ",
    "} }"
);

pub const CAR_VARIANTS_BY_SHOWROOM: &str = concat!(
    "query CarVariantsByShowroom($showroomDocumentId: ID!) { ",
    "carVariants(filters: { ShowroomPricing: { showroom: { documentId: { eq: $showroomDocumentId } } } }, ",
    "pagination: { limit: 1000 }) { ",
    "documentId Name DisplayName Images ",
    media!(),
    " ShowroomPricing(filters: { showroom: { documentId: { eq: $showroomDocumentId } } }) { ",
    "Price MinimuDownpayment MinimumInstallements showroom { documentId } } } }"
);

pub const ADVERTISEMENTS: &str = concat!(
    "query Advertisements($filters: AdvertisementFiltersInput, $pagination: PaginationArg, $sort: [String]) { ",
    "advertisements(filters: $filters, pagination: $pagination, sort: $sort) { documentId Action Banner ",
    media!(),
    " } }"
);

pub const ADVERTISEMENT_BY_ID: &str = concat!(
    "query Advertisement($documentId: ID!) { advertisement(documentId: $documentId) { documentId Action Banner ",
    media!(),
    " } }"
);

pub const GOVERNORATES: &str = concat!(
    "query Governorates($filters: GovernorateFiltersInput, $pagination: PaginationArg, $sort: [String]) { ",
    "governorates(filters: $filters, pagination: $pagination, sort: $sort) { ",
    "documentId Name cities { documentId Name } } }"
);

pub const GOVERNORATE_BY_ID: &str = concat!(
    "query Governorate($documentId: ID!) { governorate(documentId: $documentId) { ",
    "documentId Name cities { documentId Name } } }"
);

pub const CITIES: &str = concat!(
    "query Cities($filters: CityFiltersInput, $pagination: PaginationArg, $sort: [String]) { ",
    "cities(filters: $filters, pagination: $pagination, sort: $sort) { ",
    "documentId Name governorate { documentId Name } } }"
);

pub const CITY_BY_ID: &str = concat!(
    "query City($documentId: ID!) { city(documentId: $documentId) { ",
    "documentId Name governorate { documentId Name } } }"
);

pub const APPLICATION_VERSION: &str = concat!(
    "query ApplicationVersion { applicationVersion { ",
    "documentId MobileAppVersion MobileAppBuildNumber WebVersion } }"
);

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(document: &str) -> bool {
        let mut depth = 0i32;
        for c in document.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return false;
            }
        }
        depth == 0
    }

    #[test]
    fn test_documents_are_balanced() {
        for document in [
            BRANDS,
            BRAND_BY_ID,
            CAR_MODELS,
            CAR_MODEL_BY_ID,
            CAR_MODELS_BY_BRAND,
            CAR_VARIANTS,
            CAR_VARIANTS_BY_MODEL,
            CAR_VARIANT_BY_ID,
            SHOWROOMS,
            SHOWROOM_BY_ID,
            CAR_VARIANTS_BY_SHOWROOM,
            ADVERTISEMENTS,
            ADVERTISEMENT_BY_ID,
            GOVERNORATES,
            GOVERNORATE_BY_ID,
            CITIES,
            CITY_BY_ID,
            APPLICATION_VERSION,
        ] {
            assert!(balanced(document), "unbalanced document: {}", document);
        }
    }

    #[test]
    fn test_variant_documents_keep_upstream_spelling() {
        assert!(CAR_VARIANT_BY_ID.contains("MinimumDownPaymet"));
        assert!(CAR_VARIANT_BY_ID.contains("MinimuDownpayment"));
        assert!(CAR_VARIANTS_BY_SHOWROOM.contains("MinimumInstallements"));
    }
}
