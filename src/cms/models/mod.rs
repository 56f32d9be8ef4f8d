//! # CMS Models
//!
//! - [`options`]: query and cache options passed to the transport
//! - [`strapi`]: upstream envelopes, accepting both schema generations
//! - [`media`]: media fields and URL resolution
//! - [`records`]: upstream attribute records per content type
//! - [`responses`]: normalized response contracts

pub mod media;
pub mod options;
pub mod records;
pub mod responses;
pub mod strapi;

pub use media::{media, media_list, MediaBase, MediaFile, MediaFormat, MediaFormats, MediaReference, MediaUrlResolver};
pub use options::{CacheOptions, CollectionQuery, ItemQuery};
pub use records::{
    AdvertisementRecord, ApplicationVersionRecord, BrandRecord, CarModelRecord, CarVariantRecord,
    CityRecord, ContactInfo, GovernorateRecord, LocationRecord, ShowroomPricingRecord, ShowroomRecord,
    VariantSpecs,
};
pub use responses::*;
pub use strapi::{
    CollectionEnvelope, Entry, EntryMeta, ItemEnvelope, Pagination, Relation, RelationList,
    StrapiErrorBody, StrapiErrorEnvelope,
};
