//! Query and cache options passed from services to the transport client.
//!
//! Zero and empty values mean "not set": they add neither a query parameter
//! nor a cache key part.

use std::collections::BTreeMap;
use std::time::Duration;

/// Options for a collection request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionQuery {
    pub page: u32,
    pub page_size: u32,
    /// Relations to populate, e.g. `*` or `Images,brand`
    pub populate: String,
    /// Raw upstream filter parameters, e.g. `filters[brand][id][$eq]` → `7`
    pub filters: BTreeMap<String, String>,
    /// Sort expressions in priority order, e.g. `Name:asc`
    pub sort: Vec<String>,
    pub locale: String,
    pub fields: Vec<String>,
}

impl CollectionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_populate<S: Into<String>>(mut self, populate: S) -> Self {
        self.populate = populate.into();
        self
    }

    pub fn with_locale<S: Into<String>>(mut self, locale: S) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_sort<S: Into<String>>(mut self, sort: S) -> Self {
        self.sort.push(sort.into());
        self
    }

    pub fn with_filter<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn with_field<S: Into<String>>(mut self, field: S) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Fill the locale only when the caller did not choose one
    pub fn or_locale(mut self, locale: &str) -> Self {
        if self.locale.is_empty() {
            self.locale = locale.to_string();
        }
        self
    }

    /// Fill the populate directive only when the caller did not choose one
    pub fn or_populate(mut self, populate: &str) -> Self {
        if self.populate.is_empty() {
            self.populate = populate.to_string();
        }
        self
    }
}

/// Options for a single-entity or singleton request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub populate: String,
    pub locale: String,
    pub fields: Vec<String>,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_populate<S: Into<String>>(mut self, populate: S) -> Self {
        self.populate = populate.into();
        self
    }

    pub fn with_locale<S: Into<String>>(mut self, locale: S) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_field<S: Into<String>>(mut self, field: S) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Fill the locale only when the caller did not choose one
    pub fn or_locale(mut self, locale: &str) -> Self {
        if self.locale.is_empty() {
            self.locale = locale.to_string();
        }
        self
    }

    /// Fill the populate directive only when the caller did not choose one
    pub fn or_populate(mut self, populate: &str) -> Self {
        if self.populate.is_empty() {
            self.populate = populate.to_string();
        }
        self
    }
}

/// Per-call cache behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub enabled: bool,
    /// Overrides the client's default TTL
    pub ttl: Option<Duration>,
}

impl CacheOptions {
    /// Cache with the given TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            enabled: true,
            ttl: Some(ttl),
        }
    }

    /// Always fetch fresh data
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Cache with `ttl` when `use_cache` is set
    pub fn when(use_cache: bool, ttl: Duration) -> Self {
        if use_cache {
            Self::with_ttl(ttl)
        } else {
            Self::disabled()
        }
    }
}
