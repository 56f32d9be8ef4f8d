//! # Cache Key Generator
//!
//! Deterministic cache keys for CMS resources.
//!
//! REST keys have the shape `cms_<resource>[:<part>]*` where every part comes
//! from a non-empty query option. Map-valued options are encoded canonically
//! (sorted filter keys, sorted and de-duplicated fields) so that semantically
//! identical queries always share one key. `sort` keeps caller order because
//! the order changes the upstream result.
//!
//! GraphQL keys hash the document and its variables:
//! `graphql:<scope>:<sha256>`.

use crate::cms::models::{CollectionQuery, ItemQuery};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// Prefix of every REST resource key
pub const KEY_NAMESPACE: &str = "cms_";

/// Prefix of every GraphQL key
pub const GRAPHQL_NAMESPACE: &str = "graphql:";

/// Keys longer than this are shortened to a digest
const MAX_KEY_LENGTH: usize = 250;

/// Immutable cache key builder; every step consumes and returns the builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyBuilder {
    resource: String,
    parts: Vec<String>,
}

impl CacheKeyBuilder {
    pub fn new<S: Into<String>>(resource: S) -> Self {
        Self {
            resource: resource.into(),
            parts: Vec::new(),
        }
    }

    /// Append a raw part; empty parts are skipped
    pub fn part<S: Into<String>>(mut self, part: S) -> Self {
        let part = part.into();
        if !part.is_empty() {
            self.parts.push(part);
        }
        self
    }

    /// Append `name:value`; skipped when the value renders empty
    pub fn option<V: fmt::Display>(self, name: &str, value: V) -> Self {
        let value = value.to_string();
        if value.is_empty() {
            return self;
        }
        self.part(format!("{}:{}", name, value))
    }

    /// Append every non-empty option of a collection query
    pub fn collection(self, query: &CollectionQuery) -> Self {
        let mut builder = self;
        if query.page > 0 {
            builder = builder.option("page", query.page);
        }
        if query.page_size > 0 {
            builder = builder.option("pageSize", query.page_size);
        }
        builder = builder
            .option("populate", &query.populate)
            .option("locale", &query.locale);
        if !query.sort.is_empty() {
            builder = builder.option("sort", encode(&query.sort));
        }
        if !query.filters.is_empty() {
            builder = builder.option("filters", encode(&query.filters));
        }
        builder.fields(&query.fields)
    }

    /// Append every non-empty option of an item query
    pub fn item(self, query: &ItemQuery) -> Self {
        self.option("populate", &query.populate)
            .option("locale", &query.locale)
            .fields(&query.fields)
    }

    fn fields(self, fields: &[String]) -> Self {
        let canonical: BTreeSet<&str> = fields
            .iter()
            .map(String::as_str)
            .filter(|f| !f.is_empty())
            .collect();
        if canonical.is_empty() {
            return self;
        }
        self.option("fields", encode(&canonical))
    }

    /// Render the key
    pub fn build(&self) -> String {
        let head = format!("{}{}", KEY_NAMESPACE, self.resource);
        if self.parts.is_empty() {
            return head;
        }

        let tail = self.parts.join(":");
        if head.len() + 1 + tail.len() <= MAX_KEY_LENGTH {
            return format!("{}:{}", head, tail);
        }

        // The resource prefix survives hashing so resource-scoped deletes still match
        format!("{}:hash:{}", head, hex::encode(Sha256::digest(tail.as_bytes())))
    }

    /// Glob pattern matching every key of a resource
    pub fn resource_pattern(resource: &str) -> String {
        format!("{}{}*", KEY_NAMESPACE, resource)
    }
}

impl fmt::Display for CacheKeyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

/// Key of a GraphQL request: `graphql:<scope>:<sha256(query "\n" variables)>`
pub fn graphql_key(scope: &str, query: &str, variables: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_json(variables).as_bytes());
    format!("{}{}:{}", GRAPHQL_NAMESPACE, scope, hex::encode(hasher.finalize()))
}

/// Glob pattern matching every GraphQL key of a scope
pub fn graphql_pattern(scope: &str) -> String {
    format!("{}{}:*", GRAPHQL_NAMESPACE, scope)
}

fn encode<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// JSON text with object keys sorted at every level
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", encode(k), canonical_json(&map[k.as_str()])))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_resource_key() {
        assert_eq!(CacheKeyBuilder::new("brands").build(), "cms_brands");
    }

    #[test]
    fn test_collection_key_parts_in_order() {
        let query = CollectionQuery::new()
            .with_page(2)
            .with_page_size(25)
            .with_populate("*")
            .with_locale("ar")
            .with_sort("Name:asc")
            .with_filter("filters[brand][id][$eq]", "7")
            .with_field("Name");

        let key = CacheKeyBuilder::new("car-models").collection(&query).build();
        assert_eq!(
            key,
            r#"cms_car-models:page:2:pageSize:25:populate:*:locale:ar:sort:["Name:asc"]:filters:{"filters[brand][id][$eq]":"7"}:fields:["Name"]"#
        );
    }

    #[test]
    fn test_empty_options_do_not_contribute() {
        let plain = CacheKeyBuilder::new("brands")
            .collection(&CollectionQuery::new().with_page(1))
            .build();
        let with_empties = CacheKeyBuilder::new("brands")
            .collection(&CollectionQuery::new().with_page(1).with_page_size(0).with_locale(""))
            .part("")
            .build();
        assert_eq!(plain, with_empties);
    }

    #[test]
    fn test_filter_and_field_order_is_canonical() {
        let a = CollectionQuery::new()
            .with_filter("filters[b]", "2")
            .with_filter("filters[a]", "1")
            .with_field("Slug")
            .with_field("Name");
        let b = CollectionQuery::new()
            .with_filter("filters[a]", "1")
            .with_filter("filters[b]", "2")
            .with_field("Name")
            .with_field("Slug")
            .with_field("Name");

        assert_eq!(
            CacheKeyBuilder::new("brands").collection(&a).build(),
            CacheKeyBuilder::new("brands").collection(&b).build()
        );
    }

    #[test]
    fn test_sort_order_is_significant() {
        let a = CollectionQuery::new().with_sort("Name:asc").with_sort("Year:desc");
        let b = CollectionQuery::new().with_sort("Year:desc").with_sort("Name:asc");

        assert_ne!(
            CacheKeyBuilder::new("car-variants").collection(&a).build(),
            CacheKeyBuilder::new("car-variants").collection(&b).build()
        );
    }

    #[test]
    fn test_item_key() {
        let key = CacheKeyBuilder::new("brands")
            .option("id", "abc")
            .item(&ItemQuery::new().with_populate("logo").with_locale("en"))
            .build();
        assert_eq!(key, "cms_brands:id:abc:populate:logo:locale:en");
    }

    #[test]
    fn test_long_key_is_hashed_under_resource_prefix() {
        let mut query = CollectionQuery::new();
        for i in 0..40 {
            query = query.with_filter(format!("filters[field{}][$eq]", i), "value");
        }

        let key = CacheKeyBuilder::new("car-variants").collection(&query).build();
        assert!(key.starts_with("cms_car-variants:hash:"));
        assert_eq!(key.len(), "cms_car-variants:hash:".len() + 64);
        assert_eq!(key, CacheKeyBuilder::new("car-variants").collection(&query).build());

        let pattern = glob::Pattern::new(&CacheKeyBuilder::resource_pattern("car-variants")).unwrap();
        assert!(pattern.matches(&key));
    }

    #[test]
    fn test_graphql_key_is_stable_across_variable_order() {
        let query = "query GetBrand($documentId: ID!) { brand(documentId: $documentId) { Name } }";
        let a = graphql_key("brands", query, &json!({"documentId": "x", "locale": "en"}));
        let b = graphql_key("brands", query, &json!({"locale": "en", "documentId": "x"}));
        let c = graphql_key("brands", query, &json!({"documentId": "y", "locale": "en"}));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("graphql:brands:"));
        assert_eq!(a.len(), "graphql:brands:".len() + 64);
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": {"y": 1, "x": [ {"d": 2, "c": 1} ]}, "a": null});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":null,"b":{"x":[{"c":1,"d":2}],"y":1}}"#
        );
    }
}
