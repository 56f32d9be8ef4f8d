//! Upstream envelope types shared by every resource.
//!
//! Strapi v4 wraps each entity as `{id, attributes: {...}}` and each relation
//! as `{data: ...}`; v5 (REST and GraphQL) returns flat objects carrying a
//! `documentId`. [`Entry`], [`Relation`] and [`RelationList`] accept either
//! shape and produce one flat value.

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity and bookkeeping fields of an upstream entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryMeta {
    #[serde(deserialize_with = "lenient_integer", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub document_id: String,

    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl EntryMeta {
    /// Externally exposed identifier: `documentId` when present, else the numeric id
    pub fn identifier(&self) -> String {
        if !self.document_id.is_empty() {
            return self.document_id.clone();
        }
        self.id.map(|id| id.to_string()).unwrap_or_default()
    }
}

/// One upstream entity with identity and attributes merged into one namespace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry<T> {
    pub meta: EntryMeta,
    pub attributes: T,
}

impl<T> Entry<T> {
    pub fn new(meta: EntryMeta, attributes: T) -> Self {
        Self { meta, attributes }
    }

    pub fn identifier(&self) -> String {
        self.meta.identifier()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Entry<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = match Value::deserialize(deserializer)? {
            Value::Object(map) => map,
            other => {
                return Err(de::Error::custom(format!(
                    "expected a CMS entry object, found {}",
                    kind(&other)
                )))
            }
        };

        // v4: lift attributes next to the identity fields; identity wins on clashes
        match map.remove("attributes") {
            Some(Value::Object(attributes)) => {
                for (key, value) in attributes {
                    map.entry(key).or_insert(value);
                }
            }
            Some(other) => {
                map.insert("attributes".to_string(), other);
            }
            None => {}
        }

        let merged = Value::Object(map);
        let meta = EntryMeta::deserialize(&merged).map_err(de::Error::custom)?;
        let attributes = T::deserialize(&merged).map_err(de::Error::custom)?;
        Ok(Self { meta, attributes })
    }
}

impl<T: Serialize> Serialize for Entry<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut merged = match serde_json::to_value(&self.meta).map_err(ser::Error::custom)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        match serde_json::to_value(&self.attributes).map_err(ser::Error::custom)? {
            Value::Object(attributes) => {
                for (key, value) in attributes {
                    merged.entry(key).or_insert(value);
                }
            }
            Value::Null => {}
            other => {
                merged.insert("attributes".to_string(), other);
            }
        }
        Value::Object(merged).serialize(serializer)
    }
}

/// Single relation: v4 `{data: entry|null}`, a bare v5 object, or null
#[derive(Debug, Clone, PartialEq)]
pub struct Relation<T>(pub Option<Entry<T>>);

impl<T> Default for Relation<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Relation<T> {
    pub fn get(&self) -> Option<&Entry<T>> {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Relation<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = unwrap_data(Value::deserialize(deserializer)?);
        let value = match value {
            Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
            other => other,
        };
        match value {
            Value::Null => Ok(Self(None)),
            other => Entry::deserialize(other)
                .map(|entry| Self(Some(entry)))
                .map_err(de::Error::custom),
        }
    }
}

/// Collection relation: v4 `{data: [...]}`, a bare v5 array, or null
#[derive(Debug, Clone, PartialEq)]
pub struct RelationList<T>(pub Vec<Entry<T>>);

impl<T> Default for RelationList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> RelationList<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, Entry<T>> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&Entry<T>> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for RelationList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match unwrap_data(Value::deserialize(deserializer)?) {
            Value::Null => Ok(Self(Vec::new())),
            Value::Array(items) => items
                .into_iter()
                .map(Entry::deserialize)
                .collect::<Result<Vec<_>, _>>()
                .map(Self)
                .map_err(de::Error::custom),
            other => Entry::deserialize(other)
                .map(|entry| Self(vec![entry]))
                .map_err(de::Error::custom),
        }
    }
}

/// Strip a v4 `{data: ...}` relation wrapper
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.contains_key("data")
                && !map.contains_key("id")
                && !map.contains_key("documentId") =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Pagination block of a collection response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvelopeMeta {
    pub pagination: Option<Pagination>,
}

/// `{data: [...], meta: {pagination}}`
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct CollectionEnvelope<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub data: Vec<Entry<T>>,

    #[serde(default)]
    pub meta: Option<EnvelopeMeta>,
}

impl<T> CollectionEnvelope<T> {
    pub fn pagination(&self) -> Option<Pagination> {
        self.meta.as_ref().and_then(|m| m.pagination)
    }
}

/// `{data: entry|null}`
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct ItemEnvelope<T> {
    #[serde(default = "Option::default")]
    pub data: Option<Entry<T>>,
}

/// Strapi error envelope: `{"error": {status, name, message, details}}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StrapiErrorEnvelope {
    pub error: StrapiErrorBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StrapiErrorBody {
    #[serde(deserialize_with = "lenient")]
    pub status: Option<u16>,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub message: String,
    pub details: Value,
}

/// `null` becomes the type's default
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Wrong-typed values become `None` instead of failing the whole entity
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64),
        _ => None,
    }
}

/// Integers that may arrive as floats or numeric strings; anything else is `None`
pub(crate) fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_integer(&Value::deserialize(deserializer)?))
}

/// Money amounts and years. Floats and numeric strings are coerced, null and
/// blank strings mean unset, any other value fails the entity.
pub(crate) fn amount<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        value => coerce_integer(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a numeric amount, got {}", value))),
    }
}

/// Pixel dimensions; negative or non-numeric values become `None`
pub(crate) fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_integer(deserializer)?.and_then(|n| u32::try_from(n).ok()))
}

/// Strings that some schema generations send as numbers
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Components that are single in one schema and repeatable in another
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(de::Error::custom),
        other => serde_json::from_value(other)
            .map(|item| vec![item])
            .map_err(de::Error::custom),
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Named {
        #[serde(rename = "Name", alias = "name", deserialize_with = "nullable")]
        name: String,
    }

    #[test]
    fn test_v4_and_v5_entries_are_equivalent() {
        let v4: Entry<Named> = serde_json::from_value(json!({
            "id": 7,
            "attributes": {"Name": "Toyota", "createdAt": "2024-01-01T00:00:00.000Z", "locale": "en"}
        }))
        .unwrap();
        let v5: Entry<Named> = serde_json::from_value(json!({
            "id": 7,
            "Name": "Toyota",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "locale": "en"
        }))
        .unwrap();

        assert_eq!(v4, v5);
        assert_eq!(v4.identifier(), "7");
        assert_eq!(v4.attributes.name, "Toyota");
        assert!(v4.meta.created_at.is_some());
    }

    #[test]
    fn test_document_id_is_preferred() {
        let entry: Entry<Named> =
            serde_json::from_value(json!({"id": 3, "documentId": "abc123", "Name": null})).unwrap();
        assert_eq!(entry.identifier(), "abc123");
        assert_eq!(entry.attributes.name, "");
    }

    #[test]
    fn test_entry_serializes_flat() {
        let entry: Entry<Named> = serde_json::from_value(json!({
            "id": 1,
            "attributes": {"Name": "Kia"}
        }))
        .unwrap();
        assert_eq!(serde_json::to_value(&entry).unwrap(), json!({"id": 1, "Name": "Kia"}));
    }

    #[test]
    fn test_entry_rejects_non_objects() {
        let err = serde_json::from_value::<Entry<Named>>(json!("brand")).unwrap_err();
        assert!(err.to_string().contains("expected a CMS entry object"));
    }

    #[test]
    fn test_relation_shapes() {
        let wrapped: Relation<Named> =
            serde_json::from_value(json!({"data": {"id": 1, "attributes": {"Name": "A"}}})).unwrap();
        let bare: Relation<Named> =
            serde_json::from_value(json!({"documentId": "d1", "Name": "A"})).unwrap();
        let empty: Relation<Named> = serde_json::from_value(json!({"data": null})).unwrap();
        let null: Relation<Named> = serde_json::from_value(json!(null)).unwrap();

        assert_eq!(wrapped.get().unwrap().attributes.name, "A");
        assert_eq!(bare.get().unwrap().identifier(), "d1");
        assert!(empty.is_empty());
        assert!(null.is_empty());
    }

    #[test]
    fn test_relation_list_shapes() {
        let wrapped: RelationList<Named> = serde_json::from_value(json!({
            "data": [{"id": 1, "attributes": {"Name": "A"}}, {"id": 2, "attributes": {"Name": "B"}}]
        }))
        .unwrap();
        let bare: RelationList<Named> =
            serde_json::from_value(json!([{"documentId": "x", "name": "A"}])).unwrap();
        let null: RelationList<Named> = serde_json::from_value(json!({"data": null})).unwrap();

        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped.0[1].attributes.name, "B");
        assert_eq!(bare.first().unwrap().identifier(), "x");
        assert!(null.is_empty());
    }

    #[test]
    fn test_collection_envelope() {
        let envelope: CollectionEnvelope<Named> = serde_json::from_value(json!({
            "data": [{"id": 1, "attributes": {"Name": "A"}}],
            "meta": {"pagination": {"page": 1, "pageSize": 25, "pageCount": 1, "total": 1}}
        }))
        .unwrap();
        assert_eq!(envelope.data.len(), 1);
        assert_eq!(envelope.pagination().unwrap().page_size, 25);

        let envelope: CollectionEnvelope<Named> =
            serde_json::from_value(json!({"data": null})).unwrap();
        assert!(envelope.data.is_empty());
        assert!(envelope.pagination().is_none());
    }

    #[test]
    fn test_item_envelope_null_data() {
        let envelope: ItemEnvelope<Named> = serde_json::from_value(json!({"data": null})).unwrap();
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_error_envelope() {
        let envelope: StrapiErrorEnvelope = serde_json::from_value(json!({
            "data": null,
            "error": {"status": 404, "name": "NotFoundError", "message": "Not Found", "details": {}}
        }))
        .unwrap();
        assert_eq!(envelope.error.status, Some(404));
        assert_eq!(envelope.error.name, "NotFoundError");
    }

    #[test]
    fn test_lenient_integer() {
        #[derive(Deserialize)]
        struct Amount {
            #[serde(default, deserialize_with = "lenient_integer")]
            value: Option<i64>,
        }

        let parse = |v: Value| serde_json::from_value::<Amount>(json!({"value": v})).unwrap().value;
        assert_eq!(parse(json!(1500)), Some(1500));
        assert_eq!(parse(json!(1499.6)), Some(1500));
        assert_eq!(parse(json!("250000")), Some(250000));
        assert_eq!(parse(json!("n/a")), None);
        assert_eq!(parse(json!(null)), None);
    }

    #[test]
    fn test_amount_rejects_non_numeric_values() {
        #[derive(Debug, Deserialize)]
        struct Priced {
            #[serde(default, deserialize_with = "amount")]
            price: Option<i64>,
        }

        let parse = |v: Value| serde_json::from_value::<Priced>(json!({"price": v}));
        assert_eq!(parse(json!(1_450_000)).unwrap().price, Some(1_450_000));
        assert_eq!(parse(json!(99.5)).unwrap().price, Some(100));
        assert_eq!(parse(json!(" 300 ")).unwrap().price, Some(300));
        assert_eq!(parse(json!("")).unwrap().price, None);
        assert_eq!(parse(json!(null)).unwrap().price, None);
        assert_eq!(serde_json::from_value::<Priced>(json!({})).unwrap().price, None);

        let err = parse(json!("about 300")).unwrap_err();
        assert!(err.to_string().contains("expected a numeric amount"));
        assert!(parse(json!({"amount": 900})).is_err());
        assert!(parse(json!(true)).is_err());
    }
}
