//! Media fields: the upstream file object and its normalized reference.
//!
//! Upstream URLs are usually relative (`/uploads/a.png`); every exposed
//! [`MediaReference`] carries an absolute URL. Size variants are decoded
//! field by field, so a malformed `formats` block yields `None` sub-fields
//! instead of failing the whole entity.

use serde::{Deserialize, Serialize};

use super::strapi::{lenient, lenient_dimension, nullable, Entry, Relation, RelationList};

/// Turns upstream media paths into absolute URLs
pub trait MediaUrlResolver {
    fn resolve_media_url(&self, url: &str) -> String;
}

/// Media base address, e.g. `https://cms.example.com`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaBase {
    base: String,
}

impl MediaBase {
    pub fn new<S: Into<String>>(base: S) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }
}

impl MediaUrlResolver for MediaBase {
    /// Empty and absolute URLs pass through; relative paths are joined to the
    /// base with exactly one slash.
    fn resolve_media_url(&self, url: &str) -> String {
        if url.is_empty()
            || url.starts_with("http://")
            || url.starts_with("https://")
            || url.starts_with("//")
            || self.base.is_empty()
        {
            return url.to_string();
        }
        format!("{}/{}", self.base, url.trim_start_matches('/'))
    }
}

/// Upstream media file attributes
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MediaFile {
    #[serde(deserialize_with = "nullable")]
    pub url: String,

    #[serde(deserialize_with = "lenient_dimension")]
    pub width: Option<u32>,

    #[serde(deserialize_with = "lenient_dimension")]
    pub height: Option<u32>,

    #[serde(deserialize_with = "lenient")]
    pub formats: Option<UpstreamFormats>,

    #[serde(rename = "alternativeText", deserialize_with = "lenient")]
    pub alternative_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamFormats {
    #[serde(deserialize_with = "lenient")]
    pub thumbnail: Option<UpstreamFormat>,
    #[serde(deserialize_with = "lenient")]
    pub small: Option<UpstreamFormat>,
    #[serde(deserialize_with = "lenient")]
    pub medium: Option<UpstreamFormat>,
    #[serde(deserialize_with = "lenient")]
    pub large: Option<UpstreamFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamFormat {
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient_dimension")]
    pub width: Option<u32>,
    #[serde(deserialize_with = "lenient_dimension")]
    pub height: Option<u32>,
}

/// Normalized media reference returned to gateway callers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaReference {
    pub id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<MediaFormats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFormats {
    pub thumbnail: Option<MediaFormat>,
    pub small: Option<MediaFormat>,
    pub medium: Option<MediaFormat>,
    pub large: Option<MediaFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFormat {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url: Option<String>,
}

impl MediaReference {
    /// Normalize one upstream file
    pub fn from_entry<R>(entry: &Entry<MediaFile>, resolver: &R) -> Self
    where
        R: MediaUrlResolver + ?Sized,
    {
        let file = &entry.attributes;
        let format = |f: &Option<UpstreamFormat>| {
            f.as_ref().map(|f| MediaFormat {
                width: f.width,
                height: f.height,
                url: f.url.as_deref().map(|url| resolver.resolve_media_url(url)),
            })
        };

        Self {
            id: entry.identifier(),
            width: file.width,
            height: file.height,
            url: resolver.resolve_media_url(&file.url),
            formats: file.formats.as_ref().map(|formats| MediaFormats {
                thumbnail: format(&formats.thumbnail),
                small: format(&formats.small),
                medium: format(&formats.medium),
                large: format(&formats.large),
            }),
        }
    }

    /// Thumbnail rendition, falling back to the original file
    pub fn thumbnail_url(&self) -> &str {
        self.formats
            .as_ref()
            .and_then(|f| f.thumbnail.as_ref())
            .and_then(|t| t.url.as_deref())
            .unwrap_or(&self.url)
    }

    /// Project the reference onto its thumbnail rendition. Files without a
    /// usable thumbnail keep the original URL and dimensions.
    pub fn into_thumbnail(self) -> MediaReference {
        let thumbnail = self
            .formats
            .and_then(|f| f.thumbnail)
            .and_then(|t| t.url.map(|url| (url, t.width, t.height)));

        match thumbnail {
            Some((url, width, height)) => MediaReference {
                id: self.id,
                width,
                height,
                url,
                formats: None,
            },
            None => MediaReference {
                formats: None,
                ..self
            },
        }
    }
}

/// Normalize an optional single media field
pub fn media<R>(relation: &Relation<MediaFile>, resolver: &R) -> Option<MediaReference>
where
    R: MediaUrlResolver + ?Sized,
{
    relation
        .get()
        .map(|entry| MediaReference::from_entry(entry, resolver))
}

/// Normalize a multi-file media field, keeping upstream order
pub fn media_list<R>(relation: &RelationList<MediaFile>, resolver: &R) -> Vec<MediaReference>
where
    R: MediaUrlResolver + ?Sized,
{
    relation
        .iter()
        .map(|entry| MediaReference::from_entry(entry, resolver))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> MediaBase {
        MediaBase::new("https://cms.example.com/")
    }

    #[test]
    fn test_resolve_media_url() {
        let base = base();
        assert_eq!(base.resolve_media_url(""), "");
        assert_eq!(base.resolve_media_url("http://x/y"), "http://x/y");
        assert_eq!(base.resolve_media_url("https://cdn/y.png"), "https://cdn/y.png");
        assert_eq!(base.resolve_media_url("//cdn/y.png"), "//cdn/y.png");
        assert_eq!(
            base.resolve_media_url("/uploads/a.png"),
            "https://cms.example.com/uploads/a.png"
        );
        assert_eq!(
            base.resolve_media_url("uploads/a.png"),
            "https://cms.example.com/uploads/a.png"
        );
    }

    #[test]
    fn test_normalize_v5_media() {
        let relation: Relation<MediaFile> = serde_json::from_value(json!({
            "id": 12,
            "documentId": "img1",
            "url": "/uploads/logo.png",
            "width": 640,
            "height": 480.0,
            "formats": {
                "thumbnail": {"url": "/uploads/thumbnail_logo.png", "width": 156, "height": 117},
                "small": {"url": 42, "width": "wide", "height": 375}
            }
        }))
        .unwrap();

        let media = media(&relation, &base()).unwrap();
        assert_eq!(media.id, "img1");
        assert_eq!(media.width, Some(640));
        assert_eq!(media.height, Some(480));
        assert_eq!(media.url, "https://cms.example.com/uploads/logo.png");

        let formats = media.formats.as_ref().unwrap();
        assert_eq!(
            formats.thumbnail.as_ref().unwrap().url.as_deref(),
            Some("https://cms.example.com/uploads/thumbnail_logo.png")
        );
        let small = formats.small.as_ref().unwrap();
        assert_eq!(small.url, None);
        assert_eq!(small.width, None);
        assert_eq!(small.height, Some(375));
        assert!(formats.medium.is_none());
        assert_eq!(
            media.thumbnail_url(),
            "https://cms.example.com/uploads/thumbnail_logo.png"
        );
    }

    #[test]
    fn test_normalize_v4_media_falls_back_to_numeric_id() {
        let relation: Relation<MediaFile> = serde_json::from_value(json!({
            "data": {"id": 5, "attributes": {"url": "https://cdn.example.com/a.jpg", "formats": "broken"}}
        }))
        .unwrap();

        let media = media(&relation, &base()).unwrap();
        assert_eq!(media.id, "5");
        assert_eq!(media.url, "https://cdn.example.com/a.jpg");
        assert!(media.formats.is_none());
        assert_eq!(media.thumbnail_url(), "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn test_thumbnail_projection() {
        let relation: Relation<MediaFile> = serde_json::from_value(json!({
            "id": 3,
            "url": "/uploads/corolla.png",
            "width": 1920,
            "height": 1080,
            "formats": {
                "thumbnail": {"url": "/uploads/thumbnail_corolla.png", "width": 245, "height": 138},
                "large": {"url": "/uploads/large_corolla.png", "width": 1000, "height": 563}
            }
        }))
        .unwrap();

        let thumbnail = media(&relation, &base()).unwrap().into_thumbnail();
        assert_eq!(
            thumbnail,
            MediaReference {
                id: "3".to_string(),
                width: Some(245),
                height: Some(138),
                url: "https://cms.example.com/uploads/thumbnail_corolla.png".to_string(),
                formats: None,
            }
        );

        let plain: Relation<MediaFile> =
            serde_json::from_value(json!({"id": 4, "url": "/uploads/tiny.png", "width": 90, "height": 60})).unwrap();
        let thumbnail = media(&plain, &base()).unwrap().into_thumbnail();
        assert_eq!(thumbnail.url, "https://cms.example.com/uploads/tiny.png");
        assert_eq!(thumbnail.width, Some(90));
        assert!(thumbnail.formats.is_none());
    }

    #[test]
    fn test_missing_media() {
        let relation: Relation<MediaFile> = serde_json::from_value(json!({"data": null})).unwrap();
        assert!(media(&relation, &base()).is_none());

        let list: RelationList<MediaFile> = serde_json::from_value(json!(null)).unwrap();
        assert!(media_list(&list, &base()).is_empty());
    }
}
