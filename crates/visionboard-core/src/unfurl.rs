//! Pull displayable media out of a web page's Open Graph tags.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// User agent sent when fetching pages to unfurl.
pub const UNFURL_USER_AGENT: &str = "Mozilla/5.0 (compatible; VisionBoard/1.0)";

/// Video properties, most preferred first.
const VIDEO_PROPERTIES: [&str; 3] = ["og:video", "og:video:secure_url", "og:video:url"];
const IMAGE_PROPERTIES: [&str; 2] = ["og:image", "og:image:secure_url"];

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta tag regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z][a-z0-9:_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});

/// Errors from link resolution.
#[derive(Debug, Error)]
pub enum UnfurlError {
    #[error("No media found")]
    NoMedia,
    #[error("Failed to fetch page: {0}")]
    Fetch(String),
}

/// Media found on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl MediaLink {
    pub fn is_video(&self) -> bool {
        self.video_url.is_some()
    }
}

/// Extract the Open Graph video and image URLs from an HTML document.
///
/// Attribute order does not matter and either `property` or `name` may carry
/// the key. Returns [`UnfurlError::NoMedia`] when neither is present.
pub fn extract_media(html: &str) -> Result<MediaLink, UnfurlError> {
    let tags: Vec<(String, String)> = META_TAG
        .find_iter(html)
        .filter_map(|tag| parse_meta(tag.as_str()))
        .collect();

    let first_of = |properties: &[&str]| {
        properties.iter().find_map(|property| {
            tags.iter()
                .find(|(key, content)| key == property && !content.is_empty())
                .map(|(_, content)| content.clone())
        })
    };

    let link = MediaLink {
        image_url: first_of(&IMAGE_PROPERTIES),
        video_url: first_of(&VIDEO_PROPERTIES),
    };
    if link.image_url.is_none() && link.video_url.is_none() {
        return Err(UnfurlError::NoMedia);
    }
    Ok(link)
}

/// `(property, content)` of a meta tag, keys lowercased.
fn parse_meta(tag: &str) -> Option<(String, String)> {
    let mut key = None;
    let mut content = None;
    for caps in ATTRIBUTE.captures_iter(tag) {
        let name = caps.get(1)?.as_str().to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| decode_entities(m.as_str().trim()))
            .unwrap_or_default();
        match name.as_str() {
            "property" | "name" if key.is_none() => key = Some(value.to_ascii_lowercase()),
            "content" => content = Some(value),
            _ => {}
        }
    }
    Some((key?, content?))
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_only() {
        let html = r#"<head><meta property="og:image" content="https://cdn.example.com/p.jpg" /></head>"#;
        let link = extract_media(html).unwrap();
        assert_eq!(link.image_url.as_deref(), Some("https://cdn.example.com/p.jpg"));
        assert!(!link.is_video());
    }

    #[test]
    fn test_video_preference_order() {
        let html = r#"
            <meta property="og:video:url" content="https://v.example.com/c.mp4">
            <meta property="og:video:secure_url" content="https://v.example.com/b.mp4">
            <meta property="og:image" content="https://v.example.com/poster.jpg">
        "#;
        let link = extract_media(html).unwrap();
        assert_eq!(link.video_url.as_deref(), Some("https://v.example.com/b.mp4"));
        assert_eq!(link.image_url.as_deref(), Some("https://v.example.com/poster.jpg"));
        assert!(link.is_video());
    }

    #[test]
    fn test_attribute_order_and_quotes() {
        let html = r#"<META content='https://x.example.com/a.png?w=1&amp;h=2' name="OG:IMAGE">"#;
        let link = extract_media(html).unwrap();
        assert_eq!(link.image_url.as_deref(), Some("https://x.example.com/a.png?w=1&h=2"));
    }

    #[test]
    fn test_no_media() {
        let html = r#"<meta property="og:title" content="Nothing to see"><meta property="og:image" content="">"#;
        assert!(matches!(extract_media(html), Err(UnfurlError::NoMedia)));
        assert!(matches!(extract_media(""), Err(UnfurlError::NoMedia)));
    }

    #[test]
    fn test_media_link_wire_format() {
        let link = MediaLink {
            image_url: Some("i".to_string()),
            video_url: None,
        };
        assert_eq!(serde_json::to_string(&link).unwrap(), r#"{"imageUrl":"i"}"#);
    }
}
