//! Google Books cover lookup.
//!
//! Secondary cover source for editions the primary host has no artwork for.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::library_store::normalize_isbn;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const USER_AGENT: &str = "shelfscan/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Trait for sources that can supply a cover link by ISBN.
///
/// Total: failures yield `None`.
#[async_trait]
pub trait SecondaryCoverSource: Send + Sync {
    async fn cover_link(&self, isbn: &str) -> Option<String>;
}

/// Client for the Google Books volumes API.
pub struct GoogleBooksClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for GoogleBooksClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl GoogleBooksClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn lookup(&self, isbn: &str) -> reqwest::Result<Option<String>> {
        let url = format!("{}/books/v1/volumes", self.base_url);
        let response: VolumesResponse = self
            .client
            .get(&url)
            .query(&[("q", format!("isbn:{}", normalize_isbn(isbn)))])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|volume| volume.volume_info.image_links)
            .and_then(|links| best_link(&links)))
    }
}

#[async_trait]
impl SecondaryCoverSource for GoogleBooksClient {
    async fn cover_link(&self, isbn: &str) -> Option<String> {
        match self.lookup(isbn).await {
            Ok(link) => link,
            Err(e) => {
                debug!(isbn, error = %e, "Google Books lookup failed");
                None
            }
        }
    }
}

/// Pick the best-resolution link and normalize it for storage.
/// Tiers are tried from extra-large down to thumbnail.
fn best_link(links: &ImageLinks) -> Option<String> {
    [
        &links.extra_large,
        &links.large,
        &links.medium,
        &links.small,
        &links.thumbnail,
    ]
    .into_iter()
    .find_map(|link| link.as_deref())
    .map(normalize_link)
}

/// Google's links come over plain http and carry a page-curl decoration.
fn normalize_link(link: &str) -> String {
    link.replace("http://", "https://").replace("&edge=curl", "")
}

#[derive(Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Default, Deserialize)]
struct VolumeInfo {
    #[serde(rename = "imageLinks")]
    image_links: Option<ImageLinks>,
}

#[derive(Default, Deserialize)]
struct ImageLinks {
    #[serde(rename = "extraLarge")]
    extra_large: Option<String>,
    large: Option<String>,
    medium: Option<String>,
    small: Option<String>,
    thumbnail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_normalization() {
        assert_eq!(
            normalize_link("http://books.google.com/books/content?id=x&zoom=1&edge=curl&source=gbs_api"),
            "https://books.google.com/books/content?id=x&zoom=1&source=gbs_api"
        );
        assert_eq!(normalize_link("https://example.com/a.jpg"), "https://example.com/a.jpg");
    }

    #[test]
    fn test_tier_preference_order() {
        let links = ImageLinks {
            thumbnail: Some("http://t".to_string()),
            medium: Some("http://m".to_string()),
            ..Default::default()
        };
        assert_eq!(best_link(&links).as_deref(), Some("https://m"));

        let links = ImageLinks {
            extra_large: Some("http://xl".to_string()),
            thumbnail: Some("http://t".to_string()),
            ..Default::default()
        };
        assert_eq!(best_link(&links).as_deref(), Some("https://xl"));
    }

    #[test]
    fn test_no_links_yield_none() {
        assert_eq!(best_link(&ImageLinks::default()), None);
    }

    #[test]
    fn test_volumes_response_without_items() {
        let parsed: VolumesResponse = serde_json::from_str(r#"{"totalItems": 0}"#).unwrap();
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_volumes_response_mapping() {
        let raw = r#"{
            "items": [{
                "volumeInfo": {
                    "title": "Hyperion",
                    "imageLinks": {
                        "smallThumbnail": "http://st",
                        "thumbnail": "http://books.google.com/thumb?id=1&edge=curl"
                    }
                }
            }]
        }"#;
        let parsed: VolumesResponse = serde_json::from_str(raw).unwrap();
        let link = parsed
            .items
            .into_iter()
            .next()
            .and_then(|v| v.volume_info.image_links)
            .and_then(|l| best_link(&l));
        assert_eq!(link.as_deref(), Some("https://books.google.com/thumb?id=1"));
    }

    #[tokio::test]
    async fn test_cover_link_is_total_on_unreachable_host() {
        let client = GoogleBooksClient::new("http://127.0.0.1:1");
        assert_eq!(client.cover_link("9780575094147").await, None);
    }
}
