//! Cover image validation.
//!
//! The cover host answers missing artwork with HTTP 200 and a tiny
//! placeholder, so status codes alone can't tell a real cover from a broken
//! one. Validation reads the response headers plus the first few body bytes
//! and applies size and signature heuristics.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "shelfscan/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// Bytes of body to inspect; enough for any image signature.
const HEAD_BYTES: usize = 512;

/// JPEG stream signature.
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// The "no cover available" placeholder is ~800 bytes; anything this small
/// is not a real cover. Responses without a Content-Length pass the check.
const MIN_CONTENT_LENGTH: u64 = 2000;
const MISSING_CONTENT_LENGTH: u64 = 99_999;

/// Classification of a probed response. Pure and deterministic over the
/// (content type, first bytes, declared length) triple.
pub fn classify(content_type: &str, head: &[u8], content_length: u64) -> bool {
    content_type.starts_with("image/")
        && head.len() >= JPEG_MAGIC.len()
        && head[..JPEG_MAGIC.len()] == JPEG_MAGIC
        && content_length > MIN_CONTENT_LENGTH
}

/// Trait for probing candidate cover URLs.
///
/// Total: any network error, timeout or malformed response yields `false`.
#[async_trait]
pub trait CoverProbe: Send + Sync {
    async fn is_valid_cover(&self, url: &str) -> bool;
}

/// Probes covers over HTTP, reading only the first bytes of the body.
pub struct HttpCoverProbe {
    client: reqwest::Client,
}

impl Default for HttpCoverProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCoverProbe {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    async fn probe(&self, url: &str) -> reqwest::Result<bool> {
        let mut response = self.client.get(url).send().await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let content_length = response.content_length().unwrap_or(MISSING_CONTENT_LENGTH);

        // Stream just the head of the body, never the whole image.
        let mut head = Vec::with_capacity(HEAD_BYTES);
        while head.len() < HEAD_BYTES {
            match response.chunk().await? {
                Some(chunk) => {
                    let take = (HEAD_BYTES - head.len()).min(chunk.len());
                    head.extend_from_slice(&chunk[..take]);
                }
                None => break,
            }
        }

        Ok(classify(&content_type, &head, content_length))
    }
}

#[async_trait]
impl CoverProbe for HttpCoverProbe {
    async fn is_valid_cover(&self, url: &str) -> bool {
        match self.probe(url).await {
            Ok(valid) => valid,
            Err(e) => {
                debug!(url, error = %e, "Cover probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEAD: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    #[test]
    fn test_real_jpeg_passes() {
        assert!(classify("image/jpeg", JPEG_HEAD, 5000));
    }

    #[test]
    fn test_html_error_page_fails() {
        assert!(!classify("text/html", b"<html><body>404", 5000));
    }

    #[test]
    fn test_placeholder_size_fails() {
        // The cover host's placeholder: valid JPEG bytes, ~810 byte body.
        assert!(!classify("image/jpeg", JPEG_HEAD, 810));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(!classify("image/jpeg", JPEG_HEAD, 2000));
        assert!(classify("image/jpeg", JPEG_HEAD, 2001));
    }

    #[test]
    fn test_wrong_signature_fails() {
        // PNG bytes served with a JPEG content type.
        assert!(!classify("image/jpeg", &[0x89, 0x50, 0x4E, 0x47], 5000));
    }

    #[test]
    fn test_truncated_body_fails() {
        assert!(!classify("image/jpeg", &[0xFF, 0xD8], 5000));
        assert!(!classify("image/jpeg", &[], 5000));
    }

    #[test]
    fn test_missing_content_length_defaults_high() {
        assert!(classify("image/jpeg", JPEG_HEAD, MISSING_CONTENT_LENGTH));
    }

    #[test]
    fn test_any_image_subtype_accepted() {
        // Content type check is prefix-based; signature still must be JPEG.
        assert!(classify("image/pjpeg", JPEG_HEAD, 5000));
    }

    #[tokio::test]
    async fn test_probe_is_total_on_unreachable_host() {
        let probe = HttpCoverProbe::new();
        assert!(!probe.is_valid_cover("http://127.0.0.1:1/cover.jpg").await);
    }

    #[tokio::test]
    async fn test_probe_is_total_on_nonsense_url() {
        let probe = HttpCoverProbe::new();
        assert!(!probe.is_valid_cover("not a url").await);
    }
}
