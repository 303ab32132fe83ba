//! Cover fallback chain.
//!
//! Ordered resolution of a record's cover art: keep a validating current
//! cover, else the edition's canonical by-ISBN cover, else a secondary
//! commercial source. Each step runs only when the previous one failed.

use std::sync::Arc;
use tracing::debug;

use super::google_books::SecondaryCoverSource;
use super::isbn_cover_url;
use super::validator::CoverProbe;

/// Where an adopted cover came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSourceKind {
    OpenLibrary,
    GoogleBooks,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverResolution {
    /// The record's current cover validated; nothing to change.
    Kept,
    /// A new cover URL should be written.
    Adopted {
        url: String,
        source: CoverSourceKind,
    },
    /// Nothing resolved; leave the existing cover untouched.
    Miss,
}

pub struct CoverResolver {
    probe: Arc<dyn CoverProbe>,
    secondary: Arc<dyn SecondaryCoverSource>,
}

impl CoverResolver {
    pub fn new(probe: Arc<dyn CoverProbe>, secondary: Arc<dyn SecondaryCoverSource>) -> Self {
        Self { probe, secondary }
    }

    /// Resolve the best cover for a record.
    pub async fn resolve(&self, current: Option<&str>, isbn: Option<&str>) -> CoverResolution {
        // 1. A current cover that validates stays; one probe, no further calls.
        if let Some(current_url) = current.filter(|u| !u.is_empty()) {
            if self.probe.is_valid_cover(current_url).await {
                return CoverResolution::Kept;
            }
        }

        let isbn = match isbn.filter(|i| !i.is_empty()) {
            Some(isbn) => isbn,
            None => return CoverResolution::Miss,
        };

        // 2. The canonical by-ISBN cover, preferred because it corresponds
        // 1:1 with the physical edition.
        if let Some(canonical) = isbn_cover_url(isbn) {
            if current != Some(canonical.as_str()) && self.probe.is_valid_cover(&canonical).await {
                return CoverResolution::Adopted {
                    url: canonical,
                    source: CoverSourceKind::OpenLibrary,
                };
            }
        }

        // 3. Secondary source. Its API exposes only a link, no bytes to
        // probe, so the link's presence is taken as sufficient.
        if let Some(link) = self.secondary.cover_link(isbn).await {
            return CoverResolution::Adopted {
                url: link,
                source: CoverSourceKind::GoogleBooks,
            };
        }

        debug!(isbn, "No cover resolved from any source");
        CoverResolution::Miss
    }
}
