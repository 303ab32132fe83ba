//! Cover art validation and resolution.

mod google_books;
mod resolver;
mod validator;

pub use google_books::{GoogleBooksClient, SecondaryCoverSource};
pub use resolver::{CoverResolution, CoverResolver, CoverSourceKind};
pub use validator::{classify, CoverProbe, HttpCoverProbe};

use crate::library_store::normalize_isbn;

const COVERS_BASE_URL: &str = "https://covers.openlibrary.org";

/// Cover URL for an Open Library numeric cover id (medium size).
pub fn id_cover_url(cover_id: i64) -> String {
    format!("{}/b/id/{}-M.jpg", COVERS_BASE_URL, cover_id)
}

/// Canonical cover URL for an ISBN (large size). The ISBN corresponds 1:1
/// with a physical edition, so this is the preferred source.
pub fn isbn_cover_url(raw_isbn: &str) -> Option<String> {
    let clean = normalize_isbn(raw_isbn);
    if clean.is_empty() {
        return None;
    }
    Some(format!("{}/b/isbn/{}-L.jpg", COVERS_BASE_URL, clean))
}

/// True when a URL points at a generic by-id cover rather than an
/// edition-specific by-ISBN cover.
pub fn is_generic_id_cover(url: &str) -> bool {
    url.contains("/b/id/")
}
