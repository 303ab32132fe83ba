//! Data models for the book catalog.

use serde::{Deserialize, Serialize};

/// A cataloged book as persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    /// Store-assigned identifier, immutable once set and never reused.
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publish_year: Option<i64>,
    /// External catalog identifier (Open Library work key).
    pub catalog_key: Option<String>,
    /// Grouping label, e.g. a named collection.
    pub section: Option<String>,
    /// Filename of the shelf photograph this record was detected in.
    pub source_image: Option<String>,
    /// Physically possessed vs. wishlist.
    pub owned: bool,
    /// Unix seconds, set once at insert.
    pub added_at: i64,
}

/// Insert payload. `id` and `added_at` are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publish_year: Option<i64>,
    pub catalog_key: Option<String>,
    pub section: Option<String>,
    pub source_image: Option<String>,
    pub owned: bool,
}

impl NewBook {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            owned: true,
            ..Default::default()
        }
    }
}

/// Update-by-id payload. Only the fields re-resolution is allowed to touch.
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
}

/// Lookup filter for `find_books` / `count_books`.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Substring match over title and author.
    pub query: Option<String>,
    /// Exact section match.
    pub section: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl BookFilter {
    pub fn section(section: impl Into<String>) -> Self {
        Self {
            section: Some(section.into()),
            ..Default::default()
        }
    }
}

/// Strip hyphens and spaces from a free-form ISBN.
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars().filter(|c| *c != '-' && *c != ' ').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_isbn() {
        assert_eq!(normalize_isbn("978-0-575-09414-7"), "9780575094147");
        assert_eq!(normalize_isbn(" 185798742X "), "185798742X");
        assert_eq!(normalize_isbn(""), "");
    }

    #[test]
    fn test_new_book_defaults_to_owned() {
        let book = NewBook::new("Dune");
        assert!(book.owned);
        assert!(book.section.is_none());
    }
}
