//! Common types for metadata enrichment.

use async_trait::async_trait;
use serde::Deserialize;

/// Normalized bibliographic fields for one edition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publish_year: Option<i64>,
    pub catalog_key: Option<String>,
}

impl BookMetadata {
    /// The identity fallback: just the caller's own title and author.
    /// Returned whenever enrichment cannot improve on the input.
    pub fn identity(title: &str, author: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            author: author.map(str::to_string),
            ..Default::default()
        }
    }
}

/// Trait for metadata enrichment sources.
///
/// `resolve` is total: any network or parse failure degrades to the identity
/// fallback so callers always receive a usable record.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn resolve(&self, title: &str, author: Option<&str>) -> BookMetadata;
}

/// The search API's first-sentence field arrives either as a plain string or
/// as a typed object, depending on the record's age. Normalized to a string
/// at this boundary only.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FirstSentence {
    Text(String),
    Typed { value: String },
}

impl FirstSentence {
    pub fn into_text(self) -> String {
        match self {
            FirstSentence::Text(text) => text,
            FirstSentence::Typed { value } => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sentence_plain_string() {
        let parsed: FirstSentence = serde_json::from_str("\"It was a dark night.\"").unwrap();
        assert_eq!(parsed.into_text(), "It was a dark night.");
    }

    #[test]
    fn test_first_sentence_typed_value() {
        let parsed: FirstSentence =
            serde_json::from_str(r#"{"type": "/type/text", "value": "Call me Ishmael."}"#).unwrap();
        assert_eq!(parsed.into_text(), "Call me Ishmael.");
    }

    #[test]
    fn test_identity_fallback() {
        let meta = BookMetadata::identity("Emphyrio", Some("Jack Vance"));
        assert_eq!(meta.title, "Emphyrio");
        assert_eq!(meta.author.as_deref(), Some("Jack Vance"));
        assert!(meta.isbn.is_none());
        assert!(meta.cover_url.is_none());
    }
}
