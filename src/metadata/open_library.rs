//! Open Library search client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::types::{BookMetadata, FirstSentence, MetadataSource};
use crate::covers::id_cover_url;

const DEFAULT_BASE_URL: &str = "https://openlibrary.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the Open Library search API.
pub struct OpenLibraryClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for OpenLibraryClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl OpenLibraryClient {
    /// Create a client against a specific base URL (tests point this at a
    /// local server).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn search(&self, title: &str, author: Option<&str>) -> reqwest::Result<Vec<SearchDoc>> {
        let url = format!("{}/search.json", self.base_url);
        let mut params = vec![("title", title.to_string()), ("limit", "1".to_string())];
        if let Some(author) = author {
            params.push(("author", author.to_string()));
        }

        let response: SearchResponse = self
            .client
            .get(&url)
            .query(&params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.docs)
    }
}

#[async_trait]
impl MetadataSource for OpenLibraryClient {
    async fn resolve(&self, title: &str, author: Option<&str>) -> BookMetadata {
        let docs = match self.search(title, author).await {
            Ok(docs) => docs,
            Err(e) => {
                debug!(title, error = %e, "Open Library lookup failed, keeping input metadata");
                return BookMetadata::identity(title, author);
            }
        };

        match docs.into_iter().next() {
            Some(doc) => doc.into_metadata(title, author),
            None => BookMetadata::identity(title, author),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

/// One search result. Every field may be absent depending on the record.
#[derive(Debug, Default, Deserialize)]
struct SearchDoc {
    title: Option<String>,
    author_name: Option<Vec<String>>,
    isbn: Option<Vec<String>>,
    cover_i: Option<i64>,
    first_sentence: Option<FirstSentence>,
    publisher: Option<Vec<String>>,
    first_publish_year: Option<i64>,
    key: Option<String>,
}

impl SearchDoc {
    fn into_metadata(self, input_title: &str, input_author: Option<&str>) -> BookMetadata {
        BookMetadata {
            title: self
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| input_title.to_string()),
            author: self
                .author_name
                .and_then(|authors| authors.into_iter().next())
                .or_else(|| input_author.map(str::to_string)),
            isbn: self.isbn.and_then(|isbns| isbns.into_iter().next()),
            // No cover id means no cover URL, never a guess.
            cover_url: self.cover_i.map(id_cover_url),
            description: self.first_sentence.map(FirstSentence::into_text),
            publisher: self
                .publisher
                .and_then(|publishers| publishers.into_iter().next()),
            publish_year: self.first_publish_year,
            catalog_key: self.key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_doc_mapping() {
        let raw = r#"{
            "title": "Dune",
            "author_name": ["Frank Herbert", "Someone Else"],
            "isbn": ["0575081503", "9780575081505"],
            "cover_i": 11481354,
            "first_sentence": {"type": "/type/text", "value": "A beginning is the time..."},
            "publisher": ["Gollancz", "Chilton"],
            "first_publish_year": 1965,
            "key": "/works/OL893415W"
        }"#;
        let doc: SearchDoc = serde_json::from_str(raw).unwrap();
        let meta = doc.into_metadata("dune", None);

        assert_eq!(meta.title, "Dune");
        assert_eq!(meta.author.as_deref(), Some("Frank Herbert"));
        assert_eq!(meta.isbn.as_deref(), Some("0575081503"));
        assert_eq!(
            meta.cover_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/11481354-M.jpg")
        );
        assert_eq!(meta.description.as_deref(), Some("A beginning is the time..."));
        assert_eq!(meta.publisher.as_deref(), Some("Gollancz"));
        assert_eq!(meta.publish_year, Some(1965));
        assert_eq!(meta.catalog_key.as_deref(), Some("/works/OL893415W"));
    }

    #[test]
    fn test_sparse_doc_falls_back_to_input() {
        let doc: SearchDoc = serde_json::from_str("{}").unwrap();
        let meta = doc.into_metadata("Pavane", Some("Keith Roberts"));

        assert_eq!(meta.title, "Pavane");
        assert_eq!(meta.author.as_deref(), Some("Keith Roberts"));
        assert!(meta.isbn.is_none());
        assert!(meta.cover_url.is_none());
        assert!(meta.description.is_none());
    }

    #[test]
    fn test_plain_string_first_sentence() {
        let raw = r#"{"first_sentence": "It was love at first sight."}"#;
        let doc: SearchDoc = serde_json::from_str(raw).unwrap();
        let meta = doc.into_metadata("Catch-22", None);
        assert_eq!(meta.description.as_deref(), Some("It was love at first sight."));
    }

    #[tokio::test]
    async fn test_resolve_is_total_on_unreachable_host() {
        // Nothing listens here; resolve must degrade to the identity record.
        let client = OpenLibraryClient::new("http://127.0.0.1:1");
        let meta = client.resolve("Eon", Some("Greg Bear")).await;
        assert_eq!(meta, BookMetadata::identity("Eon", Some("Greg Bear")));
    }
}
