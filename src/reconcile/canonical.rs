//! Canonical edition list input.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One entry of an externally curated edition list.
#[derive(Debug, Clone, Deserialize)]
pub struct CanonicalEntry {
    /// Physically possessed (true) vs. wishlist (false).
    #[serde(default)]
    pub owned: bool,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// Load a canonical list from a JSON array file.
pub fn load_canonical_list(path: &Path) -> Result<Vec<CanonicalEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read canonical list {:?}", path))?;
    let entries: Vec<CanonicalEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse canonical list {:?}", path))?;

    for entry in &entries {
        if entry.title.trim().is_empty() {
            bail!("Canonical list {:?} contains an entry with an empty title", path);
        }
        if entry.isbn.trim().is_empty() {
            bail!(
                "Canonical entry {:?} in {:?} has no ISBN",
                entry.title,
                path
            );
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_list(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_list() {
        let file = write_list(
            r#"[
                {"owned": true, "title": "Inverted World", "author": "Christopher Priest", "isbn": "9780575082106"},
                {"title": "Gateway", "author": "Frederik Pohl", "isbn": "9780575094239"}
            ]"#,
        );
        let entries = load_canonical_list(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].owned);
        // owned defaults to wishlist
        assert!(!entries[1].owned);
    }

    #[test]
    fn test_missing_isbn_rejected() {
        let file = write_list(r#"[{"title": "Gateway", "author": "Frederik Pohl", "isbn": " "}]"#);
        assert!(load_canonical_list(file.path()).is_err());
    }

    #[test]
    fn test_empty_title_rejected() {
        let file = write_list(r#"[{"title": "", "author": "A", "isbn": "123"}]"#);
        assert!(load_canonical_list(file.path()).is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let file = write_list("not json");
        assert!(load_canonical_list(file.path()).is_err());
    }
}
