//! Tolerant parsing of vision model output.
//!
//! Models routinely wrap the requested JSON array in prose or markdown
//! fences. This recovers the payload without demanding exact-format
//! compliance: anything that doesn't parse or lacks a title is dropped.

use serde_json::Value;

use super::types::DetectedBook;

/// Extract book candidates from free-form model text. Never fails; garbled
/// output yields an empty list.
pub fn parse_book_list(text: &str) -> Vec<DetectedBook> {
    let start = match text.find('[') {
        Some(start) => start,
        None => return Vec::new(),
    };
    let end = match text.rfind(']') {
        Some(end) if end > start => end,
        _ => return Vec::new(),
    };

    let items: Vec<Value> = match serde_json::from_str(&text[start..=end]) {
        Ok(items) => items,
        Err(_) => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let entry = item.as_object()?;
            let title = entry.get("title")?.as_str()?.trim();
            if title.is_empty() {
                return None;
            }
            let author = entry
                .get("author")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string);
            Some(DetectedBook {
                title: title.to_string(),
                author,
            })
        })
        .collect()
}
