//! LibraryStore trait definition.
//!
//! Abstracts catalog persistence so the server and the batch tools can run
//! against either the SQLite store or the in-memory store used in tests.

use anyhow::Result;

use super::models::{BookFilter, BookRecord, BookUpdate, NewBook};

/// Trait for book catalog storage backends.
pub trait LibraryStore: Send + Sync {
    /// Insert a new record. Fails if the title is empty. Returns the record
    /// with its assigned id and creation timestamp.
    fn insert_book(&self, book: &NewBook) -> Result<BookRecord>;

    /// Apply an update to an existing record. Fails if the id is unknown.
    /// `added_at` and `title` are never touched by updates.
    fn update_book(&self, id: i64, update: &BookUpdate) -> Result<()>;

    /// Get a record by id.
    fn get_book(&self, id: i64) -> Result<Option<BookRecord>>;

    /// Find records matching the filter, newest first.
    fn find_books(&self, filter: &BookFilter) -> Result<Vec<BookRecord>>;

    /// Count records matching the filter, ignoring paging.
    fn count_books(&self, filter: &BookFilter) -> Result<usize>;

    /// Delete a record. Returns false if the id was unknown.
    fn delete_book(&self, id: i64) -> Result<bool>;

    /// Distinct non-empty section labels, sorted.
    fn list_sections(&self) -> Result<Vec<String>>;
}
