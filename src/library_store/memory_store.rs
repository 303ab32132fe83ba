//! In-memory library store.
//!
//! Backs route-level tests and reconciler tests; behaves like the SQLite
//! store for the trait surface the core uses.

use anyhow::{bail, Result};
use std::sync::Mutex;

use super::models::{BookFilter, BookRecord, BookUpdate, NewBook};
use super::trait_def::LibraryStore;

#[derive(Default)]
pub struct MemoryLibraryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    books: Vec<BookRecord>,
    next_id: i64,
}

impl MemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(record: &BookRecord, filter: &BookFilter) -> bool {
        if let Some(query) = &filter.query {
            let query = query.to_lowercase();
            let in_title = record.title.to_lowercase().contains(&query);
            let in_author = record
                .author
                .as_ref()
                .map(|a| a.to_lowercase().contains(&query))
                .unwrap_or(false);
            if !in_title && !in_author {
                return false;
            }
        }
        if let Some(section) = &filter.section {
            if record.section.as_deref() != Some(section.as_str()) {
                return false;
            }
        }
        true
    }
}

impl LibraryStore for MemoryLibraryStore {
    fn insert_book(&self, book: &NewBook) -> Result<BookRecord> {
        if book.title.trim().is_empty() {
            bail!("Refusing to insert a book with an empty title");
        }
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let record = BookRecord {
            id: inner.next_id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            cover_url: book.cover_url.clone(),
            description: book.description.clone(),
            publisher: book.publisher.clone(),
            publish_year: book.publish_year,
            catalog_key: book.catalog_key.clone(),
            section: book.section.clone(),
            source_image: book.source_image.clone(),
            owned: book.owned,
            added_at: chrono::Utc::now().timestamp(),
        };
        inner.books.push(record.clone());
        Ok(record)
    }

    fn update_book(&self, id: i64, update: &BookUpdate) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let record = match inner.books.iter_mut().find(|b| b.id == id) {
            Some(record) => record,
            None => bail!("No book with id {}", id),
        };
        if let Some(isbn) = &update.isbn {
            record.isbn = Some(isbn.clone());
        }
        if let Some(cover_url) = &update.cover_url {
            record.cover_url = Some(cover_url.clone());
        }
        Ok(())
    }

    fn get_book(&self, id: i64) -> Result<Option<BookRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.books.iter().find(|b| b.id == id).cloned())
    }

    fn find_books(&self, filter: &BookFilter) -> Result<Vec<BookRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<BookRecord> = inner
            .books
            .iter()
            .filter(|b| Self::matches(b, filter))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.added_at, b.id).cmp(&(a.added_at, a.id)));
        let books = matching
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(books)
    }

    fn count_books(&self, filter: &BookFilter) -> Result<usize> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.books.iter().filter(|b| Self::matches(b, filter)).count())
    }

    fn delete_book(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.books.len();
        inner.books.retain(|b| b.id != id);
        Ok(inner.books.len() < before)
    }

    fn list_sections(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        let mut sections: Vec<String> = inner
            .books
            .iter()
            .filter_map(|b| b.section.clone())
            .filter(|s| !s.is_empty())
            .collect();
        sections.sort();
        sections.dedup();
        Ok(sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_never_reused() {
        let store = MemoryLibraryStore::new();
        let first = store.insert_book(&NewBook::new("A")).unwrap();
        store.delete_book(first.id).unwrap();
        let second = store.insert_book(&NewBook::new("B")).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_filter_matches_sqlite_semantics() {
        let store = MemoryLibraryStore::new();
        let mut book = NewBook::new("Roadside Picnic");
        book.author = Some("Arkady and Boris Strugatsky".to_string());
        book.section = Some("SF Masterworks".to_string());
        store.insert_book(&book).unwrap();

        let filter = BookFilter {
            query: Some("strugatsky".to_string()),
            section: Some("SF Masterworks".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count_books(&filter).unwrap(), 1);

        let miss = BookFilter::section("Fantasy Masterworks");
        assert!(store.find_books(&miss).unwrap().is_empty());
    }
}
