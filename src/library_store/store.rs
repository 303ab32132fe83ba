//! SQLite-backed library store implementation.

use anyhow::{bail, Context, Result};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use super::models::{BookFilter, BookRecord, BookUpdate, NewBook};
use super::schema::migrate_if_needed;
use super::trait_def::LibraryStore;

/// SQLite-backed book catalog store.
///
/// Writes commit immediately; there is no transactional batching across
/// records, so a failed batch leaves previously written records persisted.
pub struct SqliteLibraryStore {
    conn: Mutex<Connection>,
}

impl SqliteLibraryStore {
    /// Open (creating and migrating if needed) the catalog database.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create db directory {:?}", parent))?;
            }
        }

        let mut conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrate_if_needed(&mut conn).context("Failed to migrate catalog schema")?;

        info!("Opened catalog database at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate_if_needed(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<BookRecord> {
        Ok(BookRecord {
            id: row.get("id")?,
            title: row.get("title")?,
            author: row.get("author")?,
            isbn: row.get("isbn")?,
            cover_url: row.get("cover_url")?,
            description: row.get("description")?,
            publisher: row.get("publisher")?,
            publish_year: row.get("publish_year")?,
            catalog_key: row.get("catalog_key")?,
            section: row.get("section")?,
            source_image: row.get("source_image")?,
            owned: row.get::<_, i64>("owned")? != 0,
            added_at: row.get("added_at")?,
        })
    }

    /// Build the WHERE clause and its parameters for a filter.
    fn filter_clause(filter: &BookFilter) -> (String, Vec<String>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(query) = &filter.query {
            clauses.push("(title LIKE ? OR author LIKE ?)");
            let like = format!("%{}%", query);
            values.push(like.clone());
            values.push(like);
        }
        if let Some(section) = &filter.section {
            clauses.push("section = ?");
            values.push(section.clone());
        }
        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        (sql, values)
    }
}

impl LibraryStore for SqliteLibraryStore {
    fn insert_book(&self, book: &NewBook) -> Result<BookRecord> {
        if book.title.trim().is_empty() {
            bail!("Refusing to insert a book with an empty title");
        }

        let added_at = chrono::Utc::now().timestamp();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO books
             (title, author, isbn, cover_url, description, publisher, publish_year,
              catalog_key, section, source_image, owned, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                book.title,
                book.author,
                book.isbn,
                book.cover_url,
                book.description,
                book.publisher,
                book.publish_year,
                book.catalog_key,
                book.section,
                book.source_image,
                book.owned as i64,
                added_at,
            ],
        )
        .context("Failed to insert book")?;
        let id = conn.last_insert_rowid();

        Ok(BookRecord {
            id,
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
            added_at,
        })
    }

    fn update_book(&self, id: i64, update: &BookUpdate) -> Result<()> {
        let mut sets = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(isbn) = &update.isbn {
            sets.push("isbn = ?");
            values.push(isbn.clone());
        }
        if let Some(cover_url) = &update.cover_url {
            sets.push("cover_url = ?");
            values.push(cover_url.clone());
        }
        if sets.is_empty() {
            return Ok(());
        }

        let sql = format!("UPDATE books SET {} WHERE id = {}", sets.join(", "), id);
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(&sql, params_from_iter(values.iter()))
            .context("Failed to update book")?;
        if changed == 0 {
            bail!("No book with id {}", id);
        }
        Ok(())
    }

    fn get_book(&self, id: i64) -> Result<Option<BookRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM books WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], Self::row_to_record)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn find_books(&self, filter: &BookFilter) -> Result<Vec<BookRecord>> {
        let (where_sql, values) = Self::filter_clause(filter);
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "SELECT * FROM books {} ORDER BY added_at DESC, id DESC LIMIT {} OFFSET {}",
            where_sql, limit, filter.offset
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), Self::row_to_record)?;
        let mut books = Vec::new();
        for row in rows {
            books.push(row?);
        }
        Ok(books)
    }

    fn count_books(&self, filter: &BookFilter) -> Result<usize> {
        let (where_sql, values) = Self::filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM books {}", where_sql);
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |r| r.get(0))?;
        Ok(count as usize)
    }

    fn delete_book(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM books WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn list_sections(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT section FROM books
             WHERE section IS NOT NULL AND section != '' ORDER BY section",
        )?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut sections = Vec::new();
        for row in rows {
            sections.push(row?);
        }
        Ok(sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteLibraryStore {
        SqliteLibraryStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let store = store();
        let mut book = NewBook::new("Dune");
        book.author = Some("Frank Herbert".to_string());
        book.isbn = Some("0575081503".to_string());
        book.section = Some("SF Masterworks".to_string());

        let inserted = store.insert_book(&book).unwrap();
        assert!(inserted.id > 0);
        assert!(inserted.added_at > 0);

        let fetched = store.get_book(inserted.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Dune");
        assert_eq!(fetched.author.as_deref(), Some("Frank Herbert"));
        assert_eq!(fetched.added_at, inserted.added_at);
        assert!(fetched.owned);
    }

    #[test]
    fn test_insert_rejects_empty_title() {
        let store = store();
        assert!(store.insert_book(&NewBook::new("")).is_err());
        assert!(store.insert_book(&NewBook::new("   ")).is_err());
    }

    #[test]
    fn test_update_touches_only_requested_fields() {
        let store = store();
        let mut book = NewBook::new("Ubik");
        book.cover_url = Some("https://example.com/old.jpg".to_string());
        let inserted = store.insert_book(&book).unwrap();

        store
            .update_book(
                inserted.id,
                &BookUpdate {
                    isbn: Some("9780575094420".to_string()),
                    cover_url: None,
                },
            )
            .unwrap();

        let fetched = store.get_book(inserted.id).unwrap().unwrap();
        assert_eq!(fetched.isbn.as_deref(), Some("9780575094420"));
        assert_eq!(fetched.cover_url.as_deref(), Some("https://example.com/old.jpg"));
        assert_eq!(fetched.added_at, inserted.added_at);
    }

    #[test]
    fn test_update_unknown_id_fails() {
        let store = store();
        let update = BookUpdate {
            isbn: Some("123".to_string()),
            cover_url: None,
        };
        assert!(store.update_book(999, &update).is_err());
    }

    #[test]
    fn test_find_by_section_and_query() {
        let store = store();
        let mut a = NewBook::new("The Left Hand of Darkness");
        a.author = Some("Ursula K. Le Guin".to_string());
        a.section = Some("SF Masterworks".to_string());
        store.insert_book(&a).unwrap();

        let mut b = NewBook::new("The Dispossessed");
        b.author = Some("Ursula K. Le Guin".to_string());
        store.insert_book(&b).unwrap();

        let in_section = store
            .find_books(&BookFilter::section("SF Masterworks"))
            .unwrap();
        assert_eq!(in_section.len(), 1);
        assert_eq!(in_section[0].title, "The Left Hand of Darkness");

        let by_author = store
            .find_books(&BookFilter {
                query: Some("Le Guin".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_author.len(), 2);

        assert_eq!(store.count_books(&BookFilter::default()).unwrap(), 2);
    }

    #[test]
    fn test_delete() {
        let store = store();
        let inserted = store.insert_book(&NewBook::new("Gateway")).unwrap();
        assert!(store.delete_book(inserted.id).unwrap());
        assert!(!store.delete_book(inserted.id).unwrap());
        assert!(store.get_book(inserted.id).unwrap().is_none());
    }

    #[test]
    fn test_list_sections_distinct_sorted() {
        let store = store();
        for (title, section) in [
            ("A", Some("SF Masterworks")),
            ("B", Some("Fantasy Masterworks")),
            ("C", Some("SF Masterworks")),
            ("D", None),
        ] {
            let mut book = NewBook::new(title);
            book.section = section.map(str::to_string);
            store.insert_book(&book).unwrap();
        }
        assert_eq!(
            store.list_sections().unwrap(),
            vec!["Fantasy Masterworks", "SF Masterworks"]
        );
    }

    #[test]
    fn test_on_disk_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        {
            let store = SqliteLibraryStore::new(&db_path).unwrap();
            store.insert_book(&NewBook::new("Hyperion")).unwrap();
        }
        let store = SqliteLibraryStore::new(&db_path).unwrap();
        assert_eq!(store.count_books(&BookFilter::default()).unwrap(), 1);
    }
}
