//! SQLite schema for the book catalog.
//!
//! Versioned schemas with forward migrations, driven by `PRAGMA user_version`.
//! A fresh database gets the latest schema directly; existing databases are
//! migrated one version at a time.

use rusqlite::Connection;

/// One schema version: full creation SQL plus the migration from the
/// previous version.
pub struct VersionedSchema {
    pub version: i64,
    pub create_sql: &'static str,
    pub migration_sql: Option<&'static str>,
}

const SCHEMA_V0: &str = "
CREATE TABLE IF NOT EXISTS books (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT NOT NULL,
    author          TEXT,
    isbn            TEXT,
    cover_url       TEXT,
    description     TEXT,
    publisher       TEXT,
    publish_year    INTEGER,
    catalog_key     TEXT,
    section         TEXT,
    source_image    TEXT,
    added_at        INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_books_section ON books(section);
";

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS books (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT NOT NULL,
    author          TEXT,
    isbn            TEXT,
    cover_url       TEXT,
    description     TEXT,
    publisher       TEXT,
    publish_year    INTEGER,
    catalog_key     TEXT,
    section         TEXT,
    source_image    TEXT,
    owned           INTEGER NOT NULL DEFAULT 1,
    added_at        INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_books_section ON books(section);
";

// Pre-wishlist databases lack the owned column; everything already cataloged
// was physically on the shelf, hence DEFAULT 1.
const MIGRATION_V1: &str = "ALTER TABLE books ADD COLUMN owned INTEGER NOT NULL DEFAULT 1;";

pub const CATALOG_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        create_sql: SCHEMA_V0,
        migration_sql: None,
    },
    VersionedSchema {
        version: 1,
        create_sql: SCHEMA_V1,
        migration_sql: Some(MIGRATION_V1),
    },
];

/// Create or migrate the catalog schema to the latest version.
pub fn migrate_if_needed(conn: &mut Connection) -> rusqlite::Result<()> {
    let latest = &CATALOG_SCHEMAS[CATALOG_SCHEMAS.len() - 1];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='books'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        // Brand new database, create the latest schema directly.
        conn.execute_batch(latest.create_sql)?;
        conn.pragma_update(None, "user_version", latest.version)?;
        return Ok(());
    }

    let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if current >= latest.version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in CATALOG_SCHEMAS.iter().filter(|s| s.version > current) {
        if let Some(migration) = schema.migration_sql {
            tx.execute_batch(migration)?;
        }
    }
    tx.pragma_update(None, "user_version", latest.version)?;
    tx.commit()
}
