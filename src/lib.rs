//! ShelfScan Library
//!
//! Catalogs physical books: shelf photographs go through a vision backend,
//! detected titles are enriched from Open Library, and batch tools reconcile
//! the catalog against curated edition lists.

pub mod config;
pub mod covers;
pub mod library_store;
pub mod metadata;
pub mod pacing;
pub mod reconcile;
pub mod server;
pub mod vision;

// Re-export commonly used types for convenience
pub use library_store::{LibraryStore, MemoryLibraryStore, SqliteLibraryStore};
pub use server::{build_router, run_server, ServerState};
