//! Catalog reconciliation engine.
//!
//! Merges a canonical edition list into the catalog: existing records are
//! matched by normalized title and get the canonical ISBN (plus its cover
//! when it validates); unmatched entries are inserted. Re-running against an
//! unchanged list and catalog performs no writes.

use anyhow::Result;
use std::collections::HashMap;
use tracing::{info, warn};

use super::canonical::CanonicalEntry;
use super::normalize::normalize_title;
use crate::covers::isbn_cover_url;
use crate::covers::CoverProbe;
use crate::library_store::{normalize_isbn, BookFilter, BookRecord, BookUpdate, LibraryStore, NewBook};
use crate::metadata::MetadataSource;
use crate::pacing::CallPacer;

/// Per-run outcome counts. `updated`, `inserted` and `cover_miss` are
/// disjoint; `failed` lists titles of entries the store rejected.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// ISBN and validated cover written.
    pub updated: usize,
    /// New records created.
    pub inserted: usize,
    /// ISBN written but no cover validated; operator follow-up needed.
    pub cover_miss: usize,
    /// Already consistent, no write performed.
    pub unchanged: usize,
    pub failed: Vec<String>,
}

pub struct Reconciler<'a> {
    store: &'a dyn LibraryStore,
    metadata: &'a dyn MetadataSource,
    probe: &'a dyn CoverProbe,
    pacer: &'a dyn CallPacer,
    section: String,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a dyn LibraryStore,
        metadata: &'a dyn MetadataSource,
        probe: &'a dyn CoverProbe,
        pacer: &'a dyn CallPacer,
        section: impl Into<String>,
    ) -> Self {
        Self {
            store,
            metadata,
            probe,
            pacer,
            section: section.into(),
        }
    }

    /// Reconcile the catalog section against the canonical list.
    pub async fn run(&self, entries: &[CanonicalEntry]) -> Result<ReconcileReport> {
        let existing = self
            .store
            .find_books(&BookFilter::section(self.section.as_str()))?;
        let mut by_title: HashMap<String, BookRecord> = existing
            .into_iter()
            .map(|record| (normalize_title(&record.title), record))
            .collect();

        info!(
            section = %self.section,
            existing = by_title.len(),
            canonical = entries.len(),
            "Starting reconciliation"
        );

        let mut report = ReconcileReport::default();
        for entry in entries {
            let key = normalize_title(&entry.title);
            match by_title.get(&key) {
                Some(record) => self.reconcile_match(entry, record, &mut report).await,
                None => {
                    if let Some(inserted) = self.insert_entry(entry, &mut report).await {
                        // Visible to later duplicate titles in the same list.
                        by_title.insert(key, inserted);
                    }
                }
            }
        }

        info!(
            updated = report.updated,
            inserted = report.inserted,
            cover_miss = report.cover_miss,
            unchanged = report.unchanged,
            failed = report.failed.len(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    /// A canonical entry matched an existing record.
    async fn reconcile_match(
        &self,
        entry: &CanonicalEntry,
        record: &BookRecord,
        report: &mut ReconcileReport,
    ) {
        let isbn = normalize_isbn(&entry.isbn);
        let current_isbn = record.isbn.as_deref().map(normalize_isbn);
        if current_isbn.as_deref() == Some(isbn.as_str()) {
            // Already carries the canonical ISBN; leave the cover alone.
            report.unchanged += 1;
            return;
        }

        let canonical_cover = isbn_cover_url(&isbn);
        self.pacer.pace().await;
        let cover_validates = match &canonical_cover {
            Some(url) => self.probe.is_valid_cover(url).await,
            None => false,
        };

        let update = if cover_validates {
            BookUpdate {
                isbn: Some(isbn),
                cover_url: canonical_cover,
            }
        } else {
            // ISBN is still worth recording; the cover stays untouched
            // rather than being downgraded to an unvalidated URL.
            BookUpdate {
                isbn: Some(isbn),
                cover_url: None,
            }
        };

        match self.store.update_book(record.id, &update) {
            Ok(()) if cover_validates => {
                info!("  updated cover: {}", entry.title);
                report.updated += 1;
            }
            Ok(()) => {
                info!("  isbn only, no validated cover: {}", entry.title);
                report.cover_miss += 1;
            }
            Err(e) => {
                warn!("  failed to update {}: {:#}", entry.title, e);
                report.failed.push(entry.title.clone());
            }
        }
    }

    /// A canonical entry with no matching record.
    async fn insert_entry(
        &self,
        entry: &CanonicalEntry,
        report: &mut ReconcileReport,
    ) -> Option<BookRecord> {
        self.pacer.pace().await;
        let meta = self
            .metadata
            .resolve(&entry.title, Some(entry.author.as_str()))
            .await;

        let isbn = normalize_isbn(&entry.isbn);
        let book = NewBook {
            // The canonical list stays authoritative for the matching key
            // and the edition, so re-runs find this record again.
            title: entry.title.clone(),
            author: meta.author.or_else(|| Some(entry.author.clone())),
            isbn: Some(isbn.clone()),
            // First write tolerates a probable cover; a later fix pass
            // validates or replaces it.
            cover_url: isbn_cover_url(&isbn),
            description: meta.description,
            publisher: meta.publisher,
            publish_year: meta.publish_year,
            catalog_key: meta.catalog_key,
            section: Some(self.section.clone()),
            source_image: None,
            owned: entry.owned,
        };

        match self.store.insert_book(&book) {
            Ok(record) => {
                let status = if entry.owned { "owned" } else { "wishlist" };
                info!("  added: {} ({})", entry.title, status);
                report.inserted += 1;
                Some(record)
            }
            Err(e) => {
                warn!("  failed to add {}: {:#}", entry.title, e);
                report.failed.push(entry.title.clone());
                None
            }
        }
    }
}
