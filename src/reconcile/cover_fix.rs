//! Cover fix batch.
//!
//! Walks a section and repairs missing or placeholder covers through the
//! fallback chain. `only_generic` restricts the pass to records still
//! carrying a generic by-id cover despite having an edition ISBN.

use anyhow::Result;
use tracing::{info, warn};

use crate::covers::{is_generic_id_cover, CoverResolution, CoverResolver, CoverSourceKind};
use crate::library_store::{BookFilter, BookUpdate, LibraryStore};
use crate::pacing::CallPacer;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoverFixReport {
    /// Current cover validated, nothing written.
    pub good: usize,
    /// New cover adopted and written.
    pub fixed: usize,
    /// No source resolved; existing cover left untouched.
    pub missing: usize,
    pub failed: Vec<String>,
}

pub struct CoverFixer<'a> {
    store: &'a dyn LibraryStore,
    resolver: &'a CoverResolver,
    pacer: &'a dyn CallPacer,
}

impl<'a> CoverFixer<'a> {
    pub fn new(
        store: &'a dyn LibraryStore,
        resolver: &'a CoverResolver,
        pacer: &'a dyn CallPacer,
    ) -> Self {
        Self {
            store,
            resolver,
            pacer,
        }
    }

    pub async fn run(&self, section: &str, only_generic: bool) -> Result<CoverFixReport> {
        let mut records = self.store.find_books(&BookFilter::section(section))?;
        if only_generic {
            records.retain(|r| {
                r.cover_url.as_deref().is_some_and(is_generic_id_cover)
                    && r.isbn.as_deref().is_some_and(|i| !i.is_empty())
            });
        }
        info!(section, candidates = records.len(), "Checking covers");

        let mut report = CoverFixReport::default();
        for record in &records {
            self.pacer.pace().await;
            let resolution = self
                .resolver
                .resolve(record.cover_url.as_deref(), record.isbn.as_deref())
                .await;

            match resolution {
                CoverResolution::Kept => {
                    info!("  ok: {}", record.title);
                    report.good += 1;
                }
                CoverResolution::Adopted { url, source } => {
                    let label = match source {
                        CoverSourceKind::OpenLibrary => "OL",
                        CoverSourceKind::GoogleBooks => "GB",
                    };
                    let update = BookUpdate {
                        isbn: None,
                        cover_url: Some(url),
                    };
                    match self.store.update_book(record.id, &update) {
                        Ok(()) => {
                            info!("  fixed [{}]: {}", label, record.title);
                            report.fixed += 1;
                        }
                        Err(e) => {
                            warn!("  failed to update {}: {:#}", record.title, e);
                            report.failed.push(record.title.clone());
                        }
                    }
                }
                CoverResolution::Miss => {
                    info!("  no cover found: {}", record.title);
                    report.missing += 1;
                }
            }
        }

        info!(
            good = report.good,
            fixed = report.fixed,
            missing = report.missing,
            failed = report.failed.len(),
            "Cover check finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covers::{CoverProbe, SecondaryCoverSource};
    use crate::library_store::{MemoryLibraryStore, NewBook};
    use crate::pacing::NoOpPacer;
    use async_trait::async_trait;
    use std::sync::Arc;

    const SECTION: &str = "SF Masterworks";

    struct FixedProbe(Vec<String>);

    #[async_trait]
    impl CoverProbe for FixedProbe {
        async fn is_valid_cover(&self, url: &str) -> bool {
            self.0.iter().any(|v| v == url)
        }
    }

    struct FixedSecondary(Option<String>);

    #[async_trait]
    impl SecondaryCoverSource for FixedSecondary {
        async fn cover_link(&self, _isbn: &str) -> Option<String> {
            self.0.clone()
        }
    }

    fn seed(store: &MemoryLibraryStore, title: &str, isbn: Option<&str>, cover: Option<&str>) -> i64 {
        let mut book = NewBook::new(title);
        book.isbn = isbn.map(str::to_string);
        book.cover_url = cover.map(str::to_string);
        book.section = Some(SECTION.to_string());
        store.insert_book(&book).unwrap().id
    }

    #[tokio::test]
    async fn test_good_fixed_and_missing_outcomes() {
        let store = MemoryLibraryStore::new();
        let good_id = seed(&store, "Dune", Some("0575081503"), Some("https://ok/cover.jpg"));
        let fix_id = seed(
            &store,
            "Nova",
            Some("9781473211919"),
            Some("https://broken/cover.jpg"),
        );
        let miss_id = seed(&store, "Pavane", Some("0000000000"), None);

        let probe = FixedProbe(vec![
            "https://ok/cover.jpg".to_string(),
            "https://covers.openlibrary.org/b/isbn/9781473211919-L.jpg".to_string(),
        ]);
        let resolver = CoverResolver::new(Arc::new(probe), Arc::new(FixedSecondary(None)));
        let fixer = CoverFixer::new(&store, &resolver, &NoOpPacer);

        let report = fixer.run(SECTION, false).await.unwrap();
        assert_eq!(report.good, 1);
        assert_eq!(report.fixed, 1);
        assert_eq!(report.missing, 1);

        assert_eq!(
            store.get_book(good_id).unwrap().unwrap().cover_url.as_deref(),
            Some("https://ok/cover.jpg")
        );
        assert_eq!(
            store.get_book(fix_id).unwrap().unwrap().cover_url.as_deref(),
            Some("https://covers.openlibrary.org/b/isbn/9781473211919-L.jpg")
        );
        // Miss leaves the record untouched.
        assert_eq!(store.get_book(miss_id).unwrap().unwrap().cover_url, None);
    }

    #[tokio::test]
    async fn test_only_generic_filters_candidates() {
        let store = MemoryLibraryStore::new();
        seed(
            &store,
            "VALIS",
            Some("9781473201682"),
            Some("https://covers.openlibrary.org/b/id/240727-M.jpg"),
        );
        // Edition cover already, skipped by the filter.
        seed(
            &store,
            "Emphyrio",
            Some("1857987101"),
            Some("https://covers.openlibrary.org/b/isbn/1857987101-L.jpg"),
        );
        // Generic cover but no ISBN to upgrade with, also skipped.
        seed(
            &store,
            "Mockingbird",
            None,
            Some("https://covers.openlibrary.org/b/id/9999-M.jpg"),
        );

        let resolver = CoverResolver::new(
            Arc::new(FixedProbe(vec![])),
            Arc::new(FixedSecondary(Some("https://gb/valis.jpg".to_string()))),
        );
        let fixer = CoverFixer::new(&store, &resolver, &NoOpPacer);

        let report = fixer.run(SECTION, true).await.unwrap();
        assert_eq!(report.fixed, 1);
        assert_eq!(report.good + report.missing, 0);
    }

    #[tokio::test]
    async fn test_rerun_after_fix_keeps_covers() {
        let store = MemoryLibraryStore::new();
        seed(&store, "Nova", Some("9781473211919"), None);

        let resolver = CoverResolver::new(
            Arc::new(FixedProbe(vec![
                "https://covers.openlibrary.org/b/isbn/9781473211919-L.jpg".to_string(),
            ])),
            Arc::new(FixedSecondary(None)),
        );
        let fixer = CoverFixer::new(&store, &resolver, &NoOpPacer);

        let first = fixer.run(SECTION, false).await.unwrap();
        assert_eq!(first.fixed, 1);

        // The adopted cover validates next time around, so it is kept.
        let second = fixer.run(SECTION, false).await.unwrap();
        assert_eq!(second.good, 1);
        assert_eq!(second.fixed, 0);
    }
}
