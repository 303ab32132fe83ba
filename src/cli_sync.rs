//! Catalog Sync Tool
//!
//! Batch reconciliation against a curated edition list, plus cover repair.
//! Operates directly on the catalog database; run it while the server is
//! idle or pointed at the same database file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shelfscan::covers::{CoverResolver, GoogleBooksClient, HttpCoverProbe};
use shelfscan::metadata::OpenLibraryClient;
use shelfscan::pacing::MinIntervalPacer;
use shelfscan::reconcile::{load_canonical_list, CoverFixer, Reconciler};
use shelfscan::SqliteLibraryStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cli-sync")]
#[command(about = "Reconcile the book catalog against a canonical edition list")]
struct Args {
    /// Path to the SQLite catalog database file.
    #[arg(long, default_value = "./data/shelfscan.db")]
    db_path: PathBuf,

    /// Minimum interval between upstream calls, milliseconds.
    #[arg(long, default_value_t = 300)]
    pace_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge a canonical edition list into a catalog section: update ISBNs
    /// and validated covers for matches, insert missing records.
    Sync {
        /// Path to the canonical list (JSON array of
        /// {owned, title, author, isbn}).
        #[arg(long)]
        list: PathBuf,

        /// Section label the list belongs to.
        #[arg(long)]
        section: String,
    },
    /// Verify a section's covers and repair broken or placeholder ones via
    /// the fallback chain.
    FixCovers {
        /// Section label to check.
        #[arg(long)]
        section: String,

        /// Only retry records still carrying a generic by-id cover despite
        /// having an edition ISBN.
        #[arg(long, default_value_t = false)]
        only_generic: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let store = SqliteLibraryStore::new(&args.db_path)?;
    let pacer = MinIntervalPacer::new(Duration::from_millis(args.pace_ms));
    let probe = HttpCoverProbe::new();

    match args.command {
        Command::Sync { list, section } => {
            let entries = load_canonical_list(&list)?;
            info!("Loaded {} canonical entries for {:?}", entries.len(), section);

            let metadata = OpenLibraryClient::default();
            let reconciler = Reconciler::new(&store, &metadata, &probe, &pacer, section);
            let report = reconciler.run(&entries).await?;

            info!(
                "Done - {} covers updated, {} books added, {} ISBN-only (no validated cover), {} unchanged",
                report.updated, report.inserted, report.cover_miss, report.unchanged
            );
            if !report.failed.is_empty() {
                info!("Failed: {:?}", report.failed);
            }
        }
        Command::FixCovers {
            section,
            only_generic,
        } => {
            let resolver = CoverResolver::new(
                Arc::new(probe),
                Arc::new(GoogleBooksClient::default()),
            );
            let fixer = CoverFixer::new(&store, &resolver, &pacer);
            let report = fixer.run(&section, only_generic).await?;

            info!(
                "Done - {} already good, {} fixed, {} still missing",
                report.good, report.fixed, report.missing
            );
            if !report.failed.is_empty() {
                info!("Failed: {:?}", report.failed);
            }
        }
    }

    Ok(())
}
