//! Dedup-aware import sink: best-effort batch insert of scraped songs.
//!
//! The set of existing natural keys (source URLs) is loaded once before the
//! loop and the dedup check is an in-memory membership test. A single
//! insert failure is recorded and never aborts the rest of the batch.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::ParsedSong;

/// Persistence seam for the sink. The pipeline only ever needs the full key
/// set up front and per-song inserts.
#[async_trait]
pub trait SongStore: Send + Sync {
    /// Every source URL already present in the target partition.
    async fn existing_source_urls(&self) -> anyhow::Result<HashSet<String>>;

    async fn insert(&self, song: &ParsedSong) -> anyhow::Result<()>;
}

/// One recorded per-song insert failure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportFailure {
    pub title: String,
    pub message: String,
}

/// Batch outcome counts.
#[derive(Debug, Default, serde::Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<ImportFailure>,
}

pub struct ImportSink<'a> {
    store: &'a dyn SongStore,
}

impl<'a> ImportSink<'a> {
    pub fn new(store: &'a dyn SongStore) -> Self {
        Self { store }
    }

    /// Import a scraped batch. Under `dry_run` the dedup classification
    /// still runs but no insert is issued and `inserted` stays 0.
    pub async fn import(&self, songs: &[ParsedSong], dry_run: bool) -> anyhow::Result<ImportReport> {
        let mut known = self.store.existing_source_urls().await?;
        debug!("loaded {} existing source urls", known.len());

        let mut report = ImportReport::default();
        for song in songs {
            if known.contains(&song.source_url) {
                report.skipped += 1;
                continue;
            }
            known.insert(song.source_url.clone());

            if dry_run {
                debug!("dry run, would insert '{}'", song.title);
                continue;
            }
            match self.store.insert(song).await {
                Ok(()) => report.inserted += 1,
                Err(e) => {
                    warn!("failed to insert '{}': {e:#}", song.title);
                    report.errors.push(ImportFailure {
                        title: song.title.clone(),
                        message: format!("{e:#}"),
                    });
                }
            }
        }

        info!(
            inserted = report.inserted,
            skipped = report.skipped,
            errors = report.errors.len(),
            dry_run,
            "import batch finished"
        );
        Ok(report)
    }
}
