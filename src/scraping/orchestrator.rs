//! Scrape orchestrator: drives one full run against a single source.
//!
//! Three strictly sequential phases: discover the index, iterate items with
//! an inter-request delay, report progress. Items are processed one at a
//! time on purpose; no concurrent fetches are ever issued against a
//! source. Only the index fetch is fatal; every
//! per-item failure is recorded and the run continues. Failed items are
//! never retried within a run.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{ScrapeError, ScrapeFailure};
use super::normalize::to_parsed_song;
use super::sources::SongSource;
use crate::domain::ParsedSong;
use crate::infrastructure::http_client::{FetchError, HttpClient};

/// Seam between the orchestrator and the network, so runs can be driven
/// against canned pages in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.get_text(url).await
    }
}

/// Per-run options. Index and item URLs are fixed per source; the item
/// limit is the only caller-supplied bound on work performed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScrapeOptions {
    pub limit: Option<usize>,
    /// Delay between consecutive item fetches.
    pub delay_ms: u64,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            limit: None,
            delay_ms: 1000,
        }
    }
}

/// Result of one scrape run. Partial failure is a normal outcome, not an
/// error: the run only fails as a whole when the index cannot be fetched.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub succeeded: Vec<ParsedSong>,
    pub failed: Vec<ScrapeFailure>,
}

/// Advisory progress callback: `(current_index, total, title_or_url)`.
pub type ProgressCallback<'a> = Box<dyn Fn(usize, usize, &str) + Send + Sync + 'a>;

pub struct ScrapeOrchestrator<'a> {
    fetcher: &'a dyn PageFetcher,
    source: &'a dyn SongSource,
    options: ScrapeOptions,
    progress: Option<ProgressCallback<'a>>,
}

impl<'a> ScrapeOrchestrator<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, source: &'a dyn SongSource) -> Self {
        Self {
            fetcher,
            source,
            options: ScrapeOptions::default(),
            progress: None,
        }
    }

    pub fn with_options(mut self, options: ScrapeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run discover, iterate and throttle to completion.
    pub async fn run(&self) -> Result<ScrapeOutcome, ScrapeError> {
        let run_id = Uuid::new_v4();
        let source_name = self.source.name();
        info!(%run_id, source = source_name, "starting scrape run");

        // Discover: the only fatal failure mode.
        let index_url = self.source.index_url();
        let index_html = self
            .fetcher
            .fetch_page(index_url)
            .await
            .map_err(|e| ScrapeError::index_fetch(index_url, e))?;

        let mut urls = self.source.song_urls(&index_html);
        if let Some(limit) = self.options.limit {
            urls.truncate(limit);
        }
        let total = urls.len();
        info!(%run_id, total, "discovered song pages");

        let mut outcome = ScrapeOutcome::default();
        for (index, url) in urls.iter().enumerate() {
            let display = match self.process_item(url, &mut outcome).await {
                Some(title) => title,
                None => url.clone(),
            };
            if let Some(progress) = &self.progress {
                progress(index + 1, total, &display);
            }
            // Throttle between items, success or failure alike.
            if self.options.delay_ms > 0 && index + 1 < total {
                tokio::time::sleep(Duration::from_millis(self.options.delay_ms)).await;
            }
        }

        info!(
            %run_id,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "scrape run finished"
        );
        Ok(outcome)
    }

    /// Fetch, extract and normalize one item. Returns the song title on
    /// success; failures are recorded in the outcome.
    async fn process_item(&self, url: &str, outcome: &mut ScrapeOutcome) -> Option<String> {
        let html = match self.fetcher.fetch_page(url).await {
            Ok(html) => html,
            Err(e) => {
                let error = ScrapeError::item_fetch(url, e);
                warn!("{error}");
                outcome.failed.push(ScrapeFailure {
                    identifier: url.to_string(),
                    error: error.to_string(),
                });
                return None;
            }
        };

        match self.source.extract(&html, url) {
            Some(raw) => {
                let song = to_parsed_song(&raw, self.source.name(), url);
                let title = song.title.clone();
                outcome.succeeded.push(song);
                Some(title)
            }
            None => {
                let error = ScrapeError::no_lyric_content(url);
                warn!("{error}");
                outcome.failed.push(ScrapeFailure {
                    identifier: url.to_string(),
                    error: error.to_string(),
                });
                None
            }
        }
    }
}
