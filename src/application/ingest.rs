//! Ingest use case: authorize, scrape one source, import the batch.
//!
//! This is the single entry point callers go through. Authorization is
//! checked before any network or database side effect. Per-item scrape
//! failures and per-song insert failures are summarized in the response;
//! only an unreachable index or an unknown source name fails the call.

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::scraping::error::ScrapeError;
use crate::scraping::import::{ImportSink, SongStore};
use crate::scraping::orchestrator::{PageFetcher, ScrapeOptions, ScrapeOrchestrator};
use crate::scraping::sources;

/// How many failures the response carries in full; the rest are counted.
const FAILURE_PREVIEW_LIMIT: usize = 10;

/// Identity of whoever invoked the ingest.
#[derive(Debug, Clone)]
pub enum Caller {
    /// Internal scheduled job, trusted implicitly.
    Service,
    /// Interactive user; needs the admin role.
    User { roles: Vec<String> },
}

impl Caller {
    fn is_authorized(&self) -> bool {
        match self {
            Caller::Service => true,
            Caller::User { roles } => roles.iter().any(|r| r == "admin"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    /// Cap on the number of song pages fetched.
    pub limit: Option<usize>,
    /// Classify and report without writing to the database.
    pub dry_run: bool,
    /// Override of the inter-request delay, mainly for tests.
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct FailurePreview {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub scraped: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// First few failures, for operator triage.
    pub failures: Vec<FailurePreview>,
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("caller is not authorized to ingest songs")]
    Unauthorized,

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("import failed: {0}")]
    Import(#[from] anyhow::Error),
}

/// Run one full ingest of `source_name`.
pub async fn run_ingest(
    caller: &Caller,
    fetcher: &dyn PageFetcher,
    store: &dyn SongStore,
    source_name: &str,
    request: &IngestRequest,
) -> Result<IngestResponse, IngestError> {
    if !caller.is_authorized() {
        return Err(IngestError::Unauthorized);
    }
    let source = sources::by_name(source_name).ok_or_else(|| {
        IngestError::Scrape(ScrapeError::UnknownSource {
            name: source_name.to_string(),
        })
    })?;

    let mut options = ScrapeOptions {
        limit: request.limit,
        ..Default::default()
    };
    if let Some(delay_ms) = request.delay_ms {
        options.delay_ms = delay_ms;
    }

    let outcome = ScrapeOrchestrator::new(fetcher, source.as_ref())
        .with_options(options)
        .run()
        .await?;
    let scraped = outcome.succeeded.len();

    let sink = ImportSink::new(store);
    let report = sink.import(&outcome.succeeded, request.dry_run).await?;

    let failed = outcome.failed.len() + report.errors.len();
    let failures = outcome
        .failed
        .iter()
        .map(|f| FailurePreview {
            url: f.identifier.clone(),
            error: f.error.clone(),
        })
        .chain(report.errors.iter().map(|e| FailurePreview {
            url: e.title.clone(),
            error: e.message.clone(),
        }))
        .take(FAILURE_PREVIEW_LIMIT)
        .collect();

    info!(
        source = source_name,
        scraped,
        inserted = report.inserted,
        skipped = report.skipped,
        failed,
        dry_run = request.dry_run,
        "ingest finished"
    );
    Ok(IngestResponse {
        scraped,
        inserted: report.inserted,
        skipped: report.skipped,
        failed,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParsedSong;
    use crate::infrastructure::http_client::FetchError;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const INDEX: &str = "https://www.hymnal.net/en/hymns/category/public-domain";

    struct MockFetcher {
        pages: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl MockFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        existing: Mutex<HashSet<String>>,
        inserted: Mutex<Vec<ParsedSong>>,
    }

    #[async_trait]
    impl SongStore for MemoryStore {
        async fn existing_source_urls(&self) -> anyhow::Result<HashSet<String>> {
            Ok(self.existing.lock().unwrap().clone())
        }

        async fn insert(&self, song: &ParsedSong) -> anyhow::Result<()> {
            self.existing
                .lock()
                .unwrap()
                .insert(song.source_url.clone());
            self.inserted.lock().unwrap().push(song.clone());
            Ok(())
        }
    }

    fn hymn_page(title: &str) -> String {
        format!(
            r#"<html><head><title>{title}</title></head><body>
<h1 class="hymn-title">{title}</h1>
<div class="stanza"><p>Line one<br>Line two</p></div>
</body></html>"#
        )
    }

    fn index_page(hrefs: &[&str]) -> String {
        let links: String = hrefs
            .iter()
            .map(|h| format!(r#"<a href="{h}">hymn</a>"#))
            .collect();
        format!("<html><body>{links}</body></html>")
    }

    fn fast(limit: Option<usize>, dry_run: bool) -> IngestRequest {
        IngestRequest {
            limit,
            dry_run,
            delay_ms: Some(0),
        }
    }

    #[tokio::test]
    async fn unauthorized_caller_causes_no_side_effects() {
        let fetcher = MockFetcher::new(&[]);
        let store = MemoryStore::default();
        let caller = Caller::User {
            roles: vec!["viewer".to_string()],
        };
        let err = run_ingest(&caller, &fetcher, &store, "hymnal_net", &fast(None, false))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Unauthorized));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_role_is_sufficient() {
        let fetcher = MockFetcher::new(&[(
            INDEX,
            &index_page(&["/en/hymn/h/1"]),
        ), (
            "https://www.hymnal.net/en/hymn/h/1",
            &hymn_page("Amazing Grace"),
        )]);
        let store = MemoryStore::default();
        let caller = Caller::User {
            roles: vec!["admin".to_string()],
        };
        let response = run_ingest(&caller, &fetcher, &store, "hymnal_net", &fast(None, false))
            .await
            .unwrap();
        assert_eq!(response.inserted, 1);
    }

    #[tokio::test]
    async fn unknown_source_is_rejected() {
        let fetcher = MockFetcher::new(&[]);
        let store = MemoryStore::default();
        let err = run_ingest(
            &Caller::Service,
            &fetcher,
            &store,
            "no_such_source",
            &fast(None, false),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Scrape(ScrapeError::UnknownSource { .. })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn partial_failure_is_a_successful_response() {
        let fetcher = MockFetcher::new(&[(
            INDEX,
            &index_page(&["/en/hymn/h/1", "/en/hymn/h/2"]),
        ), (
            "https://www.hymnal.net/en/hymn/h/1",
            &hymn_page("Amazing Grace"),
        )]);
        let store = MemoryStore::default();
        let response = run_ingest(
            &Caller::Service,
            &fetcher,
            &store,
            "hymnal_net",
            &fast(None, false),
        )
        .await
        .unwrap();
        assert_eq!(response.scraped, 1);
        assert_eq!(response.inserted, 1);
        assert_eq!(response.failed, 1);
        assert_eq!(response.failures.len(), 1);
        assert!(response.failures[0].url.ends_with("/en/hymn/h/2"));
    }

    #[tokio::test]
    async fn dry_run_reports_without_writing() {
        let fetcher = MockFetcher::new(&[(
            INDEX,
            &index_page(&["/en/hymn/h/1"]),
        ), (
            "https://www.hymnal.net/en/hymn/h/1",
            &hymn_page("Amazing Grace"),
        )]);
        let store = MemoryStore::default();
        let response = run_ingest(
            &Caller::Service,
            &fetcher,
            &store,
            "hymnal_net",
            &fast(None, true),
        )
        .await
        .unwrap();
        assert_eq!(response.scraped, 1);
        assert_eq!(response.inserted, 0);
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn limit_caps_fetched_pages() {
        let fetcher = MockFetcher::new(&[(
            INDEX,
            &index_page(&["/en/hymn/h/1", "/en/hymn/h/2", "/en/hymn/h/3"]),
        ), (
            "https://www.hymnal.net/en/hymn/h/1",
            &hymn_page("First"),
        )]);
        let store = MemoryStore::default();
        let response = run_ingest(
            &Caller::Service,
            &fetcher,
            &store,
            "hymnal_net",
            &fast(Some(1), false),
        )
        .await
        .unwrap();
        assert_eq!(response.scraped, 1);
        // index + one song page
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }
}
