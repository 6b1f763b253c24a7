//! Scrape pipeline error taxonomy.
//!
//! Only the index fetch is fatal for a run; every per-item failure is
//! recorded and the run continues.

use thiserror::Error;

use crate::infrastructure::http_client::FetchError;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("failed to fetch index page {url}: {source}")]
    IndexFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to fetch song page {url}: {source}")]
    ItemFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("no parseable lyric content at {url}")]
    NoLyricContent { url: String },

    #[error("unknown source '{name}'")]
    UnknownSource { name: String },
}

impl ScrapeError {
    pub fn index_fetch(url: &str, source: FetchError) -> Self {
        Self::IndexFetch {
            url: url.to_string(),
            source,
        }
    }

    pub fn item_fetch(url: &str, source: FetchError) -> Self {
        Self::ItemFetch {
            url: url.to_string(),
            source,
        }
    }

    pub fn no_lyric_content(url: &str) -> Self {
        Self::NoLyricContent {
            url: url.to_string(),
        }
    }

    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::IndexFetch { .. } | Self::UnknownSource { .. } => true,
            Self::ItemFetch { .. } | Self::NoLyricContent { .. } => false,
        }
    }
}

/// One recorded per-item failure from a scrape run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScrapeFailure {
    /// Item identifier, normally the song page URL.
    pub identifier: String,
    pub error: String,
}
