//! The scrape pipeline: per-source extraction, normalization to canonical
//! markdown, orchestration, and the dedup-aware import sink.

pub mod error;
pub mod import;
pub mod normalize;
pub mod orchestrator;
pub mod sources;
pub mod text;

pub use error::{ScrapeError, ScrapeFailure};
pub use import::{ImportReport, ImportSink, SongStore};
pub use orchestrator::{PageFetcher, ScrapeOptions, ScrapeOrchestrator, ScrapeOutcome};
pub use sources::SongSource;
