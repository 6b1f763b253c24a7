//! hymnscribe: scrapes public-domain hymn archives into a canonical
//! markdown song library backed by SQLite.
//!
//! The layers mirror the pipeline: `scraping::sources` extract raw songs
//! from archive pages, `scraping::normalize` renders them as canonical
//! markdown (`domain::markdown` owns that format), the orchestrator drives
//! a polite sequential crawl, and the import sink deduplicates against the
//! `source_url` natural key before writing.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod scraping;
