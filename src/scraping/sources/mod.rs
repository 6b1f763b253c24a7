//! Per-source entity extractors for public-domain hymn archives.
//!
//! Each source implements the same contract: enumerate song page URLs from
//! a fixed index page, then extract a [`RawSong`] from one song page.
//! Extraction never fails loudly; malformed or lyric-free pages return
//! `None`, which the orchestrator records as a per-item failure.

mod cyberhymnal;
mod hymnal_net;
mod oldtime_hymns;

pub use cyberhymnal::CyberHymnal;
pub use hymnal_net::HymnalNet;
pub use oldtime_hymns::OldtimeHymns;

use crate::domain::RawSong;

/// Contract for one hymn archive.
///
/// `extract` is a pure function over the page text: no I/O, no panics on
/// malformed input. Index and item URL templates are fixed per source, not
/// caller-configurable.
pub trait SongSource: Send + Sync {
    /// Stable source identifier, used in front-matter and logs.
    fn name(&self) -> &'static str;

    /// The index/listing page enumerating every song on the source.
    fn index_url(&self) -> &'static str;

    /// Extract absolute song page URLs from the index page HTML.
    fn song_urls(&self, index_html: &str) -> Vec<String>;

    /// Extract raw song fields from one song page, or `None` when the page
    /// holds no usable lyric content.
    fn extract(&self, html: &str, source_url: &str) -> Option<RawSong>;
}

/// Look up a registered source by identifier.
pub fn by_name(name: &str) -> Option<Box<dyn SongSource>> {
    match name {
        "hymnal_net" => Some(Box::new(HymnalNet)),
        "cyberhymnal" => Some(Box::new(CyberHymnal)),
        "oldtime_hymns" => Some(Box::new(OldtimeHymns)),
        _ => None,
    }
}

/// Names of every registered source.
pub fn source_names() -> &'static [&'static str] {
    &["hymnal_net", "cyberhymnal", "oldtime_hymns"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_all_names() {
        for name in source_names() {
            let source = by_name(name).expect("registered source");
            assert_eq!(source.name(), *name);
        }
        assert!(by_name("unknown").is_none());
    }
}
