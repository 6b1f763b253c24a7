//! Domain module - song content model and canonical markdown
//!
//! This module contains the song entities shared by the scrape pipeline and
//! the editing surfaces, plus the canonical markdown codec.

pub mod markdown;
pub mod song;

// Re-export commonly used items
pub use markdown::{SectionCounter, SongParseError};
pub use song::{
    MetaValue, ParsedSong, RawSection, RawSong, SectionType, Song, SongContent, SongSection,
};
