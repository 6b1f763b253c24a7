//! Content normalizer: grouped raw sections from an extractor become the
//! canonical markdown that is the system of record.
//!
//! Label assignment goes through the same [`SectionCounter`] the markdown
//! parser uses, so both directions of the format obey one numbering rule.
//! Output is deterministic: identical input yields byte-identical markdown.

use crate::domain::markdown;
use crate::domain::{
    MetaValue, ParsedSong, RawSection, RawSong, SectionCounter, Song, SongContent, SongSection,
};

/// Convert raw extracted sections into canonical markdown.
///
/// Front-matter carries the title, optional credits, and the source
/// identity (`source`, `source_url`) used downstream for dedup.
pub fn normalize(raw: &RawSong, source: &str, source_url: &str) -> String {
    let mut metadata = Vec::new();
    if let Some(author) = &raw.author {
        metadata.push(("author".to_string(), MetaValue::Text(author.clone())));
    }
    if let Some(composer) = &raw.composer {
        metadata.push(("composer".to_string(), MetaValue::Text(composer.clone())));
    }
    metadata.push(("source".to_string(), MetaValue::Text(source.to_string())));
    metadata.push((
        "source_url".to_string(),
        MetaValue::Text(source_url.to_string()),
    ));

    let mut content = SongContent::default();
    let mut counter = SectionCounter::new();
    for section in merge_marker_sections(&raw.sections) {
        let heading = section.heading.as_deref().unwrap_or("Verse");
        let (section_type, label) = counter.resolve(heading);
        content.push_section(SongSection {
            section_type,
            label,
            lines: section.lines,
        });
    }

    markdown::format(&Song {
        title: raw.title.clone(),
        metadata,
        content,
    })
}

/// Build the import-ready record for a scraped page.
pub fn to_parsed_song(raw: &RawSong, source: &str, source_url: &str) -> ParsedSong {
    ParsedSong {
        title: raw.title.clone(),
        author: raw.author.clone(),
        composer: raw.composer.clone(),
        lyrics: normalize(raw, source, source_url),
        source_url: source_url.to_string(),
        is_public_domain: true,
    }
}

/// A lone heading marker (e.g. "Chorus:" on its own line) followed by an
/// unlabeled block is one section, not an empty heading plus a stray block.
fn merge_marker_sections(sections: &[RawSection]) -> Vec<RawSection> {
    let mut merged: Vec<RawSection> = Vec::new();
    let mut pending_heading: Option<String> = None;

    for section in sections {
        if section.lines.is_empty() {
            // Marker with no content: remember the label for the next block.
            pending_heading = section.heading.clone().or(pending_heading);
            continue;
        }
        let mut section = section.clone();
        if section.heading.is_none() {
            section.heading = pending_heading.take();
        } else {
            pending_heading = None;
        }
        merged.push(section);
    }
    merged
}
