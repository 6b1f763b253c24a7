//! Core song domain types shared by the scrape pipeline and editing surfaces.

use serde::{Deserialize, Serialize};

/// Kind of lyrical unit within a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionType {
    Verse,
    Chorus,
    Bridge,
    PreChorus,
    Tag,
    Intro,
    Outro,
}

impl SectionType {
    /// Canonical display name used when auto-generating labels.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Verse => "Verse",
            Self::Chorus => "Chorus",
            Self::Bridge => "Bridge",
            Self::PreChorus => "Pre-Chorus",
            Self::Tag => "Tag",
            Self::Intro => "Intro",
            Self::Outro => "Outro",
        }
    }

    /// Resolve a heading keyword (already lowercased and trimmed) to a type.
    ///
    /// Only the exact keyword or its abbreviation matches; anything else is a
    /// freeform heading and resolves to `None`.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "verse" | "v" => Some(Self::Verse),
            "chorus" | "c" => Some(Self::Chorus),
            "bridge" | "b" => Some(Self::Bridge),
            "pre-chorus" | "pre chorus" | "prechorus" | "pc" => Some(Self::PreChorus),
            "tag" | "t" => Some(Self::Tag),
            "intro" | "i" => Some(Self::Intro),
            "outro" | "o" => Some(Self::Outro),
            _ => None,
        }
    }

    /// Whether bare headings of this type receive a sequential number.
    ///
    /// Intro and outro are structural one-offs and keep their bare label.
    pub fn takes_number(self) -> bool {
        !matches!(self, Self::Intro | Self::Outro)
    }
}

impl Default for SectionType {
    fn default() -> Self {
        Self::Verse
    }
}

/// One labeled block of lyric lines.
///
/// `lines` never contains blank entries; blank lines are separators in the
/// canonical format, not content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongSection {
    pub section_type: SectionType,
    pub label: String,
    pub lines: Vec<String>,
}

/// Ordered sections of a song, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongContent {
    pub sections: Vec<SongSection>,
}

impl SongContent {
    /// Append a section, dropping it silently when it has no lines.
    pub fn push_section(&mut self, section: SongSection) {
        if !section.lines.is_empty() {
            self.sections.push(section);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Front-matter value attached to a parsed song document.
///
/// Numeric-looking values (`ccli`, `tempo`) are coerced to numbers and
/// `[a, b]` syntax to ordered string lists; everything else stays text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

/// A parsed song document: required title, passthrough metadata in source
/// order, and the section content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub metadata: Vec<(String, MetaValue)>,
    pub content: SongContent,
}

impl Song {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            metadata: Vec::new(),
            content: SongContent::default(),
        }
    }

    pub fn meta(&self, key: &str) -> Option<&MetaValue> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Raw extraction output from a single source page, before normalization.
///
/// Sections here carry whatever heading text the source exposed (or none);
/// auto-numbering and canonical labels are the normalizer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSong {
    pub title: String,
    pub author: Option<String>,
    pub composer: Option<String>,
    pub sections: Vec<RawSection>,
}

/// One grouped block of raw lyric lines with an optional source heading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSection {
    pub heading: Option<String>,
    pub lines: Vec<String>,
}

impl RawSection {
    pub fn unlabeled(lines: Vec<String>) -> Self {
        Self {
            heading: None,
            lines,
        }
    }

    pub fn labeled(heading: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            heading: Some(heading.into()),
            lines,
        }
    }
}

/// Fully normalized scrape output, ready for the import sink.
///
/// `source_url` is the natural key used for dedup across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSong {
    pub title: String,
    pub author: Option<String>,
    pub composer: Option<String>,
    /// Canonical markdown (front-matter + sections), the system of record.
    pub lyrics: String,
    pub source_url: String,
    pub is_public_domain: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_resolution_matches_abbreviations() {
        assert_eq!(SectionType::from_keyword("verse"), Some(SectionType::Verse));
        assert_eq!(SectionType::from_keyword("v"), Some(SectionType::Verse));
        assert_eq!(SectionType::from_keyword("pc"), Some(SectionType::PreChorus));
        assert_eq!(
            SectionType::from_keyword("pre chorus"),
            Some(SectionType::PreChorus)
        );
        // "t" is tag, but longer words starting with t never match
        assert_eq!(SectionType::from_keyword("t"), Some(SectionType::Tag));
        assert_eq!(SectionType::from_keyword("turnaround"), None);
        assert_eq!(SectionType::from_keyword("refrain"), None);
    }

    #[test]
    fn intro_and_outro_are_unnumbered() {
        assert!(!SectionType::Intro.takes_number());
        assert!(!SectionType::Outro.takes_number());
        assert!(SectionType::Verse.takes_number());
        assert!(SectionType::Chorus.takes_number());
    }

    #[test]
    fn empty_sections_are_dropped() {
        let mut content = SongContent::default();
        content.push_section(SongSection {
            section_type: SectionType::Verse,
            label: "Verse 1".to_string(),
            lines: vec![],
        });
        assert!(content.is_empty());
    }
}
