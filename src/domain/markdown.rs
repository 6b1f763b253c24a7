//! Canonical song markdown: front-matter plus `#`-headed lyric sections.
//!
//! This format is the system of record for lyric content. `parse` and
//! `format` are exact inverses: `parse(&format(song)) == song` for any song
//! produced by `parse`. The section auto-numbering rule lives here so the
//! scrape normalizer and the editing surfaces agree on labels.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::song::{MetaValue, SectionType, Song, SongContent, SongSection};

/// The single user-facing validation failure for song documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SongParseError {
    #[error("song front-matter is missing required field 'title'")]
    MissingTitle,
}

/// Heading with an explicit trailing number, e.g. "Verse 2" or "V2".
static TRAILING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<word>.*?)\s*(?P<num>\d+)$").expect("static regex"));

/// Assigns section labels according to the auto-numbering rule.
///
/// Bare type keywords receive the next unused integer per type (starting at
/// 1, counted independently per type). Explicit numbers are preserved and
/// advance that type's baseline. Freeform headings pass through unchanged
/// with the default `Verse` type and no numbering.
#[derive(Debug, Default)]
pub struct SectionCounter {
    counts: HashMap<SectionType, u32>,
}

impl SectionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a raw heading into a section type and display label.
    pub fn resolve(&mut self, heading: &str) -> (SectionType, String) {
        let trimmed = heading.trim().trim_end_matches(':').trim_end();
        let (word, number) = match TRAILING_NUMBER.captures(trimmed) {
            Some(caps) => {
                let num = caps["num"].parse::<u32>().ok();
                (caps["word"].trim_end().to_string(), num)
            }
            None => (trimmed.to_string(), None),
        };

        match SectionType::from_keyword(&word.to_lowercase()) {
            Some(section_type) => {
                let label = if let Some(n) = number {
                    let count = self.counts.entry(section_type).or_insert(0);
                    *count = (*count).max(n);
                    format!("{} {}", section_type.display_name(), n)
                } else if section_type.takes_number() {
                    let count = self.counts.entry(section_type).or_insert(0);
                    *count += 1;
                    format!("{} {}", section_type.display_name(), count)
                } else {
                    section_type.display_name().to_string()
                };
                (section_type, label)
            }
            // Freeform heading: keep it verbatim, fall back to verse.
            None => (SectionType::Verse, trimmed.to_string()),
        }
    }
}

/// Parse canonical markdown into a [`Song`].
///
/// Front-matter is every `key: value` line before the first blank line;
/// `title` is required. After that, a line starting with `#` opens a new
/// section and all following non-blank lines belong to it; consecutive
/// blank lines are insignificant and never terminate a section early.
pub fn parse(markdown: &str) -> Result<Song, SongParseError> {
    let mut lines = markdown.lines().peekable();

    // Skip leading blank lines before the front-matter block.
    while matches!(lines.peek(), Some(l) if l.trim().is_empty()) {
        lines.next();
    }

    let mut title: Option<String> = None;
    let mut metadata: Vec<(String, MetaValue)> = Vec::new();

    while let Some(peeked) = lines.peek() {
        let line = peeked.trim_end();
        if line.starts_with('#') {
            break;
        }
        if line.trim().is_empty() {
            lines.next();
            break;
        }
        let line = line.to_string();
        lines.next();
        let Some((key, value)) = line.split_once(':') else {
            // Not key/value shaped; front-matter is lenient about stray lines.
            continue;
        };
        let key = key.trim().to_string();
        let value = value.trim();
        if key == "title" {
            if !value.is_empty() {
                title = Some(value.to_string());
            }
        } else {
            metadata.push((key, coerce_value(value)));
        }
    }

    let title = title.ok_or(SongParseError::MissingTitle)?;

    let mut content = SongContent::default();
    let mut counter = SectionCounter::new();
    let mut current: Option<SongSection> = None;

    for line in lines {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if let Some(heading) = line.strip_prefix('#') {
            if let Some(section) = current.take() {
                content.push_section(section);
            }
            let heading = heading.trim_start_matches('#');
            let (section_type, label) = counter.resolve(heading);
            current = Some(SongSection {
                section_type,
                label,
                lines: Vec::new(),
            });
        } else {
            // Content before any heading opens an implicit verse.
            let section = current.get_or_insert_with(|| {
                let (section_type, label) = counter.resolve("Verse");
                SongSection {
                    section_type,
                    label,
                    lines: Vec::new(),
                }
            });
            section.lines.push(line.trim().to_string());
        }
    }
    if let Some(section) = current.take() {
        content.push_section(section);
    }

    Ok(Song {
        title,
        metadata,
        content,
    })
}

/// Serialize a [`Song`] back to canonical markdown.
///
/// Byte-deterministic: the same song always yields the same string.
pub fn format(song: &Song) -> String {
    let mut out = String::new();
    out.push_str("title: ");
    out.push_str(&song.title);
    out.push('\n');
    for (key, value) in &song.metadata {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&format_value(value));
        out.push('\n');
    }
    for section in &song.content.sections {
        out.push('\n');
        out.push_str("# ");
        out.push_str(&section.label);
        out.push('\n');
        for line in &section.lines {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Coerce a front-matter value: numbers and `[a, b]` lists, else text.
fn coerce_value(value: &str) -> MetaValue {
    if let Some(inner) = value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        let items = inner
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        return MetaValue::List(items);
    }
    if let Ok(number) = value.parse::<f64>() {
        if number.is_finite() {
            return MetaValue::Number(number);
        }
    }
    MetaValue::Text(value.to_string())
}

fn format_value(value: &MetaValue) -> String {
    match value {
        MetaValue::Text(text) => text.clone(),
        MetaValue::Number(number) => {
            if number.fract() == 0.0 && number.abs() < 1e15 {
                format!("{}", *number as i64)
            } else {
                format!("{number}")
            }
        }
        MetaValue::List(items) => format!("[{}]", items.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn labels(song: &Song) -> Vec<&str> {
        song.content
            .sections
            .iter()
            .map(|s| s.label.as_str())
            .collect()
    }

    #[test]
    fn minimal_document_is_just_a_title() {
        let song = parse("title: Test Song\n").unwrap();
        assert_eq!(song.title, "Test Song");
        assert!(song.metadata.is_empty());
        assert!(song.content.is_empty());
    }

    #[test]
    fn missing_title_fails() {
        let err = parse("author: John Newton\n\n# Verse\nAmazing grace\n").unwrap_err();
        assert_eq!(err, SongParseError::MissingTitle);
    }

    #[test]
    fn bare_verses_are_numbered_sequentially() {
        let song = parse(
            "title: T\n\n# Verse\na\n\n# Verse\nb\n\n# Verse\nc\n",
        )
        .unwrap();
        assert_eq!(labels(&song), vec!["Verse 1", "Verse 2", "Verse 3"]);
    }

    #[test]
    fn explicit_numbers_are_preserved_and_advance_the_counter() {
        let song = parse(
            "title: T\n\n# Verse 1\na\n\n# Chorus\nb\n\n# Verse 2\nc\n\n# Verse\nd\n",
        )
        .unwrap();
        assert_eq!(
            labels(&song),
            vec!["Verse 1", "Chorus 1", "Verse 2", "Verse 3"]
        );
    }

    #[test]
    fn freeform_headings_pass_through_unnumbered() {
        let song = parse(
            "title: T\n\n# Intro\na\n\n# Verse\nb\n\n# Turnaround\nc\n\n# Outro\nd\n",
        )
        .unwrap();
        assert_eq!(labels(&song), vec!["Intro", "Verse 1", "Turnaround", "Outro"]);
        assert_eq!(song.content.sections[0].section_type, SectionType::Intro);
        // Freeform headings fall back to the default type.
        assert_eq!(song.content.sections[2].section_type, SectionType::Verse);
    }

    #[rstest]
    #[case("# V2\nx\n", "Verse 2")]
    #[case("# chorus:\nx\n", "Chorus 1")]
    #[case("# PC\nx\n", "Pre-Chorus 1")]
    #[case("# Bridge 3\nx\n", "Bridge 3")]
    fn abbreviated_headings_are_canonicalized(#[case] body: &str, #[case] expected: &str) {
        let song = parse(&format!("title: T\n\n{body}")).unwrap();
        assert_eq!(labels(&song), vec![expected]);
    }

    #[test]
    fn blank_lines_between_sections_are_insignificant() {
        let song = parse(
            "title: T\n\n\n# Verse\nline one\nline two\n\n\n\n# Chorus\nline three\n\n",
        )
        .unwrap();
        assert_eq!(song.content.sections.len(), 2);
        assert_eq!(song.content.sections[0].lines, vec!["line one", "line two"]);
        assert_eq!(song.content.sections[1].lines, vec!["line three"]);
    }

    #[test]
    fn numeric_and_list_metadata_are_coerced() {
        let song = parse(
            "title: T\nccli: 1234\ntempo: 72.5\nkey: G\ntags: [hymn, communion]\n",
        )
        .unwrap();
        assert_eq!(song.meta("ccli"), Some(&MetaValue::Number(1234.0)));
        assert_eq!(song.meta("tempo"), Some(&MetaValue::Number(72.5)));
        assert_eq!(song.meta("key"), Some(&MetaValue::Text("G".to_string())));
        assert_eq!(
            song.meta("tags"),
            Some(&MetaValue::List(vec![
                "hymn".to_string(),
                "communion".to_string()
            ]))
        );
    }

    #[test]
    fn unknown_metadata_passes_through() {
        let input = "title: T\nsource: hymnal_net\nsource_url: https://x/1\n";
        let song = parse(input).unwrap();
        assert_eq!(
            song.meta("source"),
            Some(&MetaValue::Text("hymnal_net".to_string()))
        );
        assert_eq!(format(&song), input);
    }

    #[test]
    fn round_trip_is_lossless() {
        let input = concat!(
            "title: Amazing Grace\n",
            "author: John Newton\n",
            "ccli: 22025\n",
            "tags: [hymn, grace]\n",
            "\n",
            "# Verse 1\n",
            "Amazing grace how sweet the sound\n",
            "That saved a wretch like me\n",
            "\n",
            "# Chorus 1\n",
            "Praise God praise God\n",
            "\n",
            "# Turnaround\n",
            "instrumental\n",
        );
        let song = parse(input).unwrap();
        let emitted = format(&song);
        assert_eq!(emitted, input);
        assert_eq!(parse(&emitted).unwrap(), song);
    }

    #[test]
    fn content_before_a_heading_opens_an_implicit_verse() {
        let song = parse("title: T\n\nstray line\n\n# Chorus\nx\n").unwrap();
        assert_eq!(labels(&song), vec!["Verse 1", "Chorus 1"]);
        assert_eq!(song.content.sections[0].lines, vec!["stray line"]);
    }
}
