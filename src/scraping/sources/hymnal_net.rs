//! Extractor for hymnal.net style pages: structured stanza containers with
//! author/composer credits in dedicated elements.
//!
//! The most structured of the three sources. Extraction still runs an
//! ordered fallback chain per field because older pages on the site predate
//! the current markup.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::SongSource;
use crate::domain::{RawSection, RawSong};
use crate::scraping::text::{clean_title, decode_entities, html_to_lines, is_chorus_marker, verse_ordinal};

const INDEX_URL: &str = "https://www.hymnal.net/en/hymns/category/public-domain";
const BASE_URL: &str = "https://www.hymnal.net";

static SONG_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='/hymn/']").expect("static selector"));

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["h1.hymn-title", "div.song-title h1", "h1", "title"]
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

static AUTHOR_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["div.hymn-author", "span.author", "td.lyricist"]
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

static COMPOSER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["div.hymn-composer", "span.composer", "td.musician"]
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

static LYRIC_CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["div.lyrics", "div.hymn-text", "div#lyrics"]
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

static STANZA: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.stanza, div.verse, div.chorus").expect("static selector"));
static STANZA_LABEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3, .stanza-num, .label").expect("static selector"));
static PRE_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("pre").expect("static selector"));

static AUTHOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:words|lyrics|author)\s*(?:by)?\s*[:\u{2014}]\s*([A-Z][^<\n;|]{2,60})")
        .expect("static regex")
});
static COMPOSER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:music|composer|tune)\s*(?:by)?\s*[:\u{2014}]\s*([A-Z][^<\n;|]{2,60})")
        .expect("static regex")
});

pub struct HymnalNet;

impl SongSource for HymnalNet {
    fn name(&self) -> &'static str {
        "hymnal_net"
    }

    fn index_url(&self) -> &'static str {
        INDEX_URL
    }

    fn song_urls(&self, index_html: &str) -> Vec<String> {
        let document = Html::parse_document(index_html);
        let base = Url::parse(BASE_URL).expect("static base url");
        let mut urls = Vec::new();
        for link in document.select(&SONG_LINK) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Ok(absolute) = base.join(href) else {
                continue;
            };
            let absolute = absolute.to_string();
            if !urls.contains(&absolute) {
                urls.push(absolute);
            }
        }
        debug!("hymnal_net index yielded {} song links", urls.len());
        urls
    }

    fn extract(&self, html: &str, source_url: &str) -> Option<RawSong> {
        let document = Html::parse_document(html);

        let title = first_text(&document, &TITLE_SELECTORS).map(|t| clean_title(&t))?;
        if title.is_empty() {
            return None;
        }

        let author = first_text(&document, &AUTHOR_SELECTORS)
            .or_else(|| pattern_capture(&AUTHOR_PATTERN, html));
        let composer = first_text(&document, &COMPOSER_SELECTORS)
            .or_else(|| pattern_capture(&COMPOSER_PATTERN, html));

        let sections = extract_stanzas(&document)
            .or_else(|| extract_from_container(&document))
            .or_else(|| extract_from_pre(&document))?;
        if sections.iter().all(|s| s.lines.is_empty()) {
            debug!("no lyric lines extracted from {}", source_url);
            return None;
        }

        Some(RawSong {
            title,
            author,
            composer,
            sections,
        })
    }
}

/// First non-empty text across the fallback selector chain.
fn first_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    for selector in selectors {
        if let Some(element) = document.select(selector).next() {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn pattern_capture(pattern: &Regex, html: &str) -> Option<String> {
    pattern
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|s| !s.is_empty())
}

/// Preferred strategy: one container div per stanza, optionally labeled.
fn extract_stanzas(document: &Html) -> Option<Vec<RawSection>> {
    let mut sections = Vec::new();
    for stanza in document.select(&STANZA) {
        let heading = stanza
            .select(&STANZA_LABEL)
            .next()
            .map(|label| label.text().collect::<String>().trim().to_string())
            .filter(|label| !label.is_empty())
            .or_else(|| {
                stanza
                    .value()
                    .has_class("chorus", scraper::CaseSensitivity::AsciiCaseInsensitive)
                    .then(|| "Chorus".to_string())
            });
        let label_text = heading.clone().unwrap_or_default();
        let lines: Vec<String> = html_to_lines(&stanza.inner_html())
            .into_iter()
            .filter(|line| line != &label_text)
            .collect();
        if !lines.is_empty() {
            sections.push(RawSection { heading, lines });
        }
    }
    (!sections.is_empty()).then_some(sections)
}

/// Fallback: a single lyric container, segmented by ordinal/chorus markers.
fn extract_from_container(document: &Html) -> Option<Vec<RawSection>> {
    for selector in LYRIC_CONTAINERS.iter() {
        if let Some(container) = document.select(selector).next() {
            let lines = html_to_lines(&container.inner_html());
            let sections = segment_marked_lines(&lines);
            if !sections.is_empty() {
                return Some(sections);
            }
        }
    }
    None
}

/// Last resort: a generic `<pre>` block.
fn extract_from_pre(document: &Html) -> Option<Vec<RawSection>> {
    let pre = document.select(&PRE_BLOCK).next()?;
    let text = pre.text().collect::<String>();
    let lines: Vec<String> = decode_entities(&text)
        .lines()
        .map(str::trim)
        .map(String::from)
        .collect();
    let sections = segment_blank_separated(&lines);
    (!sections.is_empty()).then_some(sections)
}

/// Split a flat line run on verse ordinals and chorus markers.
fn segment_marked_lines(lines: &[String]) -> Vec<RawSection> {
    let mut sections = Vec::new();
    let mut current = RawSection::unlabeled(Vec::new());
    for line in lines {
        if let Some((number, rest)) = verse_ordinal(line) {
            push_section(&mut sections, std::mem::replace(
                &mut current,
                RawSection::labeled(format!("Verse {number}"), Vec::new()),
            ));
            if !rest.is_empty() {
                current.lines.push(rest);
            }
        } else if is_chorus_marker(line) {
            push_section(&mut sections, std::mem::replace(
                &mut current,
                RawSection::labeled("Chorus", Vec::new()),
            ));
        } else {
            current.lines.push(line.clone());
        }
    }
    push_section(&mut sections, current);
    sections
}

/// Split blank-line-separated stanzas, honoring chorus markers.
fn segment_blank_separated(lines: &[String]) -> Vec<RawSection> {
    let mut sections = Vec::new();
    let mut current = RawSection::unlabeled(Vec::new());
    for line in lines {
        if line.is_empty() {
            push_section(&mut sections, std::mem::take(&mut current));
        } else if is_chorus_marker(line) {
            push_section(&mut sections, std::mem::replace(
                &mut current,
                RawSection::labeled("Chorus", Vec::new()),
            ));
        } else if let Some((number, rest)) = verse_ordinal(line) {
            push_section(&mut sections, std::mem::replace(
                &mut current,
                RawSection::labeled(format!("Verse {number}"), Vec::new()),
            ));
            if !rest.is_empty() {
                current.lines.push(rest);
            }
        } else {
            current.lines.push(line.clone());
        }
    }
    push_section(&mut sections, current);
    sections
}

fn push_section(sections: &mut Vec<RawSection>, section: RawSection) {
    // Keep labeled-but-empty markers; the normalizer merges them forward.
    if !section.lines.is_empty() || section.heading.is_some() {
        sections.push(section);
    }
}
