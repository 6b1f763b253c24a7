//! Extractor for CyberHymnal/NetHymnal style pages: lyrics in a `<pre>`
//! block, stanzas separated by blank lines, refrains flagged with a
//! "Refrain:" marker line, credits in "Words:"/"Music:" paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::SongSource;
use crate::domain::{RawSection, RawSong};
use crate::scraping::text::{clean_title, decode_entities, is_chorus_marker};

const INDEX_URL: &str = "https://www.hymntime.com/tch/htm/titles.htm";
const BASE_URL: &str = "https://www.hymntime.com/tch/htm/";

static SONG_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href$='.htm']").expect("static selector"));
static PRE_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("pre").expect("static selector"));
static LYRIC_DIV: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.lyrics, td.lyrics").expect("static selector"));
static PAGE_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("static selector"));
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2").expect("static selector"));

static WORDS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bwords\s*:\s*([^<\n]{2,80})").expect("static regex")
});
static MUSIC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bmusic\s*:\s*([^<\n]{2,80})").expect("static regex")
});

/// A stanza that only points back at an earlier refrain, e.g. "Refrain".
static REFRAIN_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\[?(?:chorus|refrain)\]?\.?$").expect("static regex"));

pub struct CyberHymnal;

impl SongSource for CyberHymnal {
    fn name(&self) -> &'static str {
        "cyberhymnal"
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
            // The index links back to itself and to letter sub-indexes.
            if href.contains("titles") || href.starts_with('#') {
                continue;
            }
            let Ok(absolute) = base.join(href) else {
                continue;
            };
            let absolute = absolute.to_string();
            if !urls.contains(&absolute) {
                urls.push(absolute);
            }
        }
        debug!("cyberhymnal index yielded {} song links", urls.len());
        urls
    }

    fn extract(&self, html: &str, source_url: &str) -> Option<RawSong> {
        let document = Html::parse_document(html);

        let title = extract_title(&document)?;
        let author = credit(&WORDS_PATTERN, html);
        let composer = credit(&MUSIC_PATTERN, html);

        let lyric_text = extract_lyric_text(&document)?;
        let sections = segment_stanzas(&lyric_text);
        if sections.is_empty() {
            debug!("no stanzas found at {}", source_url);
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

/// Capture a "Words:"/"Music:" credit, trimming the sentence period.
fn credit(pattern: &Regex, html: &str) -> Option<String> {
    pattern
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            decode_entities(m.as_str())
                .trim()
                .trim_end_matches('.')
                .to_string()
        })
        .filter(|s| !s.is_empty())
}

/// Page `<title>` first (stripped of the site suffix), then `h1`/`h2`.
fn extract_title(document: &Html) -> Option<String> {
    let candidates = document
        .select(&PAGE_TITLE)
        .chain(document.select(&HEADING));
    for element in candidates {
        let title = clean_title(&element.text().collect::<String>());
        if !title.is_empty() {
            return Some(title);
        }
    }
    None
}

/// Lyrics live in the first `<pre>`; some rebuilt pages use a lyrics div.
fn extract_lyric_text(document: &Html) -> Option<String> {
    if let Some(pre) = document.select(&PRE_BLOCK).next() {
        let text = pre.text().collect::<String>();
        if !text.trim().is_empty() {
            return Some(decode_entities(&text));
        }
    }
    if let Some(div) = document.select(&LYRIC_DIV).next() {
        let text = div.text().collect::<String>();
        if !text.trim().is_empty() {
            return Some(decode_entities(&text));
        }
    }
    None
}

/// Stanzas are blank-line separated. A stanza opening with a refrain marker
/// becomes the chorus; a stanza that is nothing but the marker is a
/// reference back to an earlier refrain and is skipped.
fn segment_stanzas(text: &str) -> Vec<RawSection> {
    let mut sections = Vec::new();
    let mut current: Option<RawSection> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            if let Some(section) = current.take() {
                push_stanza(&mut sections, section);
            }
            continue;
        }
        if is_chorus_marker(line) {
            if let Some(section) = current.take() {
                push_stanza(&mut sections, section);
            }
            current = Some(RawSection::labeled("Chorus", Vec::new()));
            continue;
        }
        current
            .get_or_insert_with(RawSection::default)
            .lines
            .push(line.to_string());
    }
    if let Some(section) = current.take() {
        push_stanza(&mut sections, section);
    }
    sections
}

fn push_stanza(sections: &mut Vec<RawSection>, section: RawSection) {
    // A refrain definition carries its lines in the same stanza as the
    // marker, so a labeled stanza with no lines is a back-reference. So is
    // a stanza that is nothing but a bracketed marker line.
    if section.lines.is_empty() {
        return;
    }
    if section.lines.len() == 1 && REFRAIN_REFERENCE.is_match(&section.lines[0]) {
        return;
    }
    sections.push(section);
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><head><title>O For a Thousand Tongues to Sing | The Cyber Hymnal</title></head>
<body>
<p>Words: Charles Wesley, 1739.</p>
<p>Music: Carl G. Gl&auml;ser, 1828.</p>
<pre>O for a thousand tongues to sing
My great Redeemer&rsquo;s praise

Refrain:
Praise the Lord, praise the Lord
Let the earth hear His voice

My gracious Master and my God
Assist me to proclaim

Refrain</pre>
</body></html>"#;

    #[test]
    fn extracts_pre_block_with_refrain() {
        let song = CyberHymnal
            .extract(PAGE, "https://www.hymntime.com/tch/htm/o/f/t/oft1000.htm")
            .unwrap();
        assert_eq!(song.title, "O For a Thousand Tongues to Sing");
        assert_eq!(song.author.as_deref(), Some("Charles Wesley, 1739"));
        assert_eq!(song.composer.as_deref(), Some("Carl G. Gl\u{00E4}ser, 1828"));

        assert_eq!(song.sections.len(), 3);
        assert_eq!(song.sections[0].heading, None);
        assert_eq!(
            song.sections[0].lines[1],
            "My great Redeemer\u{2019}s praise"
        );
        assert_eq!(song.sections[1].heading.as_deref(), Some("Chorus"));
        assert_eq!(song.sections[1].lines.len(), 2);
        // Trailing "Refrain" reference stanza is dropped.
        assert_eq!(song.sections[2].heading, None);
        assert_eq!(song.sections[2].lines[0], "My gracious Master and my God");
    }

    #[test]
    fn missing_pre_and_div_yields_none() {
        let page = "<html><head><title>Index | The Cyber Hymnal</title></head><body><p>pick a hymn</p></body></html>";
        assert!(CyberHymnal.extract(page, "https://x").is_none());
    }

    #[test]
    fn index_skips_self_links() {
        let index = r##"
<html><body>
<a href="titles.htm">All titles</a>
<a href="a/m/azinggr.htm">Amazing Grace</a>
<a href="#top">Top</a>
<a href="o/f/t/oft1000.htm">O For a Thousand Tongues</a>
</body></html>"##;
        let urls = CyberHymnal.song_urls(index);
        assert_eq!(
            urls,
            vec![
                "https://www.hymntime.com/tch/htm/a/m/azinggr.htm",
                "https://www.hymntime.com/tch/htm/o/f/t/oft1000.htm"
            ]
        );
    }
}
