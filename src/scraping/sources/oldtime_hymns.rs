//! Extractor for old hand-built hymn pages: no structural markup at all,
//! lyrics inline in the page body between the heading and the footer
//! boilerplate.
//!
//! This is the brittlest source. Extraction scans flattened body text,
//! locates the lyric region heuristically, splits verses on leading
//! ordinals (arabic or roman), and reclassifies a verbatim-repeated stanza
//! as the chorus because these pages never mark refrains explicitly.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::SongSource;
use crate::domain::{RawSection, RawSong};
use crate::scraping::text::{
    clean_title, html_to_text, is_chorus_marker, is_sentinel_line, verse_ordinal,
};

const INDEX_URL: &str = "https://oldtimehymns.org/hymn-index.html";
const BASE_URL: &str = "https://oldtimehymns.org/";

static SONG_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href$='.html'], a[href$='.htm']").expect("static selector"));
static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["h1", "h2", "title"]
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

static WORDS_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:words|lyrics)\s+by\s+(.{2,60})$").expect("static regex"));
static MUSIC_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:music|tune)\s+by\s+(.{2,60})$").expect("static regex"));
static BARE_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^by\s+(.{2,60})$").expect("static regex"));

pub struct OldtimeHymns;

impl SongSource for OldtimeHymns {
    fn name(&self) -> &'static str {
        "oldtime_hymns"
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
            if href.contains("index") {
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
        debug!("oldtime_hymns index yielded {} song links", urls.len());
        urls
    }

    fn extract(&self, html: &str, source_url: &str) -> Option<RawSong> {
        let document = Html::parse_document(html);

        let title = TITLE_SELECTORS.iter().find_map(|selector| {
            document
                .select(selector)
                .next()
                .map(|el| clean_title(&el.text().collect::<String>()))
                .filter(|t| !t.is_empty())
        })?;

        let body = document.select(&BODY).next()?;
        let text = html_to_text(&body.html());
        let lines: Vec<&str> = text.lines().collect();

        let start = lyric_start(&lines, &title)?;
        let (author, composer) = credits(&lines[..start]);

        let stanzas = collect_stanzas(&lines[start..]);
        if stanzas.is_empty() {
            debug!("no lyric stanzas found at {}", source_url);
            return None;
        }
        let sections = reclassify_repeats(stanzas);

        Some(RawSong {
            title,
            author,
            composer,
            sections,
        })
    }
}

/// Locate where the lyrics begin: the first ordinal-marked line, or failing
/// that the first line after the title heading.
fn lyric_start(lines: &[&str], title: &str) -> Option<usize> {
    if let Some(pos) = lines.iter().position(|line| verse_ordinal(line).is_some()) {
        return Some(pos);
    }
    let title_pos = lines.iter().position(|line| {
        !line.is_empty() && clean_title(line).eq_ignore_ascii_case(title)
    })?;
    // Needs actual content between heading and footer to count as lyrics.
    lines[title_pos + 1..]
        .iter()
        .position(|line| !line.is_empty() && !is_sentinel_line(line))
        .map(|offset| title_pos + 1 + offset)
}

/// Scan the pre-lyric header block for credit lines.
fn credits(lines: &[&str]) -> (Option<String>, Option<String>) {
    let mut author = None;
    let mut composer = None;
    for line in lines {
        let line = line.trim();
        if let Some(caps) = WORDS_BY.captures(line) {
            author.get_or_insert_with(|| caps[1].trim().to_string());
        } else if let Some(caps) = MUSIC_BY.captures(line) {
            composer.get_or_insert_with(|| caps[1].trim().to_string());
        } else if let Some(caps) = BARE_BY.captures(line) {
            author.get_or_insert_with(|| caps[1].trim().to_string());
        }
    }
    (author, composer)
}

/// Group lines into stanzas, stopping at footer boilerplate. Stanzas split
/// on blank lines and on leading verse ordinals; a bare chorus marker line
/// labels the following stanza (rare on these pages but it happens).
fn collect_stanzas(lines: &[&str]) -> Vec<RawSection> {
    let mut sections = Vec::new();
    let mut current = RawSection::default();

    for line in lines {
        let line = line.trim();
        if is_sentinel_line(line) {
            break;
        }
        if line.is_empty() {
            flush(&mut sections, std::mem::take(&mut current));
            continue;
        }
        if let Some((number, rest)) = verse_ordinal(line) {
            flush(&mut sections, std::mem::replace(
                &mut current,
                RawSection::labeled(format!("Verse {number}"), Vec::new()),
            ));
            if !rest.is_empty() {
                current.lines.push(rest);
            }
            continue;
        }
        if is_chorus_marker(line) {
            flush(&mut sections, std::mem::replace(
                &mut current,
                RawSection::labeled("Chorus", Vec::new()),
            ));
            continue;
        }
        current.lines.push(line.to_string());
    }
    flush(&mut sections, current);
    sections
}

fn flush(sections: &mut Vec<RawSection>, section: RawSection) {
    if !section.lines.is_empty() {
        sections.push(section);
    } else if section.heading.is_some() {
        sections.push(section);
    }
}

/// Repeated-content heuristic: a stanza whose text verbatim repeats an
/// earlier stanza is the refrain. The first occurrence is relabeled
/// "Chorus" and the repeats are dropped. A verse repeated for thematic
/// reasons gets misclassified; that ambiguity is accepted behavior.
fn reclassify_repeats(stanzas: Vec<RawSection>) -> Vec<RawSection> {
    let mut kept: Vec<RawSection> = Vec::new();
    for stanza in stanzas {
        let key = stanza.lines.join("\n");
        if let Some(earlier) = kept
            .iter_mut()
            .find(|existing| existing.lines.join("\n") == key)
        {
            earlier.heading = Some("Chorus".to_string());
            continue;
        }
        kept.push(stanza);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><head><title>Sweet By and By - Old Time Hymns</title></head>
<body>
<h1>Sweet By and By</h1>
<p>Words by Sanford F. Bennett</p>
<p>Music by Joseph P. Webster</p>
<p>1. There&rsquo;s a land that is fairer than day<br>
And by faith we can see it afar</p>
<p>In the sweet by and by<br>
We shall meet on that beautiful shore</p>
<p>2. We shall sing on that beautiful shore<br>
The melodious songs of the blest</p>
<p>In the sweet by and by<br>
We shall meet on that beautiful shore</p>
<p>Copyright expired. Back to index</p>
</body></html>"#;

    #[test]
    fn repeated_stanza_becomes_the_chorus() {
        let song = OldtimeHymns
            .extract(PAGE, "https://oldtimehymns.org/sweet-by-and-by.html")
            .unwrap();
        assert_eq!(song.title, "Sweet By and By");
        assert_eq!(song.author.as_deref(), Some("Sanford F. Bennett"));
        assert_eq!(song.composer.as_deref(), Some("Joseph P. Webster"));

        let headings: Vec<Option<&str>> = song
            .sections
            .iter()
            .map(|s| s.heading.as_deref())
            .collect();
        assert_eq!(headings, vec![Some("Verse 1"), Some("Chorus"), Some("Verse 2")]);
        assert_eq!(
            song.sections[1].lines,
            vec![
                "In the sweet by and by",
                "We shall meet on that beautiful shore"
            ]
        );
    }

    #[test]
    fn footer_boilerplate_is_excluded() {
        let song = OldtimeHymns
            .extract(PAGE, "https://oldtimehymns.org/sweet-by-and-by.html")
            .unwrap();
        for section in &song.sections {
            for line in &section.lines {
                assert!(!line.to_lowercase().contains("copyright"));
            }
        }
    }

    #[test]
    fn roman_ordinals_mark_verses() {
        let page = r#"
<html><head><title>Abide With Me</title></head><body>
<h2>Abide With Me</h2>
<p>I. Abide with me, fast falls the eventide<br>
The darkness deepens, Lord with me abide</p>
<p>II. Swift to its close ebbs out life&rsquo;s little day<br>
Earth&rsquo;s joys grow dim, its glories pass away</p>
</body></html>"#;
        let song = OldtimeHymns.extract(page, "https://oldtimehymns.org/abide.html").unwrap();
        assert_eq!(song.sections.len(), 2);
        assert_eq!(song.sections[0].heading.as_deref(), Some("Verse 1"));
        assert_eq!(song.sections[1].heading.as_deref(), Some("Verse 2"));
    }

    #[test]
    fn page_without_lyric_region_yields_none() {
        let page = r#"
<html><head><title>Hymn Index - Old Time Hymns</title></head><body>
<h1>Choose a hymn</h1>
<p>Copyright 2003. Back to index</p>
</body></html>"#;
        assert!(OldtimeHymns.extract(page, "https://oldtimehymns.org/").is_none());
    }
}
