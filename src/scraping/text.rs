//! Text utilities shared by the source extractors: HTML entity decoding,
//! tag stripping, title cleanup, and verse-ordinal recognition.

use once_cell::sync::Lazy;
use regex::Regex;

/// Named entities seen in the wild on hymn archive pages. Numeric and hex
/// character references are handled separately.
fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "hellip" => "\u{2026}",
        "eacute" => "\u{00E9}",
        "egrave" => "\u{00E8}",
        "agrave" => "\u{00E0}",
        "ouml" => "\u{00F6}",
        "uuml" => "\u{00FC}",
        "auml" => "\u{00E4}",
        "copy" => "\u{00A9}",
        "middot" => "\u{00B7}",
        _ => return None,
    })
}

/// Decode named, decimal (`&#8217;`) and hex (`&#x2019;`) entity references.
///
/// Unknown references are left verbatim so malformed markup never loses text.
pub fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        // An entity is '&' .. ';' within a short window.
        let candidate = match rest[1..].find(';') {
            Some(end) if end <= 10 => &rest[1..=end],
            _ => {
                out.push('&');
                rest = &rest[1..];
                continue;
            }
        };
        let decoded = if let Some(digits) = candidate
            .strip_prefix("#x")
            .or_else(|| candidate.strip_prefix("#X"))
        {
            u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
        } else if let Some(digits) = candidate.strip_prefix('#') {
            digits.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            named_entity(candidate).and_then(|s| s.chars().next())
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[candidate.len() + 2..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

static BREAK_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*(?:br|/p|/div|/h[1-6]|/tr)\s*/?\s*>").expect("static regex"));
static PARA_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/(?:p|div|h[1-6]|blockquote|table)\s*>").expect("static regex")
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));

/// Flatten an HTML fragment to plain text lines: line-breaking tags become
/// newlines, every other tag is removed, entities are decoded.
///
/// Literal newlines in the source are ordinary HTML whitespace, so they are
/// flattened to spaces before the tag pass; only tags produce line breaks.
pub fn html_to_lines(fragment: &str) -> Vec<String> {
    let flat = fragment.replace(['\r', '\n'], " ");
    let with_breaks = BREAK_TAGS.replace_all(&flat, "\n");
    let stripped = ANY_TAG.replace_all(&with_breaks, "");
    decode_entities(&stripped)
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Like [`html_to_lines`] but keeps blank lines, so block boundaries
/// survive as stanza separators. Closing block tags become paragraph
/// breaks; interior whitespace is collapsed per line.
pub fn html_to_text(fragment: &str) -> String {
    let flat = fragment.replace(['\r', '\n'], " ");
    let with_paras = PARA_BREAKS.replace_all(&flat, "\n\n");
    let with_breaks = BREAK_TAGS.replace_all(&with_paras, "\n");
    let stripped = ANY_TAG.replace_all(&with_breaks, "");
    decode_entities(&stripped)
        .lines()
        .map(collapse_whitespace)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Site-name suffixes tacked onto page titles, applied in order.
static TITLE_SUFFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // "Amazing Grace | NetHymnal"
        Regex::new(r"\s*\|.*$").expect("static regex"),
        // "Amazing Grace - Hymnary.org", "Rock of Ages — Free Hymn Lyrics"
        Regex::new(r"(?i)\s+[-\u{2013}\u{2014}]\s+[^-\u{2013}\u{2014}]*(?:hymn|lyrics|\.com|\.org|\.net)[^-\u{2013}\u{2014}]*$")
            .expect("static regex"),
        // Trailing "(MIDI)" style annotations
        Regex::new(r"(?i)\s*\((?:midi|sheet music|score)\)\s*$").expect("static regex"),
    ]
});

/// Strip site-name suffixes and surrounding quotes from an extracted title.
pub fn clean_title(raw: &str) -> String {
    let mut title = collapse_whitespace(raw);
    for pattern in TITLE_SUFFIXES.iter() {
        title = pattern.replace(&title, "").to_string();
    }
    title
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}'))
        .trim()
        .to_string()
}

static ARABIC_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[.)]\s*(.*)$").expect("static regex"));
static ROMAN_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([IVXL]{1,7})[.)]\s+(.*)$").expect("static regex"));
static LABELED_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^verse\s+(\d{1,2})[.:]?\s*(.*)$").expect("static regex"));
static CHORUS_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:chorus|refrain)[.:]?$").expect("static regex"));

/// Recognize a leading verse ordinal: "1.", "IV)", or "Verse 3".
///
/// Returns the verse number and whatever text follows the marker on the
/// same line.
pub fn verse_ordinal(line: &str) -> Option<(u32, String)> {
    let line = line.trim();
    if let Some(caps) = ARABIC_ORDINAL.captures(line) {
        let n = caps[1].parse().ok()?;
        return Some((n, caps[2].trim().to_string()));
    }
    if let Some(caps) = LABELED_ORDINAL.captures(line) {
        let n = caps[1].parse().ok()?;
        return Some((n, caps[2].trim().to_string()));
    }
    if let Some(caps) = ROMAN_ORDINAL.captures(line) {
        let n = roman_to_u32(&caps[1])?;
        return Some((n, caps[2].trim().to_string()));
    }
    None
}

/// A line that is nothing but a chorus/refrain marker.
pub fn is_chorus_marker(line: &str) -> bool {
    CHORUS_MARKER.is_match(line.trim())
}

fn roman_to_u32(roman: &str) -> Option<u32> {
    let value = |c: char| match c {
        'I' => Some(1),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        _ => None,
    };
    let digits: Vec<u32> = roman.chars().map(value).collect::<Option<_>>()?;
    let mut total: i64 = 0;
    for (i, &d) in digits.iter().enumerate() {
        if digits.get(i + 1).is_some_and(|&next| next > d) {
            total -= i64::from(d);
        } else {
            total += i64::from(d);
        }
    }
    u32::try_from(total).ok().filter(|&v| v > 0)
}

/// Navigational or legal boilerplate that bounds heuristic lyric scans.
static SENTINELS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:copyright|all rights reserved|public domain courtesy|back to (?:top|index)|home page|sheet music|download midi|click here)\b|\u{00A9}",
    )
    .expect("static regex")
});

pub fn is_sentinel_line(line: &str) -> bool {
    SENTINELS.is_match(line)
}
