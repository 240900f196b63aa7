/*!
 * Recovers file sections from dump documents
 *
 * Decoding is tolerant: anything outside `<<<FILE #n>>>` ... `<<<END FILE #n>>>`
 * units is ignored, and a unit without a usable `PATH:` line or fence pair
 * is skipped without affecting its neighbours.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::types::{BodyKind, FileSection};

static START_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^<<<FILE\s+#(\d+)>>>[ \t]*\r?$").expect("start marker pattern"));

static END_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^<<<END FILE\s+#(\d+)>>>[ \t]*\r?$").expect("end marker pattern")
});

static PATH_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^PATH:[ \t]*(.+?)[ \t\r]*$").expect("path line pattern"));

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(`{3,}|~{3,})([A-Za-z0-9_+-]*)[ \t]*\r?$").expect("fence pattern")
});

/// Extract every well-formed section, in document order
pub fn parse_sections(text: &str) -> Vec<FileSection> {
    let mut sections = Vec::new();
    let mut pos = 0;

    while let Some(caps) = START_MARKER.captures_at(text, pos) {
        let Some((marker_end, index)) = marker_parts(&caps) else {
            break;
        };

        // A unit never reaches past the next start marker
        let limit = START_MARKER
            .find_at(text, marker_end)
            .map_or(text.len(), |m| m.start());

        let mut first_end = None;
        let mut search = marker_end;
        let mut decoded = None;
        while let Some((unit_end, next_pos)) = find_end_marker(text, search, index) {
            if unit_end > limit {
                break;
            }
            first_end.get_or_insert(next_pos);
            match parse_unit(index, &text[marker_end..unit_end]) {
                Unit::Section(section) => {
                    decoded = Some((section, next_pos));
                    break;
                }
                // The body may quote its own end marker
                Unit::Unclosed => search = next_pos,
                Unit::Unusable => break,
            }
        }

        match (decoded, first_end) {
            (Some((section, next_pos)), _) => {
                tracing::debug!("Decoded FILE #{} ({}, {})", index, section.path, section.kind);
                sections.push(section);
                pos = next_pos;
            }
            (None, Some(next_pos)) => {
                tracing::warn!("FILE #{} has no usable PATH line or fence; skipped", index);
                pos = next_pos;
            }
            (None, None) => {
                tracing::warn!("FILE #{} has no matching end marker; skipped", index);
                pos = marker_end;
            }
        }
    }

    sections
}

/// End offset of the marker and its numeric index
fn marker_parts(caps: &Captures<'_>) -> Option<(usize, usize)> {
    let end = caps.get(0)?.end();
    // An index too large for usize still consumes the marker
    let index = caps.get(1)?.as_str().parse().unwrap_or(usize::MAX);
    Some((end, index))
}

/// Start and end offsets of the first end marker carrying `index`
fn find_end_marker(text: &str, from: usize, index: usize) -> Option<(usize, usize)> {
    let mut pos = from;
    while let Some(caps) = END_MARKER.captures_at(text, pos) {
        let whole = caps.get(0)?;
        if caps.get(1)?.as_str().parse::<usize>().ok() == Some(index) {
            return Some((whole.start(), whole.end()));
        }
        pos = whole.end();
    }
    None
}

/// What a candidate unit turned out to hold
enum Unit {
    Section(FileSection),
    /// A fence opened but did not close before the end marker
    Unclosed,
    /// No usable `PATH:` line or opening fence
    Unusable,
}

/// Fence-open captures of a unit: path, fence, language and the body region
fn open_unit(unit: &str) -> Option<(&str, &str, Option<&str>, &str)> {
    let path_caps = PATH_LINE.captures(unit)?;
    let path = path_caps.get(1)?.as_str().trim();
    if path.is_empty() {
        return None;
    }

    let open = FENCE_OPEN.captures_at(unit, path_caps.get(0)?.end())?;
    let fence = open.get(1)?.as_str();
    let language = open
        .get(2)
        .map(|m| m.as_str())
        .filter(|lang| !lang.is_empty());

    let after_open = &unit[open.get(0)?.end()..];
    let region = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))
        .unwrap_or(after_open);
    Some((path, fence, language, region))
}

fn parse_unit(index: usize, unit: &str) -> Unit {
    let Some((path, fence, language, region)) = open_unit(unit) else {
        return Unit::Unusable;
    };

    let mut offset = 0;
    let mut close = None;
    for line in region.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r', ' ', '\t']) == fence {
            close = Some(offset);
            break;
        }
        offset += line.len();
    }
    let Some(close) = close else {
        return Unit::Unclosed;
    };

    let kind = match language {
        Some(lang) if lang.eq_ignore_ascii_case("diff") => BodyKind::Diff,
        _ => BodyKind::FullText,
    };

    Unit::Section(FileSection {
        index,
        path: path.to_string(),
        body: region[..close].to_string(),
        fence: fence.to_string(),
        language: language.map(str::to_string),
        kind,
    })
}
