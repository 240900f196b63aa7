/*!
 * Strict parser for single-file unified diffs
 */

use super::{DiffParseError, Hunk, HunkLine, UnifiedDiffPatch};

const DEV_NULL: &str = "/dev/null";
const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

type ParseResult<T> = Result<T, DiffParseError>;

/// Parse a diff that must touch exactly one file, the one at `expected_path`
///
/// Optional `diff --git`, `index` and mode lines before the `---`/`+++`
/// headers are accepted and ignored. Everything after the first `@@` line
/// must be hunk content.
pub fn parse_single_file_patch(text: &str, expected_path: &str) -> ParseResult<UnifiedDiffPatch> {
    let raw = text.trim_matches(|c| c == '\n' || c == '\r');
    if raw.trim().is_empty() {
        return Err(DiffParseError::Empty);
    }

    let lines: Vec<&str> = raw
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    if lines.iter().any(|l| is_binary_marker(l)) {
        return Err(DiffParseError::BinaryNotSupported);
    }
    if lines.iter().any(|l| l.trim_end() == "GIT binary patch") {
        return Err(DiffParseError::GitBinaryPatch);
    }
    if lines.iter().filter(|l| l.starts_with("diff --git ")).count() > 1 {
        return Err(DiffParseError::MultiFile);
    }

    let mut original_path = None;
    let mut new_path = None;
    let mut is_new_file = false;
    let mut is_delete = false;
    let mut saw_original = false;
    let mut saw_new = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if let Some(rest) = line.strip_prefix("--- ") {
            if saw_original {
                return Err(DiffParseError::MultiFile);
            }
            saw_original = true;
            let path = header_path(rest);
            if path == DEV_NULL {
                is_new_file = true;
            } else {
                original_path = Some(path.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            if saw_new {
                return Err(DiffParseError::MultiFile);
            }
            saw_new = true;
            let path = header_path(rest);
            if path == DEV_NULL {
                is_delete = true;
            } else {
                new_path = Some(path.to_string());
            }
        } else if line.starts_with("@@") {
            break;
        }
        i += 1;
    }

    if is_delete {
        return Err(DiffParseError::DeleteNotSupported);
    }
    if original_path.is_none() && new_path.is_none() && !is_new_file {
        return Err(DiffParseError::MissingFileHeader);
    }

    if let Some(path) = new_path.as_deref().or(original_path.as_deref()) {
        let actual = strip_git_prefix(path);
        if !path_matches(actual, expected_path) {
            return Err(DiffParseError::PathMismatch {
                expected: expected_path.to_string(),
                actual: actual.to_string(),
            });
        }
    }

    let mut hunks = Vec::new();
    while i < lines.len() {
        let header_line = lines[i];
        let (old_start, old_count, new_start, new_count) = parse_hunk_header(header_line)
            .ok_or_else(|| DiffParseError::MalformedHunkHeader(header_line.to_string()))?;
        i += 1;

        let mut hunk_lines = Vec::new();
        while i < lines.len() {
            let line = lines[i];
            if line.starts_with("@@") {
                break;
            }
            if starts_new_file(&lines, i) {
                return Err(DiffParseError::MultiFile);
            }
            i += 1;

            if line.starts_with('\\') {
                if line.starts_with(NO_NEWLINE_MARKER) {
                    continue;
                }
                return Err(DiffParseError::MalformedHunkLine(line.to_string()));
            }
            if line.is_empty() {
                hunk_lines.push(HunkLine::Context(String::new()));
                continue;
            }

            let tagged = match line.as_bytes()[0] {
                b' ' => HunkLine::Context(line[1..].to_string()),
                b'+' => HunkLine::Add(line[1..].to_string()),
                b'-' => HunkLine::Remove(line[1..].to_string()),
                _ => return Err(DiffParseError::MalformedHunkLine(line.to_string())),
            };
            hunk_lines.push(tagged);
        }

        hunks.push(Hunk {
            old_start,
            old_count,
            new_start,
            new_count,
            lines: hunk_lines,
        });
    }

    if hunks.is_empty() {
        return Err(DiffParseError::MissingHunks);
    }

    Ok(UnifiedDiffPatch {
        expected_path: expected_path.to_string(),
        original_path,
        new_path,
        is_new_file,
        is_delete,
        hunks,
    })
}

fn is_binary_marker(line: &str) -> bool {
    line.starts_with("Binary files ") && line.trim_end().ends_with(" differ")
}

/// A second `diff --git` or a `---` line directly followed by `+++`
fn starts_new_file(lines: &[&str], i: usize) -> bool {
    let line = lines[i];
    line.starts_with("diff --git ")
        || (line.starts_with("--- ")
            && lines.get(i + 1).map_or(false, |next| next.starts_with("+++ ")))
}

/// Header path without a trailing tab-separated timestamp
fn header_path(rest: &str) -> &str {
    rest.split('\t').next().unwrap_or(rest).trim_end()
}

fn strip_git_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

fn path_matches(actual: &str, expected: &str) -> bool {
    actual == expected
        || (actual.len() > expected.len()
            && actual.ends_with(expected)
            && actual.as_bytes()[actual.len() - expected.len() - 1] == b'/')
}

/// `@@ -oldStart[,oldCount] +newStart[,newCount] @@[ heading]`
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = line.strip_prefix("@@ ")?;
    let end = rest.find(" @@")?;
    let mut ranges = rest[..end].split_whitespace();
    let (old_start, old_count) = parse_range(ranges.next()?, '-')?;
    let (new_start, new_count) = parse_range(ranges.next()?, '+')?;
    if ranges.next().is_some() {
        return None;
    }
    Some((old_start, old_count, new_start, new_count))
}

fn parse_range(token: &str, prefix: char) -> Option<(usize, usize)> {
    let rest = token.strip_prefix(prefix)?;
    match rest.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((rest.parse().ok()?, 1)),
    }
}
