/*!
 * Strict, context-checked patch application
 */

use super::{DiffApplyError, HunkLine, UnifiedDiffPatch};

/// Apply `patch` to `original` and return the patched text
///
/// Line endings are normalized to LF first. Each hunk starts at line
/// `old_start` of the text as earlier hunks left it; every context and
/// removal line must match exactly, and nothing is searched for when it does
/// not. The result always ends with a newline.
pub fn apply_patch(patch: &UnifiedDiffPatch, original: &str) -> Result<String, DiffApplyError> {
    let normalized = original.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = normalized.split('\n').map(str::to_string).collect();

    for hunk in &patch.hunks {
        let mut cursor = hunk.old_start.saturating_sub(1);
        if cursor > lines.len() {
            return Err(DiffApplyError::OutOfBounds { line_index: cursor });
        }

        for line in &hunk.lines {
            match line {
                HunkLine::Context(expected) => {
                    check_line(&lines, cursor, expected)?;
                    cursor += 1;
                }
                HunkLine::Remove(expected) => {
                    check_line(&lines, cursor, expected)?;
                    lines.remove(cursor);
                }
                HunkLine::Add(text) => {
                    lines.insert(cursor, text.clone());
                    cursor += 1;
                }
            }
        }
    }

    let mut result = lines.join("\n");
    if !result.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

fn check_line(lines: &[String], index: usize, expected: &str) -> Result<(), DiffApplyError> {
    let actual = lines
        .get(index)
        .ok_or(DiffApplyError::OutOfBounds { line_index: index })?;
    if actual != expected {
        return Err(DiffApplyError::ContextMismatch {
            expected: expected.to_string(),
            actual: actual.clone(),
            line_index: index,
        });
    }
    Ok(())
}
