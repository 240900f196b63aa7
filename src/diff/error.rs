/*!
 * Error types for diff parsing and application
 */

use thiserror::Error;

/// Reasons a diff body is rejected before any file is touched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffParseError {
    /// Nothing but whitespace
    #[error("diff body is empty")]
    Empty,

    /// More than one file header group
    #[error("diff touches more than one file")]
    MultiFile,

    /// `Binary files ... differ`
    #[error("binary diffs are not supported")]
    BinaryNotSupported,

    /// `GIT binary patch`
    #[error("git binary patches are not supported")]
    GitBinaryPatch,

    /// `+++ /dev/null`
    #[error("deleting a file through a diff is not supported; send an empty full-text body instead")]
    DeleteNotSupported,

    /// Headers but no `@@` hunk
    #[error("diff contains no hunks")]
    MissingHunks,

    /// An `@@` line that does not follow the hunk header grammar
    #[error("malformed hunk header: {0}")]
    MalformedHunkHeader(String),

    /// A hunk line with an unknown leading character
    #[error("malformed hunk line: {0}")]
    MalformedHunkLine(String),

    /// Neither `---` nor `+++` before the first hunk
    #[error("diff has no ---/+++ file header")]
    MissingFileHeader,

    /// The header names a different file than the section
    #[error("diff path mismatch: expected {expected}, got {actual}")]
    PathMismatch { expected: String, actual: String },
}

/// Reasons a parsed patch does not fit the current file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffApplyError {
    /// A context or removal line differs from the file
    #[error("context mismatch at line {}: expected {expected:?}, found {actual:?}", line_index + 1)]
    ContextMismatch {
        expected: String,
        actual: String,
        /// 0-based index into the file being patched
        line_index: usize,
    },

    /// The hunk points past the end of the file
    #[error("hunk runs past the end of the file at line {}", line_index + 1)]
    OutOfBounds { line_index: usize },
}
