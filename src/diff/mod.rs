/*!
 * Single-file unified diffs: parsing and strict application
 */

mod applier;
mod error;
mod parser;

pub use applier::apply_patch;
pub use error::{DiffApplyError, DiffParseError};
pub use parser::parse_single_file_patch;

/// A validated patch for exactly one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedDiffPatch {
    /// Path named by the enclosing section
    pub expected_path: String,
    /// Path from the `---` header
    pub original_path: Option<String>,
    /// Path from the `+++` header
    pub new_path: Option<String>,
    /// `--- /dev/null`
    pub is_new_file: bool,
    /// `+++ /dev/null`; always false once parsing succeeded
    pub is_delete: bool,
    /// Hunks in file order
    pub hunks: Vec<Hunk>,
}

/// One `@@` region of a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

/// A tagged line inside a hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    /// Leading space: must match and is kept
    Context(String),
    /// Leading `+`: inserted
    Add(String),
    /// Leading `-`: must match and is removed
    Remove(String),
}
