/*!
 * Core types and data structures for dumpundump
 */

use serde::{Deserialize, Serialize};
use strum::Display;

/// Metadata for one file entering a dump
///
/// Field names follow the manifest JSON keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// 1-based position in the dump
    pub index: usize,
    /// Root-relative, slash-separated path
    pub path: String,
    /// File extension without the dot (may be empty)
    pub ext: String,
    /// Raw byte length on disk
    pub bytes: usize,
    /// Newline count + 1
    pub lines: usize,
    /// Language tag derived from the extension (may be empty)
    pub lang: String,
    /// Encoding name, always `utf8`
    pub enc: String,
    /// Hex SHA-256 of the section body
    pub hash: String,
    /// UTF-8 byte length of the decoded text
    pub content_bytes: usize,
}

/// Header values of a dump document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpHeader {
    /// Title root name
    pub root_name: String,
    /// ISO-8601 generation timestamp
    pub generated: String,
    /// Number of files
    pub files: usize,
    /// Aggregate hash of every per-file hash
    pub dump_sha256: String,
}

/// A fully encoded dump
#[derive(Debug, Clone)]
pub struct DumpDocument {
    /// Header fields
    pub header: DumpHeader,
    /// Manifest entries in index order
    pub records: Vec<FileRecord>,
    /// Serialized document
    pub text: String,
}

/// Outward result of a dump call
#[derive(Debug, Clone)]
pub struct DumpResult {
    /// Document text
    pub text: String,
    /// Number of file sections in the document
    pub file_count: usize,
    /// Manifest entries, for reporting
    pub records: Vec<FileRecord>,
    /// Aggregate hash
    pub dump_sha256: String,
}

/// How a section body should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BodyKind {
    /// Complete file content
    FullText,
    /// Single-file unified diff
    Diff,
}

/// One file's payload recovered from a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSection {
    /// Index from the start marker
    pub index: usize,
    /// Path from the `PATH:` line, trimmed
    pub path: String,
    /// Raw body between the fences
    pub body: String,
    /// Opening fence characters
    pub fence: String,
    /// Language word on the opening fence
    pub language: Option<String>,
    /// Full text or diff
    pub kind: BodyKind,
}

impl FileSection {
    /// An empty full-text body asks for the file to be deleted
    pub fn is_deletion(&self) -> bool {
        self.kind == BodyKind::FullText && self.body.is_empty()
    }
}

/// A per-path problem recorded during undump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

/// Outcome of an undump run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndumpReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub issues: Vec<Issue>,
}

impl UndumpReport {
    /// Record a failure together with its message
    pub fn fail(&mut self, path: &str, message: impl Into<String>) {
        self.failed.push(path.to_string());
        self.issue(path, message);
    }

    /// Record an issue without classifying the path
    pub fn issue(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(Issue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    /// Whether any path failed
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// One-line summary, empty when nothing happened
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.created.is_empty() {
            parts.push(format!("Created: {}", self.created.len()));
        }
        if !self.updated.is_empty() {
            parts.push(format!("Updated: {}", self.updated.len()));
        }
        if !self.skipped.is_empty() {
            parts.push(format!("Skipped: {}", self.skipped.len()));
        }
        if !self.failed.is_empty() {
            parts.push(format!("Failed: {}", self.failed.len()));
        }
        parts.join(" • ")
    }
}
