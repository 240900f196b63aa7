/*!
 * Undump engine: applies decoded sections to a destination root
 *
 * Every section is handled on its own. Problems are recorded in the
 * returned report and never stop the run.
 */

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization;

use crate::decoder::parse_sections;
use crate::diff::{apply_patch, parse_single_file_patch};
use crate::error::{DumpUndumpError, Result};
use crate::fs::{Clock, FileSystem};
use crate::types::{BodyKind, FileSection, UndumpReport};
use crate::utils::iso_timestamp;

const EMPTY_PATH: &str = "<empty path>";

/// LF line endings, a trailing LF and Unicode NFC
pub fn normalize_body(body: &str) -> String {
    let mut text = body.replace("\r\n", "\n").replace('\r', "\n");
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text.nfc().collect()
}

/// Sibling path `<stem>.bak-<timestamp>.<ext>` for a backup taken at `at`
pub fn backup_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let stamp = iso_timestamp(at).replace(':', "-");
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "txt".to_string());
    path.with_file_name(format!("{}.bak-{}.{}", stem, stamp, ext))
}

/// Why a section path may not be written, if it may not
fn path_problem(path: &str) -> Option<&'static str> {
    if path.is_empty() {
        Some("empty path")
    } else if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        Some("absolute paths are not allowed")
    } else if path.split(['/', '\\']).any(|segment| segment == "..") {
        Some("paths may not contain '..'")
    } else {
        None
    }
}

/// Applies dump documents to a directory
pub struct Undumper<'a, F: FileSystem + ?Sized, C: Clock + ?Sized> {
    fs: &'a F,
    clock: &'a C,
    dry_run: bool,
    make_backups: bool,
}

impl<'a, F: FileSystem + ?Sized, C: Clock + ?Sized> Undumper<'a, F, C> {
    /// Create an undumper that writes for real and keeps no backups
    pub fn new(fs: &'a F, clock: &'a C) -> Self {
        Self {
            fs,
            clock,
            dry_run: false,
            make_backups: false,
        }
    }

    /// Decide everything but touch nothing
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Copy existing files aside before replacing or deleting them
    pub fn make_backups(mut self, make_backups: bool) -> Self {
        self.make_backups = make_backups;
        self
    }

    /// Decode `text` and apply every section under `root`
    pub fn undump(&self, text: &str, root: &Path) -> UndumpReport {
        let sections = parse_sections(text);
        tracing::debug!("Decoded {} sections", sections.len());
        self.apply_sections(&sections, root)
    }

    /// Apply already decoded sections, in order
    pub fn apply_sections(&self, sections: &[FileSection], root: &Path) -> UndumpReport {
        let mut report = UndumpReport::default();
        for section in sections {
            self.apply_section(section, root, &mut report);
        }
        report
    }

    fn apply_section(&self, section: &FileSection, root: &Path, report: &mut UndumpReport) {
        let path = section.path.trim();
        if let Some(problem) = path_problem(path) {
            let shown = if path.is_empty() { EMPTY_PATH } else { path };
            tracing::warn!("Skipping FILE #{} {}: {}", section.index, shown, problem);
            report.skipped.push(shown.to_string());
            report.issue(shown, problem);
            return;
        }
        let target = root.join(path);

        if section.is_deletion() {
            self.delete(&target, path, report);
            return;
        }

        let existing = match self.read_existing(&target) {
            Ok(existing) => existing,
            Err(e) => {
                report.fail(path, DumpUndumpError::file_op("read", path, e).to_string());
                return;
            }
        };

        let desired = match section.kind {
            BodyKind::FullText => normalize_body(&section.body),
            BodyKind::Diff => match self.patched(section, path, existing.as_deref()) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("{}: {}", path, e);
                    report.fail(path, e.to_string());
                    return;
                }
            },
        };

        if existing.as_deref().map(normalize_body).as_deref() == Some(desired.as_str()) {
            tracing::debug!("{}: unchanged", path);
            report.skipped.push(path.to_string());
            return;
        }

        let created = existing.is_none();
        if !self.dry_run {
            if let Err(message) = self.write(&target, path, desired.as_bytes(), !created) {
                report.fail(path, message);
                return;
            }
        }

        tracing::debug!(
            "{}: {}{}",
            path,
            if created { "created" } else { "updated" },
            if self.dry_run { " (dry run)" } else { "" }
        );
        if created {
            report.created.push(path.to_string());
        } else {
            report.updated.push(path.to_string());
        }
    }

    /// Current text of `target`, `None` when there is no such file
    fn read_existing(&self, target: &Path) -> std::io::Result<Option<String>> {
        if !self.fs.exists(target) {
            return Ok(None);
        }
        let bytes = self.fs.read(target)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn patched(&self, section: &FileSection, path: &str, existing: Option<&str>) -> Result<String> {
        let patch = parse_single_file_patch(&section.body, path)?;
        let patched = apply_patch(&patch, existing.unwrap_or(""))?;
        Ok(normalize_body(&patched))
    }

    fn delete(&self, target: &Path, path: &str, report: &mut UndumpReport) {
        if !self.fs.exists(target) {
            tracing::debug!("{}: nothing to delete", path);
            report.skipped.push(path.to_string());
            return;
        }
        if self.dry_run {
            tracing::debug!("{}: would delete", path);
            report.updated.push(path.to_string());
            return;
        }

        let backup_note = self.backup(target, path);
        match self.fs.remove_file(target) {
            Ok(()) => {
                tracing::debug!("{}: deleted", path);
                report.updated.push(path.to_string());
            }
            Err(e) => {
                let err = DumpUndumpError::file_op("delete", path, e);
                report.fail(path, with_note(err, backup_note));
            }
        }
    }

    /// Create parents, back up when replacing, then write atomically
    fn write(
        &self,
        target: &Path,
        path: &str,
        bytes: &[u8],
        replacing: bool,
    ) -> std::result::Result<(), String> {
        if let Some(parent) = target.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|e| DumpUndumpError::file_op("create directory for", path, e).to_string())?;
        }

        let backup_note = if replacing {
            self.backup(target, path)
        } else {
            None
        };

        self.fs
            .write_atomic(target, bytes)
            .map_err(|e| with_note(DumpUndumpError::file_op("write", path, e), backup_note))
    }

    /// Copy `target` aside; returns a note when the copy failed
    fn backup(&self, target: &Path, path: &str) -> Option<String> {
        if !self.make_backups {
            return None;
        }
        let destination = backup_path(target, self.clock.now());
        match self.fs.copy(target, &destination) {
            Ok(()) => {
                tracing::debug!("{}: backed up to {}", path, destination.display());
                None
            }
            Err(e) => {
                tracing::warn!("Failed to back up {}: {}", path, e);
                Some(format!("backup failed: {}", e))
            }
        }
    }
}

fn with_note(err: DumpUndumpError, note: Option<String>) -> String {
    match note {
        Some(note) => format!("{} ({})", err, note),
        None => err.to_string(),
    }
}
