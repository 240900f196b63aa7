/*!
 * Production filesystem backed by std::fs
 */

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ignore::{DirEntry as IgnoreDirEntry, WalkBuilder};
use tempfile::NamedTempFile;
use walkdir::{DirEntry, WalkDir};

use super::{Clock, FileSystem, TreeEntry};
use crate::utils::is_excluded_dir;

/// Local disk access
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    /// Honour .gitignore files while walking
    respect_gitignore: bool,
}

impl LocalFs {
    /// Create a filesystem that walks every entry
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle .gitignore handling
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    fn walk_plain(&self, root: &Path, skip_dirs: &[String]) -> Vec<TreeEntry> {
        WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e, skip_dirs))
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .map(|entry| TreeEntry {
                is_dir: entry.file_type().is_dir(),
                is_symlink: entry.path_is_symlink(),
                size: entry.metadata().map(|m| m.len()).unwrap_or(0),
                path: entry.into_path(),
            })
            .collect()
    }

    fn walk_gitignore(&self, root: &Path, skip_dirs: &[String]) -> Vec<TreeEntry> {
        let patterns = skip_dirs.to_vec();
        let mut walker = WalkBuilder::new(root);
        walker
            .standard_filters(false)
            .git_ignore(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false)
            .follow_links(false)
            .filter_entry(move |e| !is_skipped_ignore_dir(e, &patterns));

        walker
            .build()
            .filter_map(Result::ok)
            .filter(|e| e.depth() > 0)
            .map(|entry| {
                let is_dir = entry.file_type().map_or(false, |ft| ft.is_dir());
                TreeEntry {
                    is_dir,
                    is_symlink: entry.path_is_symlink(),
                    size: entry.metadata().map(|m| m.len()).unwrap_or(0),
                    path: entry.into_path(),
                }
            })
            .collect()
    }
}

fn is_skipped_dir(entry: &DirEntry, skip_dirs: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && is_excluded_dir(&entry.file_name().to_string_lossy(), skip_dirs)
}

fn is_skipped_ignore_dir(entry: &IgnoreDirEntry, skip_dirs: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().map_or(false, |ft| ft.is_dir())
        && is_excluded_dir(&entry.file_name().to_string_lossy(), skip_dirs)
}

impl FileSystem for LocalFs {
    fn read_tree(&self, root: &Path, skip_dirs: &[String]) -> io::Result<Vec<TreeEntry>> {
        // Surface an unreadable root before walking
        fs::read_dir(root)?;

        if self.respect_gitignore {
            Ok(self.walk_gitignore(root, skip_dirs))
        } else {
            Ok(self.walk_plain(root, skip_dirs))
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
