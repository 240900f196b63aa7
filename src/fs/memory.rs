/*!
 * In-memory filesystem and fixed clock for tests
 */

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{Clock, FileSystem, TreeEntry};
use crate::utils::is_excluded_dir;

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    failing: BTreeSet<PathBuf>,
}

impl MemoryState {
    fn add_dir(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        if self.failing.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("write refused: {}", path.display()),
            ));
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !self.dirs.contains(parent) => {
                Err(not_found(parent))
            }
            _ => Ok(()),
        }
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

/// A file tree held in memory
///
/// Paths listed with [`MemoryFs::fail_writes_to`] reject every mutation,
/// which lets tests drive the undump failure paths.
#[derive(Debug, Default)]
pub struct MemoryFs {
    state: Mutex<MemoryState>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryFs::insert_file`]
    pub fn with_file(self, path: impl AsRef<Path>, bytes: impl AsRef<[u8]>) -> Self {
        self.insert_file(path, bytes);
        self
    }

    /// Create or replace a file, creating its parent directories
    pub fn insert_file(&self, path: impl AsRef<Path>, bytes: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            state.add_dir(parent);
        }
        state
            .files
            .insert(path.to_path_buf(), bytes.as_ref().to_vec());
    }

    /// Make writes, copies onto and deletes of `path` fail
    pub fn fail_writes_to(&self, path: impl AsRef<Path>) {
        self.lock().failing.insert(path.as_ref().to_path_buf());
    }

    /// Current contents of a file
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// Current contents of a file as text
    pub fn text(&self, path: impl AsRef<Path>) -> Option<String> {
        self.contents(path)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Every file path, sorted
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Whether any directory between `root` (exclusive) and `path` is skipped
fn under_skipped_dir(root: &Path, path: &Path, skip_dirs: &[String], include_self: bool) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return true;
    };
    let components: Vec<_> = rel.components().collect();
    let dir_count = if include_self {
        components.len()
    } else {
        components.len().saturating_sub(1)
    };
    components[..dir_count]
        .iter()
        .any(|c| is_excluded_dir(&c.as_os_str().to_string_lossy(), skip_dirs))
}

impl FileSystem for MemoryFs {
    fn read_tree(&self, root: &Path, skip_dirs: &[String]) -> io::Result<Vec<TreeEntry>> {
        let state = self.lock();
        if !state.dirs.contains(root) {
            return Err(not_found(root));
        }

        let mut entries: Vec<TreeEntry> = state
            .dirs
            .iter()
            .filter(|d| d.as_path() != root && d.starts_with(root))
            .filter(|d| !under_skipped_dir(root, d, skip_dirs, true))
            .map(|d| TreeEntry {
                path: d.clone(),
                is_dir: true,
                is_symlink: false,
                size: 0,
            })
            .collect();

        entries.extend(
            state
                .files
                .iter()
                .filter(|(p, _)| p.starts_with(root))
                .filter(|(p, _)| !under_skipped_dir(root, p, skip_dirs, false))
                .map(|(p, bytes)| TreeEntry {
                    path: p.clone(),
                    is_dir: false,
                    is_symlink: false,
                    size: bytes.len() as u64,
                }),
        );

        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        state.check_writable(path)?;
        state.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.lock().add_dir(path);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.failing.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("delete refused: {}", path.display()),
            ));
        }
        state.files.remove(path).map(|_| ()).ok_or_else(|| not_found(path))
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        let bytes = state.files.get(from).cloned().ok_or_else(|| not_found(from))?;
        state.check_writable(to)?;
        state.files.insert(to.to_path_buf(), bytes);
        Ok(())
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}

/// A clock that always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self(DateTime::<Utc>::default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
