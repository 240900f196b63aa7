/*!
 * Filesystem and clock abstractions
 *
 * The dump and undump engines only touch the outside world through these
 * traits, so a run can be replayed against an in-memory tree.
 */

mod local;
mod memory;

pub use local::{LocalFs, SystemClock};
pub use memory::{FixedClock, MemoryFs};

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// One entry found while walking a directory tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Full path of the entry
    pub path: PathBuf,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Whether the entry is a symbolic link (never followed)
    pub is_symlink: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

/// Filesystem operations used by the engines
pub trait FileSystem: Send + Sync {
    /// Walk `root` recursively without following symlinks.
    ///
    /// Directories whose name matches one of `skip_dirs` are neither listed
    /// nor descended into. An unreadable root is an error; unreadable
    /// entries below it are dropped.
    fn read_tree(&self, root: &Path, skip_dirs: &[String]) -> io::Result<Vec<TreeEntry>>;

    /// Read a whole file
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Whether a file exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Replace `path` with `bytes` so readers never see a partial write
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Create a directory and all of its parents
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Delete a file
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Copy a file byte for byte
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Resolve a path to its absolute form
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
