/*!
 * DumpUndump - Carry a directory of text files as one document and back
 *
 * `dump` serializes selected text files into a self-describing document
 * (header, JSON manifest, table of contents, fenced per-file sections).
 * `undump` writes files back from such a document, either replacing them
 * with full text or applying single-file unified diffs.
 */

pub mod config;
pub mod decoder;
pub mod diff;
pub mod dump;
pub mod encoder;
pub mod error;
pub mod fs;
pub mod report;
pub mod selector;
pub mod types;
pub mod undump;
pub mod utils;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;

use indicatif::ProgressBar;

// Re-export main components for easier access
pub use config::{DumpConfig, DumpOptions, OutputFormat, UndumpConfig};
pub use decoder::parse_sections;
pub use dump::Dumper;
pub use error::{DumpUndumpError, Result};
pub use fs::{Clock, FileSystem, LocalFs, SystemClock};
pub use report::{DumpSummary, Reporter};
pub use types::{BodyKind, DumpResult, FileRecord, FileSection, Issue, UndumpReport};
pub use undump::Undumper;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dump `root` from the local disk
pub fn dump(root: impl AsRef<Path>, options: &DumpOptions) -> Result<DumpResult> {
    let fs = LocalFs::new();
    Dumper::new(&fs, &SystemClock, Arc::new(ProgressBar::hidden())).dump(root.as_ref(), options)
}

/// Apply a dump document to `root` on the local disk
pub fn undump(text: &str, root: impl AsRef<Path>, dry_run: bool, make_backups: bool) -> UndumpReport {
    let fs = LocalFs::new();
    Undumper::new(&fs, &SystemClock)
        .dry_run(dry_run)
        .make_backups(make_backups)
        .undump(text, root.as_ref())
}
