/*!
 * Dump engine: selection followed by encoding
 */

use std::path::Path;
use std::sync::Arc;

use indicatif::ProgressBar;

use crate::config::DumpOptions;
use crate::encoder::DumpEncoder;
use crate::error::Result;
use crate::fs::{Clock, FileSystem};
use crate::selector::FileSelector;
use crate::types::DumpResult;
use crate::utils::iso_timestamp;

/// Serializes a directory into a dump document
pub struct Dumper<'a, F: FileSystem + ?Sized, C: Clock + ?Sized> {
    fs: &'a F,
    clock: &'a C,
    progress: Arc<ProgressBar>,
}

impl<'a, F: FileSystem + ?Sized, C: Clock + ?Sized> Dumper<'a, F, C> {
    /// Create a dumper over the given filesystem and clock
    pub fn new(fs: &'a F, clock: &'a C, progress: Arc<ProgressBar>) -> Self {
        Self {
            fs,
            clock,
            progress,
        }
    }

    /// Dump every selected file under `root`
    ///
    /// Fails only when `root` itself cannot be listed.
    pub fn dump(&self, root: &Path, options: &DumpOptions) -> Result<DumpResult> {
        self.progress.set_prefix("Selecting");
        let paths = FileSelector::new(self.fs, options).select(root)?;

        let root_name = self.root_name(root);
        let generated = iso_timestamp(self.clock.now());

        self.progress.set_prefix("Encoding");
        let document = DumpEncoder::new(self.fs, Arc::clone(&self.progress)).encode(
            root,
            &root_name,
            &paths,
            &generated,
        )?;
        tracing::debug!(
            "Dumped {} files from {} ({})",
            document.header.files,
            root.display(),
            document.header.dump_sha256
        );

        Ok(DumpResult {
            text: document.text,
            file_count: document.header.files,
            records: document.records,
            dump_sha256: document.header.dump_sha256,
        })
    }

    /// Last component of the resolved root, for the document title
    fn root_name(&self, root: &Path) -> String {
        self.fs
            .canonicalize(root)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| root.display().to_string())
    }
}
