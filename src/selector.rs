/*!
 * File selection: decides which files enter a dump
 */

use std::collections::BTreeSet;
use std::path::{Component, Path};

use rayon::prelude::*;

use crate::config::DumpOptions;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::utils::natural_cmp;

/// Bytes inspected by the text sniff
const SNIFF_LEN: usize = 4096;

/// Control-byte ratio at which a file counts as binary
const CONTROL_RATIO_LIMIT: f64 = 0.30;

/// Explicit inclusion set with an exclusion overlay
///
/// A selection names a root-relative path and covers it and everything
/// below it. Selections prefixed with `!` exclude instead, and an exclusion
/// wins over any inclusion at any depth. `.` selects the whole root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRules {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl SelectionRules {
    /// Build rules from raw selection strings
    pub fn from_selections<I, S>(selections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Self::default();
        for raw in selections {
            let raw = raw.as_ref().trim();
            match raw.strip_prefix('!') {
                Some(rest) => {
                    if let Some(path) = normalize_selection(rest) {
                        rules.exclude.insert(path);
                    }
                }
                None => {
                    if let Some(path) = normalize_selection(raw) {
                        rules.include.insert(path);
                    }
                }
            }
        }
        rules
    }

    /// Whether nothing is included
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Whether `rel` or one of its ancestors is included
    pub fn includes(&self, rel: &str) -> bool {
        self.include.iter().any(|sel| covers(sel, rel))
    }

    /// Whether `rel` or one of its ancestors is excluded
    pub fn excludes(&self, rel: &str) -> bool {
        self.exclude.iter().any(|sel| covers(sel, rel))
    }

    /// Whether an inclusion that itself names a hidden path covers `rel`
    pub fn names_hidden(&self, rel: &str) -> bool {
        self.include
            .iter()
            .any(|sel| is_hidden(sel) && covers(sel, rel))
    }

    /// Final decision for a relative path
    pub fn allows(&self, rel: &str) -> bool {
        self.includes(rel) && !self.excludes(rel)
    }
}

/// Trim slashes and `./`; `.` or an empty remainder means the root
fn normalize_selection(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "." {
        return Some(".".to_string());
    }
    let trimmed = trimmed.trim_start_matches("./").trim_start_matches('/');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn covers(selection: &str, rel: &str) -> bool {
    selection == "."
        || rel == selection
        || (rel.len() > selection.len()
            && rel.starts_with(selection)
            && rel.as_bytes()[selection.len()] == b'/')
}

/// Whether any segment of a relative path is a dotfile or dot-directory
pub fn is_hidden(rel: &str) -> bool {
    rel.split('/').any(|seg| seg.starts_with('.') && seg != ".")
}

/// Sniff the first bytes of a file for binary content
///
/// A NUL byte, or control bytes other than tab/LF/CR making up at least
/// 30% of the sample, mark the data as binary.
pub fn is_text(data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }
    let sample = &data[..data.len().min(SNIFF_LEN)];
    if sample.contains(&0) {
        return false;
    }
    let control = sample
        .iter()
        .filter(|&&b| b < 32 && b != b'\t' && b != b'\n' && b != b'\r')
        .count();
    (control as f64 / sample.len() as f64) < CONTROL_RATIO_LIMIT
}

/// Root-relative, slash-separated form of `path`
///
/// Returns `None` for paths outside `root` or with non UTF-8 names.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str()?),
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Walks a root and returns the files that pass every selection rule
pub struct FileSelector<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    options: &'a DumpOptions,
    rules: SelectionRules,
}

impl<'a, F: FileSystem + ?Sized> FileSelector<'a, F> {
    /// Create a selector for the given options
    pub fn new(fs: &'a F, options: &'a DumpOptions) -> Self {
        Self {
            fs,
            options,
            rules: SelectionRules::from_selections(&options.selections),
        }
    }

    /// Ordered, deduplicated relative paths of the files to dump
    ///
    /// Only an unreadable root is an error; any per-file problem silently
    /// drops that file.
    pub fn select(&self, root: &Path) -> Result<Vec<String>> {
        let entries = self.fs.read_tree(root, &self.options.excluded_dirs)?;

        // Sniffing reads every candidate, so filter in parallel
        let mut selected: Vec<String> = entries
            .par_iter()
            .filter(|e| !e.is_dir && !e.is_symlink)
            .filter_map(|e| {
                let rel = relative_path(root, &e.path)?;
                self.passes(&rel, &e.path, e.size).then_some(rel)
            })
            .collect();

        selected.sort_by(|a, b| natural_cmp(a, b));
        selected.dedup();
        tracing::debug!("Selected {} files under {}", selected.len(), root.display());
        Ok(selected)
    }

    /// Whether a single candidate file passes every rule
    fn passes(&self, rel: &str, path: &Path, size: u64) -> bool {
        if self.has_binary_extension(path) {
            tracing::debug!("{}: binary extension", rel);
            return false;
        }
        if !self.rules.includes(rel) {
            return false;
        }
        if !self.options.include_hidden && is_hidden(rel) && !self.rules.names_hidden(rel) {
            tracing::debug!("{}: hidden", rel);
            return false;
        }
        if self.rules.excludes(rel) {
            tracing::debug!("{}: excluded by selection", rel);
            return false;
        }
        if let Some(max) = self.options.max_bytes() {
            if size > max {
                tracing::debug!("{}: larger than {} bytes", rel, max);
                return false;
            }
        }
        match self.fs.read(path) {
            Ok(data) if is_text(&data) => true,
            Ok(_) => {
                tracing::debug!("{}: binary content", rel);
                false
            }
            Err(e) => {
                tracing::debug!("{}: unreadable: {}", rel, e);
                false
            }
        }
    }

    fn has_binary_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map_or(false, |ext| {
                self.options.binary_extensions.iter().any(|b| *b == ext)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    #[test]
    fn test_rules_exclusion_wins() {
        let rules = SelectionRules::from_selections(["src", "!src/generated", "docs/"]);
        assert!(rules.allows("src/main.rs"));
        assert!(rules.allows("src/a/b.rs"));
        assert!(!rules.allows("src/generated/api.rs"));
        assert!(!rules.allows("src/generated"));
        assert!(rules.allows("docs/index.md"));
        assert!(!rules.allows("srcfoo/main.rs"));
        assert!(!rules.allows("README.md"));
    }

    #[test]
    fn test_rules_root_selection() {
        let rules = SelectionRules::from_selections([".", "!secret.txt", "!", ""]);
        assert!(rules.allows("README.md"));
        assert!(rules.allows("a/b/c.txt"));
        assert!(!rules.allows("secret.txt"));
        assert!(SelectionRules::from_selections(["!a"]).is_empty());
    }

    #[test]
    fn test_is_text() {
        assert!(is_text(b""));
        assert!(is_text(b"fn main() {}\n\tindent\r\n"));
        assert!(!is_text(b"abc\0def"));
        // 3 control bytes out of 10 is exactly 30%
        assert!(!is_text(&[1, 2, 3, b'a', b'b', b'c', b'd', b'e', b'f', b'g']));
        assert!(is_text(&[1, 2, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h']));
    }

    #[test]
    fn test_is_text_only_sniffs_prefix() {
        let mut data = vec![b'a'; SNIFF_LEN];
        data.push(0);
        assert!(is_text(&data));
    }

    #[test]
    fn test_select_orders_and_filters() {
        let fs = MemoryFs::new()
            .with_file("/p/file10.txt", "ten\n")
            .with_file("/p/file2.txt", "two\n")
            .with_file("/p/Alpha.md", "# a\n")
            .with_file("/p/logo.png", "not really a png")
            .with_file("/p/blob.dat", [0u8, 1, 2, 3])
            .with_file("/p/.git/config", "[core]\n")
            .with_file("/p/src/skip/x.rs", "x\n")
            .with_file("/p/src/keep.rs", "k\n");

        let options = DumpOptions::with_selections([".", "!src/skip"]);
        let selector = FileSelector::new(&fs, &options);
        let files = selector.select(Path::new("/p")).unwrap();
        assert_eq!(
            files,
            vec!["Alpha.md", "file2.txt", "file10.txt", "src/keep.rs"]
        );
    }

    #[test]
    fn test_select_skips_hidden_unless_named() {
        let fs = MemoryFs::new()
            .with_file("/p/.env", "TOKEN=1\n")
            .with_file("/p/.config/app.toml", "a = 1\n")
            .with_file("/p/src/.keep", "\n")
            .with_file("/p/src/main.rs", "fn main() {}\n");

        let options = DumpOptions::default();
        let files = FileSelector::new(&fs, &options).select(Path::new("/p")).unwrap();
        assert_eq!(files, vec!["src/main.rs"]);

        let options = DumpOptions::with_selections([".", ".config"]);
        let files = FileSelector::new(&fs, &options).select(Path::new("/p")).unwrap();
        assert_eq!(files, vec![".config/app.toml", "src/main.rs"]);

        let mut options = DumpOptions::default();
        options.include_hidden = true;
        let files = FileSelector::new(&fs, &options).select(Path::new("/p")).unwrap();
        assert_eq!(files, vec![".config/app.toml", ".env", "src/.keep", "src/main.rs"]);
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(".env"));
        assert!(is_hidden("a/.cache/b.txt"));
        assert!(!is_hidden("a/b.txt"));
        assert!(!is_hidden("."));
    }

    #[test]
    fn test_select_respects_size_limit() {
        let big = vec![b'a'; 2 * 1024 * 1024];
        let fs = MemoryFs::new()
            .with_file("/p/big.txt", &big)
            .with_file("/p/small.txt", "s\n");

        let mut options = DumpOptions::default();
        options.max_size_mb = 1;
        let files = FileSelector::new(&fs, &options).select(Path::new("/p")).unwrap();
        assert_eq!(files, vec!["small.txt"]);

        options.skip_large_files = false;
        let files = FileSelector::new(&fs, &options).select(Path::new("/p")).unwrap();
        assert_eq!(files, vec!["big.txt", "small.txt"]);
    }

    #[test]
    fn test_select_nothing_when_no_inclusion() {
        let fs = MemoryFs::new().with_file("/p/a.txt", "a\n");
        let options = DumpOptions::with_selections(Vec::<String>::new());
        let files = FileSelector::new(&fs, &options).select(Path::new("/p")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_select_unreadable_root_fails() {
        let fs = MemoryFs::new();
        let options = DumpOptions::default();
        assert!(FileSelector::new(&fs, &options)
            .select(Path::new("/missing"))
            .is_err());
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/p"), Path::new("/p/a/b.txt")).as_deref(),
            Some("a/b.txt")
        );
        assert_eq!(relative_path(Path::new("/p"), Path::new("/q/a.txt")), None);
    }
}
