/*!
 * Tests for DumpUndump round trips
 */

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use indicatif::ProgressBar;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

use crate::config::DumpOptions;
use crate::decoder::parse_sections;
use crate::dump::Dumper;
use crate::fs::{FixedClock, LocalFs, MemoryFs, SystemClock};
use crate::types::{DumpResult, UndumpReport};
use crate::undump::Undumper;
use crate::utils::sha256_hex;

// Helper function to create a test directory structure
fn setup_test_directory() -> io::Result<tempfile::TempDir> {
    let temp_dir = tempdir()?;

    fs::create_dir(temp_dir.path().join("dir1"))?;
    fs::create_dir(temp_dir.path().join("dir1").join("subdir"))?;

    let mut file1 = File::create(temp_dir.path().join("file1.txt"))?;
    writeln!(file1, "This is a text file with content")?;

    let mut file2 = File::create(temp_dir.path().join("dir1").join("file2.txt"))?;
    writeln!(file2, "This is another text file\nwith multiple lines")?;

    let mut file3 = File::create(temp_dir.path().join("dir1").join("subdir").join("file10.md"))?;
    write!(file3, "# Notes\n```sh\nls\n```\nno trailing newline")?;

    // Excluded directory
    fs::create_dir(temp_dir.path().join(".git"))?;
    let mut git_file = File::create(temp_dir.path().join(".git").join("config"))?;
    writeln!(git_file, "[core]\n\trepositoryformatversion = 0")?;

    // Binary content without a binary extension
    let mut bin_file = File::create(temp_dir.path().join("blob.dat"))?;
    bin_file.write_all(&[0u8, 1u8, 2u8, 3u8])?;

    // Never followed
    #[cfg(not(target_os = "windows"))]
    std::os::unix::fs::symlink(
        temp_dir.path().join("file1.txt"),
        temp_dir.path().join("symlink.txt"),
    )?;

    Ok(temp_dir)
}

fn dump_dir(root: &Path) -> DumpResult {
    let fs = LocalFs::new();
    Dumper::new(&fs, &SystemClock, Arc::new(ProgressBar::hidden()))
        .dump(root, &DumpOptions::default())
        .unwrap()
}

fn undump_dir(text: &str, root: &Path, dry_run: bool) -> UndumpReport {
    let fs = LocalFs::new();
    Undumper::new(&fs, &SystemClock)
        .dry_run(dry_run)
        .undump(text, root)
}

/// Lines between two marker lines, exclusive
fn block<'a>(text: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    text.lines()
        .skip_while(|l| *l != begin)
        .skip(1)
        .take_while(|l| *l != end)
        .collect()
}

fn header_value<'a>(text: &'a str, key: &str) -> &'a str {
    text.lines()
        .find_map(|l| l.strip_prefix(key))
        .unwrap_or_default()
        .trim()
}

#[test]
fn test_dump_selects_text_files_in_natural_order() {
    let temp_dir = setup_test_directory().unwrap();
    let result = dump_dir(temp_dir.path());

    let paths: Vec<String> = parse_sections(&result.text)
        .into_iter()
        .map(|s| s.path)
        .collect();
    assert_eq!(
        paths,
        vec!["dir1/file2.txt", "dir1/subdir/file10.md", "file1.txt"]
    );
    assert_eq!(result.file_count, 3);
}

#[test]
fn test_counts_agree() {
    let temp_dir = setup_test_directory().unwrap();
    let result = dump_dir(temp_dir.path());
    let text = &result.text;

    let files: usize = header_value(text, "FILES:").parse().unwrap();
    let manifest: serde_json::Value =
        serde_json::from_str(block(text, "---BEGIN MANIFEST---", "---END MANIFEST---")[0]).unwrap();
    let toc_rows = block(text, "---BEGIN TOC---", "---END TOC---").len() - 1;
    let sections = parse_sections(text).len();

    assert_eq!(files, 3);
    assert_eq!(manifest["files"].as_array().unwrap().len(), files);
    assert_eq!(toc_rows, files);
    assert_eq!(sections, files);
}

#[test]
fn test_hashes_match_section_bodies() {
    let temp_dir = setup_test_directory().unwrap();
    let result = dump_dir(temp_dir.path());
    let sections = parse_sections(&result.text);

    let mut aggregate = Sha256::new();
    for (record, section) in result.records.iter().zip(&sections) {
        assert_eq!(record.path, section.path);
        assert_eq!(sha256_hex(section.body.as_bytes()), record.hash);
        aggregate.update(record.hash.as_bytes());
    }

    let expected = hex::encode(aggregate.finalize());
    assert_eq!(result.dump_sha256, expected);
    assert_eq!(header_value(&result.text, "DUMP_SHA256:"), expected);
}

#[test]
fn test_section_paths_are_relative() {
    let temp_dir = setup_test_directory().unwrap();
    let result = dump_dir(temp_dir.path());

    for section in parse_sections(&result.text) {
        assert!(!section.path.starts_with('/'));
        assert!(!section.path.contains('\\'));
        assert!(!section.path.split('/').any(|s| s == ".."));
    }
}

#[test]
fn test_round_trip_into_empty_directory() {
    let source = setup_test_directory().unwrap();
    let result = dump_dir(source.path());

    let target = tempdir().unwrap();
    let report = undump_dir(&result.text, target.path(), false);
    assert_eq!(report.created.len(), 3);
    assert!(report.failed.is_empty());

    assert_eq!(
        fs::read_to_string(target.path().join("dir1/file2.txt")).unwrap(),
        "This is another text file\nwith multiple lines\n"
    );
    assert_eq!(
        fs::read_to_string(target.path().join("dir1/subdir/file10.md")).unwrap(),
        "# Notes\n```sh\nls\n```\nno trailing newline\n"
    );
}

#[test]
fn test_undump_is_idempotent() {
    let temp_dir = setup_test_directory().unwrap();
    let result = dump_dir(temp_dir.path());

    undump_dir(&result.text, temp_dir.path(), false);
    let second = undump_dir(&result.text, temp_dir.path(), false);

    assert!(second.created.is_empty());
    assert!(second.updated.is_empty());
    assert_eq!(second.skipped.len(), result.file_count);
}

#[test]
fn test_dump_of_unchanged_tree_is_all_skipped() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("a.txt"), "a\n").unwrap();
    fs::write(temp_dir.path().join("empty.txt"), "").unwrap();

    let result = dump_dir(temp_dir.path());
    let report = undump_dir(&result.text, temp_dir.path(), false);

    // An empty file comes back as a single newline, never as a deletion
    assert_eq!(report.skipped, vec!["a.txt", "empty.txt"]);
    assert!(report.updated.is_empty());
    assert_eq!(fs::read(temp_dir.path().join("empty.txt")).unwrap(), b"");
}

#[test]
fn test_scenario_binary_extension_excluded() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("a.txt"), "hello\n").unwrap();
    fs::write(temp_dir.path().join("b.png"), [0x89, b'P', b'N', b'G', 13, 10, 26, 10]).unwrap();

    let result = dump_dir(temp_dir.path());
    let sections = parse_sections(&result.text);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].path, "a.txt");
}

#[test]
fn test_scenario_diff_updates_readme() {
    let temp_dir = tempdir().unwrap();
    let readme = temp_dir.path().join("README.md");
    fs::write(&readme, "Hello\nLine 2\nLine 3\n").unwrap();

    let doc = "<<<FILE #0001>>>
PATH: README.md
```diff
--- a/README.md
+++ b/README.md
@@ -1,3 +1,3 @@
-Hello
+Hello, world!
 Line 2
 Line 3
```
<<<END FILE #0001>>>
";
    let report = undump_dir(doc, temp_dir.path(), false);
    assert_eq!(report.updated, vec!["README.md"]);
    assert_eq!(
        fs::read_to_string(&readme).unwrap(),
        "Hello, world!\nLine 2\nLine 3\n"
    );

    // Same diff again no longer matches the file
    let again = undump_dir(doc, temp_dir.path(), false);
    assert_eq!(again.failed, vec!["README.md"]);
}

#[test]
fn test_scenario_context_mismatch_leaves_file() {
    let fs = MemoryFs::new().with_file("/root/README.md", "HELLO\nLine 2\nLine 3\n");
    let clock = FixedClock::default();
    let doc = "<<<FILE #1>>>
PATH: README.md
```diff
--- a/README.md
+++ b/README.md
@@ -1,3 +1,3 @@
-Hello
+Hello, world!
 Line 2
 Line 3
```
<<<END FILE #1>>>
";
    let report = Undumper::new(&fs, &clock).undump(doc, Path::new("/root"));

    assert_eq!(report.failed, vec!["README.md"]);
    assert!(report.updated.is_empty());
    assert!(report.issues[0]
        .message
        .contains("context mismatch at line 1: expected \"Hello\", found \"HELLO\""));
    assert_eq!(
        fs.text("/root/README.md").as_deref(),
        Some("HELLO\nLine 2\nLine 3\n")
    );
}

#[test]
fn test_scenario_empty_body_deletes() {
    let temp_dir = tempdir().unwrap();
    let victim = temp_dir.path().join("old.txt");
    fs::write(&victim, "old\n").unwrap();
    let doc = "<<<FILE #1>>>\nPATH: old.txt\n```\n```\n<<<END FILE #1>>>\n";

    let dry = undump_dir(doc, temp_dir.path(), true);
    assert_eq!(dry.updated, vec!["old.txt"]);
    assert!(victim.exists());

    let real = undump_dir(doc, temp_dir.path(), false);
    assert_eq!(real.updated, vec!["old.txt"]);
    assert!(!victim.exists());
}

#[test]
fn test_scenario_multi_file_diff_rejected() {
    let fs = MemoryFs::new().with_file("/root/a.txt", "a\n");
    let clock = FixedClock::default();
    let doc = "<<<FILE #1>>>
PATH: a.txt
```diff
diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1 +1 @@
-a
+b
diff --git a/b.txt b/b.txt
--- a/b.txt
+++ b/b.txt
@@ -1 +1 @@
-x
+y
```
<<<END FILE #1>>>
";
    let report = Undumper::new(&fs, &clock).undump(doc, Path::new("/root"));
    assert_eq!(report.failed, vec!["a.txt"]);
    assert!(report.issues[0].message.contains("more than one file"));
    assert_eq!(fs.text("/root/a.txt").as_deref(), Some("a\n"));
}

#[test]
fn test_dry_run_does_not_mutate() {
    let source = setup_test_directory().unwrap();
    let result = dump_dir(source.path());

    let target = tempdir().unwrap();
    let report = undump_dir(&result.text, target.path(), true);
    assert_eq!(report.created.len(), 3);
    assert_eq!(fs::read_dir(target.path()).unwrap().count(), 0);
}

#[test]
fn test_backups_are_taken_before_replacement() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("notes.md"), "old\n").unwrap();
    let doc = "<<<FILE #1>>>\nPATH: notes.md\n```\nnew\n```\n<<<END FILE #1>>>\n";

    let fs_impl = LocalFs::new();
    let report = Undumper::new(&fs_impl, &SystemClock)
        .make_backups(true)
        .undump(doc, temp_dir.path());
    assert_eq!(report.updated, vec!["notes.md"]);

    let backups: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("notes.bak-"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert!(backups[0].ends_with(".md"));
    assert!(!backups[0].contains(':'));
    assert_eq!(
        fs::read_to_string(temp_dir.path().join(&backups[0])).unwrap(),
        "old\n"
    );
}

#[test]
fn test_failure_on_one_path_does_not_stop_others() {
    let fs = MemoryFs::new()
        .with_file("/root/locked.txt", "old\n")
        .with_file("/root/free.txt", "old\n");
    fs.fail_writes_to("/root/locked.txt");
    let clock = FixedClock::default();

    let doc = "<<<FILE #1>>>
PATH: locked.txt
```
new
```
<<<END FILE #1>>>
<<<FILE #2>>>
PATH: ../escape.txt
```
x
```
<<<END FILE #2>>>
<<<FILE #3>>>
PATH: free.txt
```
new
```
<<<END FILE #3>>>
";
    let report = Undumper::new(&fs, &clock).undump(doc, Path::new("/root"));
    assert_eq!(report.failed, vec!["locked.txt"]);
    assert_eq!(report.skipped, vec!["../escape.txt"]);
    assert_eq!(report.updated, vec!["free.txt"]);
    assert_eq!(report.issues.len(), 2);
    assert_eq!(fs.text("/root/free.txt").as_deref(), Some("new\n"));
}
