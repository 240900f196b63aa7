/*!
 * Utility functions for dumpundump
 */

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use glob_match::glob_match;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

/// Format a human-readable file size
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

/// Hex SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Newline count + 1; an empty file still has one line
pub fn count_lines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count() + 1
}

/// ISO-8601 timestamp with millisecond precision
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Check a directory name against excluded-directory patterns
pub fn is_excluded_dir(name: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|p| p == name || glob_match(p, name))
}

/// Case-insensitive, numeric-aware comparison (`file2` < `file10`)
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ln = take_number(&mut left);
                let rn = take_number(&mut right);
                let l_trim = ln.trim_start_matches('0');
                let r_trim = rn.trim_start_matches('0');
                let ord = l_trim
                    .len()
                    .cmp(&r_trim.len())
                    .then_with(|| l_trim.cmp(r_trim));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = Iterator::cmp(l.to_lowercase(), r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }

    // Equal ignoring case; fall back to a byte comparison for a total order
    a.cmp(b)
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

/// Extensions that are never dumped
pub static DEFAULT_BINARY_EXTENSIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // Images
        "png", "jpg", "jpeg", "gif", "webp", "ico", "icns", "heic", "heif",
        // Documents & archives
        "pdf", "zip", "rar", "7z", "dmg",
        // Fonts
        "ttf", "otf",
        // Audio & video
        "mp3", "wav", "aiff", "mp4", "mov", "avi", "m4a", "m4v",
        // Xcode artifacts
        "xcassets", "xcuserstate",
        // Compiled objects
        "bin", "so", "dylib", "a", "o", "class", "jar", "war", "ipa",
    ]
});

/// Directory names that are never descended into
pub static DEFAULT_EXCLUDED_DIRS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // Version Control
        ".git",
        ".svn",
        ".hg",
        // Apple / Xcode
        "DerivedData",
        ".build",
        "Pods",
        "Carthage",
        ".swiftpm",
        "*.xcworkspace",
        "xcuserdata",
        // Build & Dist
        "build",
        "Build",
        "dist",
        "out",
        "target",
        // Dependencies
        "node_modules",
        "NodeModules",
        // IDEs & Editors
        ".idea",
        ".vscode",
        ".vs",
        // Caches
        ".cache",
        ".dccache",
        ".gradle",
        ".gitlab",
        ".next",
        ".nuxt",
        "__pycache__",
        ".mypy_cache",
        ".pytest_cache",
        ".dart_tool",
        "coverage",
        // Python
        ".venv",
        "venv",
        // Unreal / Unity
        "Binaries",
        "Intermediate",
        "Saved",
        "DerivedDataCache",
        "Library",
        "Temp",
        "Obj",
        "Logs",
    ]
});
