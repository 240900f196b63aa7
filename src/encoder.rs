/*!
 * Dump document encoder
 *
 * Per-file work (reading, hashing, line counting, language tagging) runs in
 * parallel; everything order-sensitive happens after the results are
 * collected back in index order.
 */

use std::path::Path;
use std::sync::Arc;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::fs::FileSystem;
use crate::types::{DumpDocument, DumpHeader, FileRecord};
use crate::utils::{count_lines, sha256_hex};

/// Version written into the `FORMAT:` header
pub const FORMAT_VERSION: &str = "v3";

/// Encoding name recorded for every file
pub const DEFAULT_ENCODING: &str = "utf8";

const TOC_HEADER: &str = "INDEX  BYTES  LINES  EXT  RELATIVE_PATH";

/// Language tag for a file extension, empty when unknown
pub fn language_tag(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "rs" => "rust",
        "swift" => "swift",
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" => "typescript",
        "tsx" => "tsx",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "dart" => "dart",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "m" => "objectivec",
        "mm" => "objectivecpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" | "zsh" => "bash",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" | "plist" => "xml",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sql" => "sql",
        "md" | "markdown" => "markdown",
        _ => "",
    }
}

/// Shortest backtick fence that no line of `body` could close early
pub fn fence_for(body: &str) -> String {
    let mut fence = "```".to_string();
    while body.lines().any(|line| line.trim_end() == fence) {
        fence.push('`');
    }
    fence
}

/// One encoded file, before ordering
struct EncodedFile {
    record: FileRecord,
    body: String,
}

#[derive(Serialize)]
struct Manifest<'a> {
    files: &'a [FileRecord],
}

/// Turns a list of selected files into a dump document
pub struct DumpEncoder<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    progress: Arc<ProgressBar>,
}

impl<'a, F: FileSystem + ?Sized> DumpEncoder<'a, F> {
    /// Create an encoder reading through `fs`
    pub fn new(fs: &'a F, progress: Arc<ProgressBar>) -> Self {
        Self { fs, progress }
    }

    /// Encode `paths` (root-relative, already ordered) into a document
    ///
    /// A file that can no longer be read is encoded as empty. Only manifest
    /// serialization can fail.
    pub fn encode(
        &self,
        root: &Path,
        root_name: &str,
        paths: &[String],
        generated: &str,
    ) -> Result<DumpDocument> {
        self.progress.set_length(paths.len() as u64);

        // Indexed collection keeps input order whatever order workers finish in
        let files: Vec<EncodedFile> = paths
            .par_iter()
            .enumerate()
            .map(|(i, rel)| self.encode_file(root, i + 1, rel))
            .collect();

        let mut hasher = Sha256::new();
        for file in &files {
            hasher.update(file.record.hash.as_bytes());
        }
        let header = DumpHeader {
            root_name: root_name.to_string(),
            generated: generated.to_string(),
            files: files.len(),
            dump_sha256: hex::encode(hasher.finalize()),
        };

        let records: Vec<FileRecord> = files.iter().map(|f| f.record.clone()).collect();
        let mut text = render_header(&header);
        text.push_str("---BEGIN MANIFEST---\n");
        text.push_str(&serde_json::to_string(&Manifest { files: &records })?);
        text.push_str("\n---END MANIFEST---\n");
        text.push_str(&render_toc(&records));
        for file in &files {
            text.push_str(&render_section(&file.record, &file.body));
        }

        Ok(DumpDocument {
            header,
            records,
            text,
        })
    }

    fn encode_file(&self, root: &Path, index: usize, rel: &str) -> EncodedFile {
        self.progress.inc(1);
        self.progress.set_message(rel.to_string());

        let bytes = match self.fs.read(&root.join(rel)) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}; encoding as empty", rel, e);
                Vec::new()
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        let content_bytes = text.len();
        let mut body = text.into_owned();
        // The closing fence always starts its own line, and the hash covers
        // the body exactly as emitted between the fences
        if !body.ends_with('\n') {
            body.push('\n');
        }
        let ext = Path::new(rel)
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        EncodedFile {
            record: FileRecord {
                index,
                path: rel.to_string(),
                lang: language_tag(&ext).to_string(),
                ext,
                bytes: bytes.len(),
                lines: count_lines(&bytes),
                enc: DEFAULT_ENCODING.to_string(),
                hash: sha256_hex(body.as_bytes()),
                content_bytes,
            },
            body,
        }
    }
}

fn render_header(header: &DumpHeader) -> String {
    format!(
        "# {} FOLDER DUMP\nGenerated: {}\nFORMAT: {}\nFILES: {}\nEOL: lf\nENC_DEFAULT: {}\nNFC: true\nDUMP_SHA256: {}\n",
        header.root_name,
        header.generated,
        FORMAT_VERSION,
        header.files,
        DEFAULT_ENCODING,
        header.dump_sha256,
    )
}

fn render_toc(records: &[FileRecord]) -> String {
    let mut toc = String::from("---BEGIN TOC---\n");
    toc.push_str(TOC_HEADER);
    toc.push('\n');
    for r in records {
        toc.push_str(&format!(
            "{:<5}  {:<5}  {:<5}  {:<3}  {}\n",
            r.index, r.bytes, r.lines, r.ext, r.path
        ));
    }
    toc.push_str("---END TOC---\n");
    toc
}

fn render_section(record: &FileRecord, body: &str) -> String {
    let fence = fence_for(body);
    format!(
        "\n<<<FILE #{idx:04}>>>\nPATH: {path}\nEXT: {ext}\nBYTES: {bytes}\nLINES: {lines}\nHASH: {hash}\nENC: {enc}\nCONTENT_BYTES: {content}\n{fence}\n{body}{fence}\n<<<END FILE #{idx:04}>>>\n",
        idx = record.index,
        path = record.path,
        ext = record.ext,
        bytes = record.bytes,
        lines = record.lines,
        hash = record.hash,
        enc = record.enc,
        content = record.content_bytes,
    )
}
