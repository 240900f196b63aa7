/*!
 * Reporting for dump and undump runs
 *
 * Renders console tables with the tabled library, or JSON for scripting.
 */

use std::time::Duration;

use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::config::OutputFormat;
use crate::error::Result;
use crate::types::{DumpResult, FileRecord, UndumpReport};
use crate::utils::format_file_size;

/// Above this many files only the largest ones are listed
const FULL_LISTING_LIMIT: usize = 15;
const TOP_FILES: usize = 10;
const PATH_WIDTH: usize = 60;

/// Statistics for a finished dump
#[derive(Debug, Clone, Serialize)]
pub struct DumpSummary {
    /// Where the document went
    pub output: String,
    /// Wall time of selection plus encoding, in milliseconds
    pub duration_ms: u128,
    pub file_count: usize,
    pub total_bytes: usize,
    pub total_lines: usize,
    pub dump_sha256: String,
    pub files: Vec<FileRecord>,
}

impl DumpSummary {
    /// Summarize a dump result
    pub fn new(output: impl Into<String>, duration: Duration, result: &DumpResult) -> Self {
        Self {
            output: output.into(),
            duration_ms: duration.as_millis(),
            file_count: result.file_count,
            total_bytes: result.records.iter().map(|r| r.bytes).sum(),
            total_lines: result.records.iter().map(|r| r.lines).sum(),
            dump_sha256: result.dump_sha256.clone(),
            files: result.records.clone(),
        }
    }
}

#[derive(Serialize)]
struct UndumpJson<'a> {
    dry_run: bool,
    #[serde(flatten)]
    report: &'a UndumpReport,
}

/// Report generator
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    /// Create a new reporter
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format a number with human-readable units
    fn format_number(&self, num: usize) -> String {
        if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}K", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }

    /// Shorten a path to `max_len`, keeping its last segments
    fn format_path(&self, path: &str, max_len: usize) -> String {
        if path.chars().count() <= max_len {
            return path.to_string();
        }

        let mut segments = Vec::new();
        let mut len = 3; // "..."
        for part in path.split('/').rev() {
            let part_len = part.chars().count() + 1;
            if len + part_len > max_len {
                break;
            }
            segments.push(part);
            len += part_len;
        }

        if segments.is_empty() {
            // A single segment longer than the limit
            let tail: String = path
                .chars()
                .rev()
                .take(max_len.saturating_sub(3))
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return format!("...{}", tail);
        }

        let mut result = String::from("...");
        for part in segments.iter().rev() {
            result.push('/');
            result.push_str(part);
        }
        result
    }

    fn styled(&self, mut table: Table) -> String {
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));
        table.to_string()
    }

    /// Render a dump summary
    pub fn render_dump(&self, summary: &DumpSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
            OutputFormat::Table => Ok(self.dump_tables(summary)),
        }
    }

    /// Render an undump report
    pub fn render_undump(&self, report: &UndumpReport, dry_run: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&UndumpJson {
                dry_run,
                report,
            })?),
            OutputFormat::Table => Ok(self.undump_tables(report, dry_run)),
        }
    }

    fn dump_tables(&self, summary: &DumpSummary) -> String {
        #[derive(Tabled)]
        struct FileRow {
            #[tabled(rename = "#")]
            index: usize,
            #[tabled(rename = "File Path")]
            path: String,
            #[tabled(rename = "Size")]
            size: String,
            #[tabled(rename = "Lines")]
            lines: String,
        }

        #[derive(Tabled)]
        struct SummaryRow {
            #[tabled(rename = "Metric")]
            key: String,
            #[tabled(rename = "Value")]
            value: String,
        }

        let mut files: Vec<&FileRecord> = summary.files.iter().collect();
        let truncated = files.len() > FULL_LISTING_LIMIT;
        if truncated {
            files.sort_by(|a, b| b.bytes.cmp(&a.bytes));
            files.truncate(TOP_FILES);
        }

        let file_rows: Vec<FileRow> = files
            .iter()
            .map(|r| FileRow {
                index: r.index,
                path: self.format_path(&r.path, PATH_WIDTH),
                size: format_file_size(r.bytes as u64),
                lines: self.format_number(r.lines),
            })
            .collect();

        let summary_rows = vec![
            SummaryRow {
                key: "📂 Output".to_string(),
                value: summary.output.clone(),
            },
            SummaryRow {
                key: "⏱️ Process Time".to_string(),
                value: format!("{} ms", summary.duration_ms),
            },
            SummaryRow {
                key: "📄 Files".to_string(),
                value: self.format_number(summary.file_count),
            },
            SummaryRow {
                key: "📝 Total Lines".to_string(),
                value: self.format_number(summary.total_lines),
            },
            SummaryRow {
                key: "📦 Total Size".to_string(),
                value: format_file_size(summary.total_bytes as u64),
            },
            SummaryRow {
                key: "🔒 DUMP_SHA256".to_string(),
                value: summary.dump_sha256.clone(),
            },
        ];

        let files_title = if truncated {
            "📋  TOP 10 LARGEST FILES"
        } else {
            "📋  DUMPED FILES"
        };

        format!(
            "{}\n{}\n\n{}\n{}",
            files_title,
            self.styled(Table::new(file_rows)),
            "✅  DUMP COMPLETE",
            self.styled(Table::new(summary_rows))
        )
    }

    fn undump_tables(&self, report: &UndumpReport, dry_run: bool) -> String {
        #[derive(Tabled)]
        struct OutcomeRow {
            #[tabled(rename = "Outcome")]
            outcome: &'static str,
            #[tabled(rename = "File Path")]
            path: String,
        }

        #[derive(Tabled)]
        struct IssueRow {
            #[tabled(rename = "File Path")]
            path: String,
            #[tabled(rename = "Problem")]
            message: String,
        }

        let groups: [(&'static str, &Vec<String>); 4] = [
            ("created", &report.created),
            ("updated", &report.updated),
            ("skipped", &report.skipped),
            ("failed", &report.failed),
        ];
        let outcome_rows: Vec<OutcomeRow> = groups
            .iter()
            .flat_map(|&(outcome, paths)| {
                paths.iter().map(move |p| OutcomeRow {
                    outcome,
                    path: self.format_path(p, PATH_WIDTH),
                })
            })
            .collect();

        let title = if dry_run {
            "🧪  UNDUMP DRY RUN"
        } else {
            "✅  UNDUMP COMPLETE"
        };
        let summary = match report.summary() {
            s if s.is_empty() => "Nothing to do".to_string(),
            s => s,
        };

        let mut out = format!(
            "{}\n{}\n{}",
            title,
            self.styled(Table::new(outcome_rows)),
            summary
        );

        if !report.issues.is_empty() {
            let issue_rows: Vec<IssueRow> = report
                .issues
                .iter()
                .map(|i| IssueRow {
                    path: self.format_path(&i.path, PATH_WIDTH),
                    message: i.message.clone(),
                })
                .collect();
            out.push_str(&format!(
                "\n\n{}\n{}",
                "⚠️  ISSUES",
                self.styled(Table::new(issue_rows))
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, path: &str, bytes: usize) -> FileRecord {
        FileRecord {
            index,
            path: path.to_string(),
            ext: "txt".to_string(),
            bytes,
            lines: 1,
            lang: String::new(),
            enc: "utf8".to_string(),
            hash: "0".repeat(64),
            content_bytes: bytes,
        }
    }

    fn dump_result(records: Vec<FileRecord>) -> DumpResult {
        DumpResult {
            text: String::new(),
            file_count: records.len(),
            records,
            dump_sha256: "f".repeat(64),
        }
    }

    #[test]
    fn test_format_path() {
        let reporter = Reporter::new(OutputFormat::Table);
        assert_eq!(reporter.format_path("a/b.txt", 20), "a/b.txt");
        assert_eq!(
            reporter.format_path("very/long/directory/name/file.txt", 20),
            ".../name/file.txt"
        );
        assert_eq!(reporter.format_path("abcdefghijkl", 8), "...hijkl");
    }

    #[test]
    fn test_dump_table_lists_top_files_when_many() {
        let records: Vec<FileRecord> = (1..=20)
            .map(|i| record(i, &format!("file{}.txt", i), i * 100))
            .collect();
        let summary = DumpSummary::new("stdout", Duration::from_millis(5), &dump_result(records));
        let out = Reporter::new(OutputFormat::Table).render_dump(&summary).unwrap();

        assert!(out.contains("TOP 10 LARGEST FILES"));
        assert!(out.contains("file20.txt"));
        assert!(!out.contains("file1.txt "));
        assert!(out.contains("DUMP COMPLETE"));
        assert_eq!(summary.total_bytes, (1..=20).map(|i| i * 100).sum::<usize>());
    }

    #[test]
    fn test_dump_json() {
        let summary = DumpSummary::new(
            "out.txt",
            Duration::from_millis(1),
            &dump_result(vec![record(1, "a.txt", 3)]),
        );
        let out = Reporter::new(OutputFormat::Json).render_dump(&summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["file_count"], 1);
        assert_eq!(value["files"][0]["path"], "a.txt");
    }

    #[test]
    fn test_undump_table_and_json() {
        let mut report = UndumpReport::default();
        report.created.push("new.txt".into());
        report.fail("bad.txt", "context mismatch");

        let table = Reporter::new(OutputFormat::Table)
            .render_undump(&report, true)
            .unwrap();
        assert!(table.contains("UNDUMP DRY RUN"));
        assert!(table.contains("new.txt"));
        assert!(table.contains("Created: 1 • Failed: 1"));
        assert!(table.contains("context mismatch"));

        let json = Reporter::new(OutputFormat::Json)
            .render_undump(&report, false)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dry_run"], false);
        assert_eq!(value["failed"][0], "bad.txt");
        assert_eq!(value["issues"][0]["message"], "context mismatch");
    }
}
