/*!
 * Configuration handling for dumpundump
 */

use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::error::Result;
use crate::utils::{DEFAULT_BINARY_EXTENSIONS, DEFAULT_EXCLUDED_DIRS};
use crate::{bail, ensure};

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

/// Command-line arguments for dumpundump
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "dumpundump",
    version = env!("CARGO_PKG_VERSION"),
    about = "Dump a directory of text files into one document and apply it back",
    long_about = "Serializes a directory of text files into one self-describing document (dump) and writes files back from such a document (undump), either by full replacement or by applying embedded unified diffs."
)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Option<Command>,

    /// Enable debug logging on stderr
    #[clap(long, global = true)]
    pub verbose: bool,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serialize a directory into a dump document
    Dump(DumpArgs),
    /// Apply a dump document to a directory
    Undump(UndumpArgs),
}

/// Arguments for `dump`
#[derive(ClapArgs, Debug, Clone)]
pub struct DumpArgs {
    /// Directory to dump
    #[clap(default_value = ".")]
    pub directory_path: String,

    /// Write the document to this file instead of stdout
    #[clap(short, long)]
    pub output: Option<String>,

    /// Comma-separated relative paths to include; prefix with '!' to exclude
    #[clap(long, value_delimiter = ',', default_value = ".")]
    pub select: Vec<String>,

    /// Comma-separated directory names never descended into (replaces the defaults)
    #[clap(long, value_delimiter = ',')]
    pub exclude_dirs: Vec<String>,

    /// Comma-separated extensions treated as binary (replaces the defaults)
    #[clap(long, value_delimiter = ',')]
    pub binary_exts: Vec<String>,

    /// Largest file to include, in megabytes
    #[clap(long, default_value = "10")]
    pub max_size_mb: u64,

    /// Include files of any size
    #[clap(long)]
    pub no_size_limit: bool,

    /// Include dotfiles and files under dot-directories
    #[clap(long)]
    pub include_hidden: bool,

    /// Respect .gitignore files
    #[clap(long)]
    pub respect_gitignore: bool,

    /// Number of threads to use for processing
    #[clap(long, default_value = "4")]
    pub threads: usize,

    /// Summary format printed on stderr
    #[clap(long, value_enum, default_value_t = OutputFormat::default())]
    pub format: OutputFormat,
}

/// Arguments for `undump`
#[derive(ClapArgs, Debug, Clone)]
pub struct UndumpArgs {
    /// Dump document to read ('-' for stdin)
    pub input: String,

    /// Directory to write into
    #[clap(default_value = ".")]
    pub directory_path: String,

    /// Report what would change without touching the filesystem
    #[clap(long)]
    pub dry_run: bool,

    /// Keep a timestamped copy of every file before it is overwritten or deleted
    #[clap(long)]
    pub backup: bool,

    /// Report format
    #[clap(long, value_enum, default_value_t = OutputFormat::default())]
    pub format: OutputFormat,
}

/// Rules deciding which files enter a dump
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpOptions {
    /// Relative paths to include; `!`-prefixed entries exclude a path or subtree
    pub selections: Vec<String>,

    /// Drop files larger than `max_size_mb`
    pub skip_large_files: bool,

    /// Size limit in megabytes
    pub max_size_mb: u64,

    /// Lower-case extensions that are never dumped
    pub binary_extensions: Vec<String>,

    /// Directory names (or glob patterns) never descended into
    pub excluded_dirs: Vec<String>,

    /// Dump hidden entries even when no selection names them
    pub include_hidden: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            selections: vec![".".to_string()],
            skip_large_files: true,
            max_size_mb: 10,
            binary_extensions: DEFAULT_BINARY_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            include_hidden: false,
        }
    }
}

impl DumpOptions {
    /// Options selecting exactly the given paths
    pub fn with_selections<I, S>(selections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selections: selections.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Size limit in bytes, if enabled
    pub fn max_bytes(&self) -> Option<u64> {
        self.skip_large_files
            .then(|| self.max_size_mb.saturating_mul(1024 * 1024))
    }
}

/// Configuration of a dump run
#[derive(Clone, Debug)]
pub struct DumpConfig {
    /// Directory to dump
    pub target_dir: PathBuf,

    /// Output file; stdout when absent
    pub output_file: Option<PathBuf>,

    /// Selection rules
    pub options: DumpOptions,

    /// Whether to respect .gitignore files
    pub respect_gitignore: bool,

    /// Number of threads to use for processing
    pub num_threads: usize,

    /// Summary format
    pub format: OutputFormat,
}

impl DumpConfig {
    /// Create configuration from command-line arguments
    pub fn from_args(args: DumpArgs) -> Self {
        let defaults = DumpOptions::default();
        let target_dir = PathBuf::from(&args.directory_path);
        let output_file = args.output.map(PathBuf::from);

        let mut selections = args.select;
        // Don't dump the output file itself
        if let Some(rel) = output_file
            .as_deref()
            .and_then(|out| relative_to(&target_dir, out))
        {
            selections.push(format!("!{}", rel));
        }

        Self {
            options: DumpOptions {
                selections,
                skip_large_files: !args.no_size_limit,
                max_size_mb: args.max_size_mb,
                binary_extensions: if args.binary_exts.is_empty() {
                    defaults.binary_extensions
                } else {
                    args.binary_exts
                        .iter()
                        .map(|e| e.trim_start_matches('.').to_lowercase())
                        .collect()
                },
                excluded_dirs: if args.exclude_dirs.is_empty() {
                    defaults.excluded_dirs
                } else {
                    args.exclude_dirs
                },
                include_hidden: args.include_hidden,
            },
            target_dir,
            output_file,
            respect_gitignore: args.respect_gitignore,
            num_threads: args.threads,
            format: args.format,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.target_dir.is_dir() {
            bail!(
                PathNotFound,
                "Target directory not found: {}",
                self.target_dir.display()
            );
        }

        if let Some(parent) = self.output_file.as_deref().and_then(Path::parent) {
            ensure!(
                parent.as_os_str().is_empty() || parent.exists(),
                PathNotFound,
                "Output directory not found: {}",
                parent.display()
            );
        }

        ensure!(
            self.num_threads > 0,
            InvalidArgument,
            "thread count must be at least 1"
        );
        ensure!(
            !self.options.selections.iter().all(|s| s.starts_with('!')),
            Config,
            "at least one path must be selected"
        );

        Ok(())
    }
}

/// Configuration of an undump run
#[derive(Clone, Debug)]
pub struct UndumpConfig {
    /// Dump document path, or `-` for stdin
    pub input: String,

    /// Directory to write into
    pub target_dir: PathBuf,

    /// Compute decisions without mutating the filesystem
    pub dry_run: bool,

    /// Back up files before replacing or deleting them
    pub make_backups: bool,

    /// Report format
    pub format: OutputFormat,
}

impl UndumpConfig {
    /// Create configuration from command-line arguments
    pub fn from_args(args: UndumpArgs) -> Self {
        Self {
            input: args.input,
            target_dir: PathBuf::from(args.directory_path),
            dry_run: args.dry_run,
            make_backups: args.backup,
            format: args.format,
        }
    }

    /// Whether the document comes from stdin
    pub fn reads_stdin(&self) -> bool {
        self.input == "-"
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.target_dir.is_dir(),
            PathNotFound,
            "Target directory not found: {}",
            self.target_dir.display()
        );
        ensure!(
            self.reads_stdin() || Path::new(&self.input).is_file(),
            PathNotFound,
            "Dump file not found: {}",
            self.input
        );
        Ok(())
    }
}

/// Slash-separated path of `path` inside `root`, if it lies there
fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let root = std::fs::canonicalize(root).ok()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let full = std::fs::canonicalize(parent).ok()?.join(path.file_name()?);
    let rel = full.strip_prefix(&root).ok()?;
    Some(
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
    )
}
