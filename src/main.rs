/*!
 * Command-line interface for DumpUndump
 */

use std::fs;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use tracing::Level;

use dumpundump::config::{Args, Command, DumpConfig, UndumpConfig};
use dumpundump::error::ResultExt;
use dumpundump::fs::{LocalFs, SystemClock};
use dumpundump::report::{DumpSummary, Reporter};
use dumpundump::{Dumper, Undumper};

fn main() -> io::Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.generate {
        let mut cmd = Args::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match args.command {
        Some(Command::Dump(dump_args)) => run_dump(DumpConfig::from_args(dump_args)),
        Some(Command::Undump(undump_args)) => run_undump(UndumpConfig::from_args(undump_args)),
        None => {
            Args::command().print_help()?;
            Ok(())
        }
    }
}

fn run_dump(config: DumpConfig) -> io::Result<()> {
    config.validate()?;

    // Configure thread pool
    if let Err(e) = ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()
    {
        tracing::warn!("Failed to set thread pool size: {}", e);
    }

    let progress = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:.bold.cyan} {wide_msg:.dim.white} {pos}/{len} ({percent}%) ⏱️  {elapsed_precise}")
    {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_message(format!("📂 {}", config.target_dir.display()));

    let local_fs = LocalFs::new().respect_gitignore(config.respect_gitignore);
    let dumper = Dumper::new(&local_fs, &SystemClock, Arc::new(progress.clone()));

    let start_time = Instant::now();
    let result = dumper.dump(&config.target_dir, &config.options)?;
    let duration = start_time.elapsed();
    progress.finish_and_clear();

    let output = match &config.output_file {
        Some(path) => {
            fs::write(path, &result.text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path.display().to_string()
        }
        None => {
            print!("{}", result.text);
            "stdout".to_string()
        }
    };

    let summary = DumpSummary::new(output, duration, &result);
    let reporter = Reporter::new(config.format);
    eprintln!("\n{}", reporter.render_dump(&summary)?);

    Ok(())
}

fn run_undump(config: UndumpConfig) -> io::Result<()> {
    config.validate()?;

    let text = if config.reads_stdin() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .with_context(|| "Failed to read dump from stdin")?;
        buffer
    } else {
        fs::read_to_string(&config.input)
            .with_context(|| format!("Failed to read {}", config.input))?
    };

    let local_fs = LocalFs::new();
    let report = Undumper::new(&local_fs, &SystemClock)
        .dry_run(config.dry_run)
        .make_backups(config.make_backups)
        .undump(&text, &config.target_dir);

    let reporter = Reporter::new(config.format);
    println!("{}", reporter.render_undump(&report, config.dry_run)?);

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
