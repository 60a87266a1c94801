use anyhow::Result;
use clap::Parser;
use dircull_common::{default_cache_dir, ensure_config, Bucket, NamePolicy, RunConfig};
use dircull_core::{Pipeline, Progress, RunReport};
use indicatif::ProgressBar;
use serde::Serialize;
use std::cell::RefCell;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dircull")]
#[command(author = "Dircull Contributors")]
#[command(version = "0.1.0")]
#[command(
    about = "Compare two directory trees by file name and quarantine the differences",
    long_about = None
)]
struct Cli {
    /// First folder with files
    dir1: PathBuf,

    /// Second folder with files
    dir2: PathBuf,

    /// Folder name quarantined files are moved to
    #[arg(short = 't', long)]
    trash_dir: Option<String>,

    /// Directory under which quarantine folders are created
    #[arg(long, default_value = ".")]
    trash_root: PathBuf,

    /// Use one quarantine folder per source tree
    #[arg(short = 's', long)]
    separate_trash: bool,

    /// Files with the same name but different extensions are considered different
    #[arg(short = 'f', long)]
    force_extension: bool,

    /// Re-hash files matched by name and quarantine pairs whose content differs
    #[arg(short = 'c', long)]
    verify_content: bool,

    /// Plan and report without moving anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Ignore patterns (can be specified multiple times)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Digest cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Output the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    // Logs go to stderr so JSON output stays clean on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(clean) => {
            if !clean {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Run failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns true when every planned relocation succeeded
fn run(cli: Cli) -> Result<bool> {
    let loaded = ensure_config(false)?;
    let app_config = loaded.config;

    let mut config = RunConfig::new(cli.dir1.clone(), cli.dir2.clone());
    config.trash_root = cli.trash_root;
    config.trash_name = cli
        .trash_dir
        .or(app_config.trash_dir)
        .unwrap_or_else(|| String::from("trash_files"));
    config.separate_trash = cli.separate_trash;
    config.policy = if cli.force_extension {
        NamePolicy::FullName
    } else {
        NamePolicy::Stem
    };
    config.verify_content = cli.verify_content || app_config.verify_content;
    config.dry_run = cli.dry_run;
    config.ignore_patterns = app_config.ignore_patterns;
    config.ignore_patterns.extend(cli.ignore);

    if config.verify_content {
        config.cache_dir = match cli.cache_dir.or(app_config.cache_dir) {
            Some(dir) => Some(dir),
            None => Some(default_cache_dir(loaded.portable, &loaded.path)?),
        };
    }

    info!("Comparing:");
    info!("  First:  {}", cli.dir1.display());
    info!("  Second: {}", cli.dir2.display());

    let progress: Box<dyn Progress> = if !cli.json && std::io::stderr().is_terminal() {
        Box::new(CliProgress::new())
    } else {
        Box::new(dircull_core::NoProgress)
    };

    let pipeline = Pipeline::new(config);
    let report = pipeline.run(progress.as_ref())?;

    if cli.json {
        let output = serde_json::to_string_pretty(&build_json_report(&cli.dir1, &cli.dir2, &report))?;
        println!("{output}");
    } else {
        print_report(&report, cli.dry_run);
    }

    Ok(!report.has_failures())
}

/// Progress bar driven by the pipeline's phase callbacks
struct CliProgress {
    bar: RefCell<Option<ProgressBar>>,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            bar: RefCell::new(None),
        }
    }
}

impl Progress for CliProgress {
    fn begin(&self, phase: &str, total: u64) {
        let bar = ProgressBar::new(total);
        bar.set_message(phase.to_string());
        *self.bar.borrow_mut() = Some(bar);
    }

    fn inc(&self, n: u64) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            bar.inc(n);
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        }
    }
}

fn print_report(report: &RunReport, dry_run: bool) {
    let verb = if dry_run { "Would move" } else { "Moved" };

    println!("\n{}", "=".repeat(80));
    println!("Run Results");
    println!("{}", "=".repeat(80));

    for outcome in report.outcomes() {
        let tag = match outcome.entry.bucket {
            Bucket::UniqueLeft => "  <<  ",
            Bucket::UniqueRight => "  >>  ",
            Bucket::HashMismatchLeft => " !<<  ",
            Bucket::HashMismatchRight => " !>>  ",
        };
        match (&outcome.destination, &outcome.error) {
            (Some(dest), None) => {
                println!(
                    "{} {} -> {}",
                    tag,
                    outcome.entry.record.path.display(),
                    dest.display()
                );
            }
            (_, Some(err)) => {
                println!(
                    "{} {} FAILED: {}",
                    tag,
                    outcome.entry.record.path.display(),
                    err
                );
            }
            (None, None) => {}
        }
    }

    let failures = report.failures();
    println!("\n{}", "=".repeat(80));
    println!("Summary:");
    println!("  Inventoried:     {}", report.left_total + report.right_total);
    println!("  Kept in place:   {}", report.kept());
    println!("  {} unique:  {}", verb, report.unique_outcomes.len());
    println!("  {} mismatch: {}", verb, report.mismatch_outcomes.len());
    println!("  Failures:        {}", failures.len());
    println!("{}", "=".repeat(80));

    for failure in failures {
        error!(
            "Not relocated: {} ({})",
            failure.entry.record.path.display(),
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
}

#[derive(Serialize)]
struct JsonReport {
    dir1: String,
    dir2: String,
    summary: JsonSummary,
    unique: Vec<JsonOutcome>,
    hash_mismatch: Vec<JsonOutcome>,
}

#[derive(Serialize)]
struct JsonSummary {
    inventoried: usize,
    kept: usize,
    moved: usize,
    failures: usize,
}

#[derive(Serialize)]
struct JsonOutcome {
    source: String,
    side: String,
    destination: Option<String>,
    error: Option<String>,
}

fn build_json_report(dir1: &Path, dir2: &Path, report: &RunReport) -> JsonReport {
    let to_json = |outcome: &dircull_core::RelocationOutcome| JsonOutcome {
        source: outcome.entry.record.path.to_string_lossy().to_string(),
        side: outcome.entry.bucket.side().label().to_string(),
        destination: outcome
            .destination
            .as_ref()
            .map(|d| d.to_string_lossy().to_string()),
        error: outcome.error.clone(),
    };

    JsonReport {
        dir1: dir1.to_string_lossy().to_string(),
        dir2: dir2.to_string_lossy().to_string(),
        summary: JsonSummary {
            inventoried: report.left_total + report.right_total,
            kept: report.kept(),
            moved: report.moved(),
            failures: report.failures().len(),
        },
        unique: report.unique_outcomes.iter().map(to_json).collect(),
        hash_mismatch: report.mismatch_outcomes.iter().map(to_json).collect(),
    }
}
