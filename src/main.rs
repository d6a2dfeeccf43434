//! CLI entry point for the PDF harvesting engine.
//!
//! Two subcommands: `run` drives a full harvest (bring up the browser,
//! log in once, dispatch N workers over the task queue, wait for drain,
//! emit the final report); `validate` runs the post-run attribution check
//! against an existing run directory's `pdfs/`, independent of any run.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use pdf_harvester::config::env::from_env;
use pdf_harvester::run_dir::RunDirectory;
use pdf_harvester::validator::{default_reference_pattern, validate_run};

#[derive(Parser, Debug)]
#[command(name = "pdf-harvester")]
#[command(author, version, about = "Bulk, resumable, parallel PDF harvesting from an authenticated browser export flow")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a harvest: bring up the browser, log in, and download every
    /// pending reference's PDF. Configuration is read from `HARVEST_*`
    /// environment variables (see `config::env::from_env`).
    Run {
        /// Resume an existing run directory instead of creating a fresh
        /// dated one under the configured download root.
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// Validate that every PDF under `pdfs_dir` contains the reference
    /// number its filename claims (spec.md §9, invariant I2). Does not
    /// require a browser or credentials.
    Validate {
        /// Directory of `<reference>.pdf` files to check.
        pdfs_dir: PathBuf,

        /// Override the default digit-run extraction pattern.
        #[arg(long)]
        pattern: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Command::Run { resume } => run_command(resume).await?,
        Command::Validate { pdfs_dir, pattern } => validate_command(pdfs_dir, pattern).await?,
    };

    std::process::exit(exit_code);
}

async fn run_command(resume: Option<PathBuf>) -> Result<i32> {
    let config = from_env().context("loading configuration from HARVEST_* environment variables")?;

    let run_dir = match resume {
        Some(path) => RunDirectory::resume(path).context("resuming run directory")?,
        None => RunDirectory::create_for_today(config.download_root())
            .context("creating run directory")?,
    };

    let spinner = progress_spinner();
    let outcome = pdf_harvester::harvest(config, run_dir).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(report) => {
            println!("{}", report.summary_line());
            if !report.terminal_failures.is_empty() {
                println!("terminal failures: {}", report.terminal_failures.join(", "));
            }
            Ok(0)
        }
        Err(e) => {
            eprintln!("harvest failed: {e:#}");
            Ok(1)
        }
    }
}

async fn validate_command(pdfs_dir: PathBuf, pattern: Option<String>) -> Result<i32> {
    let regex = match pattern {
        Some(p) => regex::Regex::new(&p).with_context(|| format!("compiling pattern {p}"))?,
        None => default_reference_pattern(),
    };

    let report = validate_run(&pdfs_dir, &regex)
        .await
        .context("running validator")?;

    println!("{}", report.summary_line());
    for mismatch in &report.mismatches {
        println!(
            "MISMATCH {} -> extracted {:?} ({})",
            mismatch.reference,
            mismatch.extracted_reference,
            mismatch.path.display()
        );
    }
    for unreadable in &report.unreadable {
        println!(
            "UNREADABLE {} ({})",
            unreadable.reference,
            unreadable.path.display()
        );
    }

    Ok(if report.is_clean() { 0 } else { 1 })
}

/// A steady spinner for the CLI's stderr while a run is in flight.
/// Per-reference progress is the GUI's job (spec.md §1, out of scope
/// here); this exists so a long-running `run` invocation isn't silent.
fn progress_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {elapsed_precise} harvesting…")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}
