//! docsift - Extract review reports from DOCX, XLSX and PDF submissions.
//!
//! # Configuration
//!
//! Environment variables (a `.env` file is loaded first), overridden by
//! the matching flags:
//!
//! - `DOCSIFT_PDFTOTEXT`, `DOCSIFT_PDFTOPPM`, `DOCSIFT_TESSERACT` - tool binaries
//! - `DOCSIFT_TOOL_TIMEOUT_SECS` - per-invocation tool timeout
//! - `DOCSIFT_OCR_DPI` - page resolution for OCR
//! - `DOCSIFT_JOBS` - files processed at once
//! - `RUST_LOG` - log filter

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsift_extractors::{check_dependencies, ExtractionPipeline, ExtractorConfig};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "docsift",
    about = "Extract text, tracked changes, comments and embedded spreadsheets for review",
    version
)]
struct Cli {
    /// Log debug detail for every part and entry
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a `<file>.txt` report for each DOCX, XLSX or PDF input
    Extract {
        /// File or directory to process (directories are not recursed)
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,

        /// Output directory for reports and recovered embedded files
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Files processed at once
        #[arg(short, long, value_name = "N")]
        jobs: Option<usize>,

        /// Seconds before an external tool is killed
        #[arg(long, value_name = "SECS")]
        tool_timeout: Option<u64>,
    },

    /// Report whether pdftotext, pdftoppm and tesseract are installed
    CheckDeps,
}

fn init_tracing(verbose: bool) {
    let crate_level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
    for directive in [
        format!("docsift_extractors={crate_level}"),
        format!("docsift={crate_level}"),
    ] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = ExtractorConfig::from_env();

    match cli.command {
        Commands::Extract {
            input,
            out,
            jobs,
            tool_timeout,
        } => {
            if let Some(jobs) = jobs {
                config.concurrency = jobs.max(1);
            }
            if let Some(secs) = tool_timeout {
                config.tool_timeout = Duration::from_secs(secs);
            }
            extract(&config, input, out).await
        }
        Commands::CheckDeps => Ok(check_deps(&config)),
    }
}

async fn extract(config: &ExtractorConfig, input: PathBuf, out: PathBuf) -> Result<ExitCode> {
    let pipeline = ExtractionPipeline::from_config(config);
    info!(input = %input.display(), out = %out.display(), "Starting extraction");

    let stats = pipeline
        .process_path(&input, &out)
        .await
        .with_context(|| format!("failed to process {}", input.display()))?;

    println!(
        "{} file(s): {} written, {} failed",
        stats.total, stats.written, stats.failed
    );

    if stats.all_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(failed = stats.failed, "Some files could not be extracted");
        Ok(ExitCode::FAILURE)
    }
}

fn check_deps(config: &ExtractorConfig) -> ExitCode {
    let statuses = check_dependencies(config);

    for status in &statuses {
        match &status.path {
            Some(path) => println!("[ok]      {:<10} {} ({})", status.tool, path.display(), status.purpose),
            None => println!("[missing] {:<10} {} ({})", status.tool, status.binary, status.purpose),
        }
    }

    if statuses.iter().all(|s| s.found()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
