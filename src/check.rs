//! check command: run a batch from a local file
//!
//! Reads a .txt list, checks every address through one browser session, and
//! writes the categorized result files. Compact JSON summary on stdout,
//! progress on stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use clap::Args;
use serde::Serialize;
use tokio::fs;
use url::Url;

use crate::batch::{run_batch, PaceConfig, ProgressReporter};
use crate::classify::Outcome;
use crate::parse::parse_entries;
use crate::probe::ProbeConfig;
use crate::report::render_files;

#[derive(Args)]
pub struct CheckArgs {
    /// Text file with one email (or email:password) per line
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Directory for the categorized result files
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Base delay between checks in seconds (jitter is added on top)
    #[arg(long, default_value = "2.0")]
    delay: f64,

    /// Signup page to probe
    #[arg(long, default_value = "https://github.com/signup")]
    signup_url: String,

    /// Navigation timeout per check in milliseconds
    #[arg(long, default_value = "30000")]
    timeout: u64,
}

/// JSON summary printed to stdout.
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub total: usize,
    pub registered: usize,
    pub available: usize,
    pub invalid: usize,
    pub error: usize,
    pub files: Vec<String>,
}

/// Run the check command.
pub async fn run_check(args: CheckArgs) -> Result<()> {
    Url::parse(&args.signup_url)
        .with_context(|| format!("Invalid signup URL: {}", args.signup_url))?;

    let content = fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read file: {}", args.file.display()))?;

    let entries = parse_entries(&content);
    if entries.is_empty() {
        eprintln!("No valid emails found.");
        std::process::exit(1);
    }

    eprintln!("Checking {} emails (sequential)...", entries.len());

    let probe_config = ProbeConfig {
        signup_url: args.signup_url,
        nav_timeout_ms: args.timeout,
        ..ProbeConfig::default()
    };
    let pace = PaceConfig {
        base_delay_secs: args.delay,
    };

    let results = run_batch(&entries, Some(&StderrReporter), probe_config, &pace).await;

    fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let now = Local::now();
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    let date = now.format("%Y-%m-%d %H:%M:%S").to_string();

    let mut written = Vec::new();
    for file in render_files(&results, &stamp, &date) {
        let path = args.out_dir.join(&file.name);
        fs::write(&path, file.body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path.display().to_string());
    }

    let output = CheckOutput {
        total: results.total(),
        registered: results.registered.len(),
        available: results.available.len(),
        invalid: results.invalid.len(),
        error: results.error.len(),
        files: written,
    };
    println!("{}", serde_json::to_string(&output)?);

    eprintln!(
        "Done: {}/{} checked without error",
        output.total - output.error,
        output.total
    );

    Ok(())
}

/// Progress lines on stderr.
struct StderrReporter;

#[async_trait]
impl ProgressReporter for StderrReporter {
    async fn report(&self, current: usize, total: usize, email: &str, outcome: Outcome) {
        eprintln!("  [{current}/{total}] {email} -> {outcome}");
    }
}
