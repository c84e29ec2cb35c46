//! ghcheck CLI
//!
//! Checks whether email addresses are already registered on GitHub by
//! probing the signup form with headless Chrome.

use anyhow::Result;
use clap::{Parser, Subcommand};

use ghcheck::bot::{run_bot, BotArgs};
use ghcheck::check::{run_check, CheckArgs};

#[derive(Parser)]
#[command(name = "ghcheck")]
#[command(version)]
#[command(about = "GitHub email registration checker")]
#[command(
    long_about = "Probes the GitHub signup form with headless Chrome to infer whether\n\
                  addresses already have an account.\n\n\
                  Commands:\n  check    Check emails from a local .txt file\n  \
                  bot      Run the Telegram bot front end"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check emails from a local .txt file
    Check(CheckArgs),
    /// Run the Telegram bot front end
    Bot(BotArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => run_check(args).await,
        Commands::Bot(args) => run_bot(args).await,
    }
}
