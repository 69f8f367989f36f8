//! # autoscribe: Answer Fillable PDF Forms
//!
//! This is the main entry point for the `autoscribe` command-line interface.
//! The binary stays thin: all command logic lives in the `autoscribe_cli` library.

use autoscribe_cli::{run, Cli};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load .env before anything reads the environment.
    dotenvy::dotenv().ok();

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Setup logging on stderr; RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // 4. Run the command and map the outcome to the exit code.
    let command = cli.command.name();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{command} failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
