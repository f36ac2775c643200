//! promptlint CLI entry point.
//!
//! Initializes logging and delegates to the CLI module for command handling.

use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status when the run itself fails (bad root, bad config).
const EXIT_RUN_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first to get log_level
    let cli = promptlint::cli::parse_cli();

    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());

    // Reports go to stdout, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();

    match promptlint::cli::run_with_cli(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_RUN_FAILED)
        }
    }
}
