mod budget;
mod cli;
mod engine;
mod export;
mod llm;
mod model;
mod orchestrator;
mod panels;
mod storage;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log to stderr for the command line, or to a file under the data dir while the TUI owns
/// the terminal.
fn init_tracing(args: &cli::Cli) -> Result<()> {
    let default_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| if args.is_tui() { "info" } else { "warn" }.to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if args.is_tui() {
        let dir = args.data_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create data dir {}", dir.display()))?;
        let path = dir.join("script-breakdown.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_silent = args.is_silent();
    let is_non_tui = !args.is_tui();
    init_tracing(&args)?;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_silent {
                eprintln!("{e:#}");
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
