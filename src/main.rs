mod cli;
mod client;
mod error;
mod model;
mod orchestrator;
mod output;
mod preview;
mod selection;
mod summary;
#[cfg(feature = "tui")]
mod tui;
mod upload;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Set up logging before any async code runs.
///
/// The TUI owns the terminal, so interactive sessions only log when `--debug`
/// is given, and then to a file.
fn init_logging(args: &cli::Cli) -> Result<()> {
    let default_level = if args.debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("phase_viewer={default_level}")));

    if args.is_interactive() {
        if args.debug {
            let file = std::fs::File::create("phase-viewer.log")?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(&args)?;
    let is_non_tui = !args.is_interactive();

    cli::run(args).await?;
    // Explicitly exit on success so lingering blocking tasks cannot hold the process open
    if is_non_tui {
        std::process::exit(0);
    }
    Ok(())
}
