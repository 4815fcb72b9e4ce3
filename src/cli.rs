use crate::client::{ClientConfig, ProcessClient};
use crate::error::{failure_alert, ClientError};
use crate::model::{CandidateFile, Phase};
use crate::upload::{Completion, UploadController};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "phase-viewer",
    version,
    about = "Submit medical images for arterial/venous phase processing, with optional TUI"
)]
pub struct Cli {
    /// Base URL of the processing backend
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Image to select on startup (JPG or PNG)
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Phase to request
    #[arg(long, value_enum, default_value_t = Phase::Arterial)]
    pub phase: Phase,

    /// Process --image, print a JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Process --image, print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Write the processed image to this path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Give up on a request after this long (default: wait indefinitely)
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Query the backend's health endpoint and exit
    #[arg(long)]
    pub check_health: bool,

    /// Enable debug logging (written to phase-viewer.log in TUI mode)
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        cfg!(feature = "tui") && !self.json && !self.text && !self.check_health
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow!("--json and --text are mutually exclusive"));
    }

    if args.check_health {
        return run_health(args).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(args, false).await;
        }
    }

    run_once(args.clone(), args.json).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_client_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        timeout: args.timeout.map(Duration::from),
        user_agent: format!("phase-viewer/{}", env!("CARGO_PKG_VERSION")),
    }
}

async fn run_health(args: Cli) -> Result<()> {
    let client = ProcessClient::new(&build_client_config(&args))?;
    let health = client
        .health()
        .await
        .with_context(|| format!("health check against {} failed", client.health_url()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&health)?);
    } else {
        println!("{}: {}", client.health_url(), health.status);
    }
    if !health.is_healthy() {
        return Err(anyhow!("backend reported status {:?}", health.status));
    }
    Ok(())
}

/// Run one select → submit → display cycle and print the result.
async fn run_once(args: Cli, json: bool) -> Result<()> {
    let path = args
        .image
        .clone()
        .ok_or_else(|| anyhow!("--image is required with --text or --json"))?;
    let client = ProcessClient::new(&build_client_config(&args))?;
    let (out_tx, out_handle) = spawn_output_writer();

    let mut controller = UploadController::new(args.phase);
    let candidate = CandidateFile::from_path(&path)?;
    controller.select(candidate)?;
    let req = controller.begin_submit()?;
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "Submitting {} ({})…",
        req.file.name,
        req.phase.label()
    )));

    let outcome = tokio::select! {
        r = client.process(&req.file, req.phase) => r,
        _ = tokio::signal::ctrl_c() => Err(ClientError::Cancelled),
    };

    match controller.finish_submit(req.ticket, outcome) {
        Completion::Displayed => {}
        Completion::Failed(message) => {
            drop(out_tx);
            let _ = out_handle.await;
            return Err(anyhow!(failure_alert(&message)));
        }
        Completion::Stale => return Err(anyhow!("submission was superseded")),
    }

    let view = controller.view();
    let processed = view
        .processed
        .as_ref()
        .context("processed image missing after successful submission")?;

    let saved_to = match args.output.as_deref() {
        Some(dest) => Some(
            crate::output::save_processed(&client, processed, Some(dest))
                .await
                .context("failed to save processed image")?,
        ),
        None => None,
    };

    let selected = controller
        .pending()
        .context("selection missing after successful submission")?;
    if json {
        let summary = crate::summary::build_json_summary(selected, view, saved_to.as_deref())?;
        let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&summary)?));
    } else {
        let summary = crate::summary::build_text_summary(selected, view, saved_to.as_deref())?;
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}
