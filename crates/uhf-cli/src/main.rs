//! `uhf-bridge`: drive a simulated UHF reader over a JSON line bridge.
//!
//! Method calls are read from stdin, one JSON object per line. Responses and
//! tag/state events are written to stdout, one JSON object per line. Logs go
//! to stderr so they never interleave with bridge output.

mod bridge;
mod simulation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use uhf_hardware::mock::SimulatedGateway;
use uhf_reader::{EventStream, Reader, ReaderConfig};

use crate::bridge::EventFrame;

/// UHF RFID reader bridge backed by a simulated radio.
#[derive(Parser, Debug)]
#[command(name = "uhf-bridge", version, about)]
struct Cli {
    /// Reader configuration file (JSON)
    #[arg(short, long, env = "UHF_READER_CONFIG")]
    config: Option<PathBuf>,

    /// Time each simulated inventory round takes, in milliseconds
    #[arg(long, default_value_t = 50)]
    round_ms: u64,

    /// Make every n-th simulated round fail
    #[arg(long)]
    fail_every: Option<u32>,

    /// EPCs (hex, comma separated) reported by the simulated radio
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn setup_tracing(cli: &Cli) {
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ReaderConfig> {
    let Some(path) = path else {
        return Ok(ReaderConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    ReaderConfig::from_json(&json).with_context(|| format!("loading config {}", path.display()))
}

/// Serialize `value` as one output line.
fn send_line<T: Serialize>(out: &mpsc::UnboundedSender<String>, value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => {
            let _ = out.send(line);
        }
        Err(e) => warn!(error = %e, "failed to encode output frame"),
    }
}

/// Forward every event of `stream` to the output as a frame.
fn forward<T: Send + 'static>(
    mut stream: EventStream<T>,
    out: mpsc::UnboundedSender<String>,
    frame: fn(T) -> EventFrame,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = stream.recv().await {
            send_line(&out, &frame(event));
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli);

    let config = load_config(cli.config.as_ref())?;
    let simulation = simulation::build(cli.round_ms, cli.fail_every, &cli.tags)?;
    info!(
        default_power_dbm = config.default_power_dbm,
        round_ms = cli.round_ms,
        fail_every = ?cli.fail_every,
        tags = simulation.tags.len(),
        "starting uhf-bridge"
    );

    let reader = Reader::with_config(SimulatedGateway::new(simulation), config)?;

    // Single writer so frames never interleave.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err()
                || stdout.write_all(b"\n").await.is_err()
                || stdout.flush().await.is_err()
            {
                warn!("stdout closed");
                break;
            }
        }
    });

    let tag_task = forward(reader.subscribe_tags().await, out_tx.clone(), EventFrame::Tags);
    let state_task = forward(reader.subscribe_states().await, out_tx.clone(), EventFrame::State);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if let Some(response) = bridge::handle_line(&reader, &line).await {
            send_line(&out_tx, &response);
        }
    }
    debug!("stdin closed");

    reader.shutdown().await?;
    let _ = tag_task.await;
    let _ = state_task.await;
    drop(out_tx);
    let _ = writer.await;

    info!("uhf-bridge stopped");
    Ok(())
}
