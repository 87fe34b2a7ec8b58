use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use sheetsync::{
    fetch, surface::ChannelSurface, InboundMessage, SnapshotCache, SyncConfig, SyncCoordinator,
};
use std::sync::Arc;
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Polls the sheet and streams surface messages to stdout as JSON lines.
/// Lines written to stdin are treated as messages coming back from the surface.
#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
    info!("startup");

    // ─── 2) configuration ───────────────────────────────────────────
    let config = SyncConfig::from_env().context("loading configuration")?;
    info!(
        endpoint = %config.endpoint,
        every_secs = config.refresh_interval.as_secs(),
        "configured"
    );

    let client = Client::new();
    match fetch::health(&client, &config.endpoint).await {
        Ok(true) => info!("backend healthy"),
        Ok(false) => warn!("backend reports unhealthy"),
        Err(e) => warn!(error = %e, "health probe failed"),
    }

    // ─── 3) surface: stdout out, stdin in ───────────────────────────
    let (surface, mut outbound) = ChannelSurface::new();
    tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(msg) = outbound.recv().await {
            let line = match serde_json::to_string(&msg) {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "encoding surface message");
                    continue;
                }
            };
            if let Err(e) = stdout.write_all(format!("{}\n", line).as_bytes()).await {
                error!(error = %e, "stdout closed");
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let (in_tx, in_rx) = mpsc::unbounded_channel::<InboundMessage>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(raw) = serde_json::from_str::<Value>(&line) else {
                debug!(%line, "ignoring non-JSON input");
                continue;
            };
            if let Some(msg) = InboundMessage::parse(raw) {
                if in_tx.send(msg).is_err() {
                    break;
                }
            }
        }
    });

    // ─── 4) run until ctrl-c ─────────────────────────────────────────
    let coordinator = Arc::new(SyncCoordinator::new(
        client,
        &config,
        SnapshotCache::new(),
        Arc::new(surface),
    ));
    coordinator
        .run(in_rx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "listening for ctrl-c");
            }
        })
        .await;

    info!("all done");
    // the stdin reader may still be parked in a blocking read
    std::process::exit(0)
}
