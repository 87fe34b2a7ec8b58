use anyhow::{Context, Result};
use reqwest::Client;
use sheetsync::{
    submit::{JsonFormSource, SubmitControls, SubmitStatus},
    OutboundMessage, RenderingSurface, SnapshotCache, SubmissionHandler, SyncConfig,
    SyncCoordinator,
};
use std::{env, sync::Arc};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Nothing renders in a one-shot run; just note what would have been shown.
struct LogSurface;

impl RenderingSurface for LogSurface {
    fn publish(&self, message: OutboundMessage) {
        match message {
            OutboundMessage::InitData { rows, headers } => {
                debug!(rows = rows.len(), headers = headers.len(), "INIT_DATA")
            }
            OutboundMessage::SetCardMap { .. } => debug!("SET_CARD_MAP"),
        }
    }
}

struct LogControls;

impl SubmitControls for LogControls {
    fn show_status(&self, status: &SubmitStatus) {
        info!("{}", status);
    }

    fn set_submit_enabled(&self, enabled: bool) {
        debug!(enabled, "submit control");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // usage: submit_form <FORM_JSON>
    let form_path = env::args()
        .nth(1)
        .context("Usage: submit_form <FORM_JSON>")?;
    let form = JsonFormSource::load(&form_path)?;

    let config = SyncConfig::from_env().context("loading configuration")?;
    let coordinator = Arc::new(SyncCoordinator::new(
        Client::new(),
        &config,
        SnapshotCache::new(),
        Arc::new(LogSurface),
    ));

    // headers decide the column layout of the appended row
    coordinator
        .refresh()
        .await
        .context("loading sheet headers")?;

    let handler = SubmissionHandler::new(coordinator.clone(), config.append_range.as_str());
    let row = handler
        .submit(&form, &LogControls)
        .await
        .with_context(|| format!("submitting {}", form_path))?;

    info!(
        fields = row.fields().len(),
        rows_now = coordinator.cache().current().rows.len(),
        "done"
    );
    Ok(())
}
