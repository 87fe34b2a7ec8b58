// src/sync/mod.rs

use reqwest::Client;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::fetch::fetch_snapshot;
use crate::model::CardMap;
use crate::surface::{handle_inbound, InboundMessage, OutboundMessage, RenderingSurface};

pub mod cache;

pub use cache::SnapshotCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Cache replaced and the surface notified.
    Applied { seq: u64, rows: usize },
    /// A newer refresh finished first; this result was dropped.
    Stale { seq: u64 },
}

/// Keeps the cached snapshot in step with the sheet and the surface in step
/// with the cache.
pub struct SyncCoordinator<S> {
    client: Client,
    endpoint: Url,
    read_url: Url,
    interval: Duration,
    card_map: CardMap,
    cache: Arc<SnapshotCache>,
    surface: Arc<S>,
}

impl<S: RenderingSurface> SyncCoordinator<S> {
    pub fn new(
        client: Client,
        config: &SyncConfig,
        cache: Arc<SnapshotCache>,
        surface: Arc<S>,
    ) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            read_url: config.query.url(&config.endpoint),
            interval: config.refresh_interval,
            card_map: CardMap::default(),
            cache,
            surface,
        }
    }

    pub fn with_card_map(mut self, card_map: CardMap) -> Self {
        self.card_map = card_map;
        self
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Endpoint without the read query; appends go here.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch the sheet, swap the cache and push the result to the surface.
    ///
    /// On error nothing is touched: the previous snapshot stays cached and
    /// visible.
    #[instrument(level = "info", skip(self))]
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let seq = self.cache.begin();
        let snapshot = fetch_snapshot(&self.client, &self.read_url).await?;

        let Some(current) = self.cache.apply(seq, snapshot) else {
            warn!(seq, applied = self.cache.applied_seq(), "stale refresh dropped");
            return Ok(RefreshOutcome::Stale { seq });
        };

        self.surface.publish(OutboundMessage::InitData {
            rows: current.rows.clone(),
            headers: current.headers.clone(),
        });
        self.surface.publish(OutboundMessage::SetCardMap {
            map: self.card_map.clone(),
        });

        info!(
            seq,
            rows = current.rows.len(),
            headers = current.headers.len(),
            "snapshot refreshed"
        );
        Ok(RefreshOutcome::Applied {
            seq,
            rows: current.rows.len(),
        })
    }

    /// Refresh once, then every `interval` until `shutdown` resolves.
    ///
    /// Each tick runs in its own task, so a slow fetch can overlap the next
    /// one; the cache keeps whichever started last. Messages from the surface
    /// are drained on the same loop.
    pub async fn run<F>(
        self: Arc<Self>,
        mut inbound: mpsc::UnboundedReceiver<InboundMessage>,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.refresh().await {
            error!(error = %e, "initial refresh failed; continuing with empty cache");
        }

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut inbound_open = true;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("sync loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let this = self.clone();
                    tokio::spawn(async move {
                        match this.refresh().await {
                            Ok(outcome) => debug!(?outcome, "auto-reload done"),
                            Err(e) => error!(error = %e, "auto-reload failed"),
                        }
                    });
                }
                msg = inbound.recv(), if inbound_open => match msg {
                    Some(msg) => handle_inbound(&msg),
                    None => {
                        debug!("surface message channel closed");
                        inbound_open = false;
                    }
                },
            }
        }
    }
}
