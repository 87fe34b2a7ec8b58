// src/surface.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::model::{CardMap, Row};

/// Messages pushed to the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    InitData { rows: Vec<Row>, headers: Vec<String> },
    SetCardMap { map: CardMap },
}

/// Messages the rendering surface may send back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    FiltersChanged {
        #[serde(default)]
        filters: Value,
    },
}

impl InboundMessage {
    /// Decode a raw surface message. Non-objects and unknown types are `None`.
    pub fn parse(raw: Value) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }
        match serde_json::from_value(raw) {
            Ok(msg) => Some(msg),
            Err(e) => {
                debug!(error = %e, "ignoring surface message");
                None
            }
        }
    }
}

/// Something that displays the cached rows.
pub trait RenderingSurface: Send + Sync + 'static {
    fn publish(&self, message: OutboundMessage);
}

/// Surface adapter that forwards every message into a channel.
#[derive(Clone)]
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelSurface {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RenderingSurface for ChannelSurface {
    fn publish(&self, message: OutboundMessage) {
        if self.tx.send(message).is_err() {
            warn!("rendering surface closed; message dropped");
        }
    }
}

/// React to a message coming back from the surface.
pub fn handle_inbound(message: &InboundMessage) {
    match message {
        // TODO: apply filters to the cached snapshot once the page defines filter semantics
        InboundMessage::FiltersChanged { filters } => {
            info!(%filters, "filters changed on surface");
        }
    }
}
