// src/fetch/mod.rs

use reqwest::{header::ACCEPT, Client, RequestBuilder};
use serde::Deserialize;
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Result, SyncError};

pub mod append;
pub mod snapshot;

pub use append::{append_row, AppendReceipt, AppendRequest};
pub use snapshot::{fetch_snapshot, normalize_payload};

/// Header telling the ngrok tunnel to skip its browser interstitial.
pub const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

const JSON_MIME: &str = "application/json";

/// Attach the headers every call to the sheet API carries.
pub(crate) fn sheet_request(req: RequestBuilder) -> RequestBuilder {
    req.header(TUNNEL_BYPASS_HEADER, "true")
        .header(ACCEPT, JSON_MIME)
}

pub(crate) fn is_json(content_type: &str) -> bool {
    content_type.contains(JSON_MIME)
}

/// How the backend renders cell values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOption {
    FormattedValue,
    UnformattedValue,
    Formula,
}

impl RenderOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderOption::FormattedValue => "FORMATTED_VALUE",
            RenderOption::UnformattedValue => "UNFORMATTED_VALUE",
            RenderOption::Formula => "FORMULA",
        }
    }
}

impl fmt::Display for RenderOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("unknown value render option {0:?}")]
pub struct UnknownRenderOption(String);

impl FromStr for RenderOption {
    type Err = UnknownRenderOption;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FORMATTED_VALUE" => Ok(RenderOption::FormattedValue),
            "UNFORMATTED_VALUE" => Ok(RenderOption::UnformattedValue),
            "FORMULA" => Ok(RenderOption::Formula),
            _ => Err(UnknownRenderOption(s.to_string())),
        }
    }
}

/// Query parameters understood by the read route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetQuery {
    /// 1-based row holding the headers.
    pub header_row: u32,
    pub range: Option<String>,
    pub value_render_option: Option<RenderOption>,
}

impl Default for SheetQuery {
    fn default() -> Self {
        Self {
            header_row: 1,
            range: None,
            value_render_option: None,
        }
    }
}

impl SheetQuery {
    /// `endpoint` with this query appended.
    pub fn url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("header_row", &self.header_row.to_string());
            if let Some(range) = &self.range {
                pairs.append_pair("range", range);
            }
            if let Some(opt) = self.value_render_option {
                pairs.append_pair("value_render_option", opt.as_str());
            }
        }
        url
    }
}

#[derive(Deserialize)]
struct HealthReply {
    #[serde(default)]
    ok: bool,
}

/// Probe `/health` on the endpoint's host. Returns the reported `ok` flag.
#[instrument(level = "debug", skip(client), fields(url = %endpoint))]
pub async fn health(client: &Client, endpoint: &Url) -> Result<bool> {
    let url = endpoint
        .join("/health")
        .map_err(|e| SyncError::Format(format!("bad health URL: {}", e)))?;
    let resp = sheet_request(client.get(url)).send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(SyncError::http(status.as_u16(), &text));
    }
    let reply: HealthReply = serde_json::from_str(&text)
        .map_err(|e| SyncError::Format(format!("health reply: {}", e)))?;
    debug!(ok = reply.ok, "health probe");
    Ok(reply.ok)
}
