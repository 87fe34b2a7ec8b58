// src/fetch/append.rs

use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

use super::sheet_request;
use crate::error::{Result, SyncError};

/// Body of the append call.
///
/// The backend names the rows field `value` even though it holds a
/// two-dimensional array; keep it that way.
#[derive(Debug, Serialize)]
pub struct AppendRequest<'a> {
    pub range: &'a str,
    pub value: Vec<Vec<String>>,
}

/// What the backend said after an append.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendReceipt(pub Value);

impl AppendReceipt {
    pub fn message(&self) -> Option<&str> {
        self.0.get("message").and_then(Value::as_str)
    }
}

/// POST one row of `cells` to `endpoint`, targeting `range`.
#[instrument(level = "debug", skip(client, cells), fields(url = %endpoint, cells = cells.len()))]
pub async fn append_row(
    client: &Client,
    endpoint: &Url,
    range: &str,
    cells: Vec<String>,
) -> Result<AppendReceipt> {
    let body = AppendRequest {
        range,
        value: vec![cells],
    };
    let resp = sheet_request(client.post(endpoint.clone()))
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(SyncError::http(status.as_u16(), &text));
    }

    // success bodies are not always JSON
    let value = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "message": text }));
    debug!(%status, "row appended");
    Ok(AppendReceipt(value))
}
