// src/fetch/snapshot.rs

use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;

use super::{is_json, sheet_request};
use crate::error::{Result, SyncError};
use crate::model::{Row, Snapshot};

/// GET the sheet at `endpoint` and normalize it into a fresh `Snapshot`.
///
/// The body is read as text before anything else so that error statuses
/// can report what the server actually said.
#[instrument(level = "debug", skip(client), fields(url = %endpoint))]
pub async fn fetch_snapshot(client: &Client, endpoint: &Url) -> Result<Snapshot> {
    let resp = sheet_request(client.get(endpoint.clone())).send().await?;

    let status = resp.status();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(SyncError::http(status.as_u16(), &text));
    }
    if !is_json(&content_type) {
        return Err(SyncError::Format(format!(
            "not JSON returned from server (content-type {:?})",
            content_type
        )));
    }

    let payload: Value = serde_json::from_str(&text)
        .map_err(|e| SyncError::Format(format!("invalid JSON body: {}", e)))?;
    let snapshot = normalize_payload(payload)?;
    debug!(
        rows = snapshot.rows.len(),
        headers = snapshot.headers.len(),
        "fetched snapshot"
    );
    Ok(snapshot)
}

/// Turn a decoded `{ headers, rows }` payload into a `Snapshot`.
///
/// Missing or null `rows`/`headers` become empty. Every row gets its
/// position as `_id`; blank headers are dropped. A null payload, or a
/// `rows`/`headers` value that is not an array, is a format error.
pub fn normalize_payload(payload: Value) -> Result<Snapshot> {
    let mut obj = match payload {
        Value::Object(obj) => obj,
        Value::Null => return Err(SyncError::Format("payload is null".to_string())),
        _ => return Ok(Snapshot::default()),
    };

    let rows = array_field(&mut obj, "rows")?
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(fields) => Row::from_position(i, fields),
            _ => Row::from_position(i, Map::new()),
        })
        .collect();

    let headers = array_field(&mut obj, "headers")?
        .into_iter()
        .filter_map(header_name)
        .collect();

    Ok(Snapshot { headers, rows })
}

/// Take `key` out of `obj` as an array; absent or null is empty.
fn array_field(obj: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>> {
    match obj.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(SyncError::Format(format!(
            "`{}` is not an array: {}",
            key,
            other.to_string().chars().take(40).collect::<String>()
        ))),
    }
}

fn header_name(v: Value) -> Option<String> {
    let name = match v {
        Value::Null => return None,
        Value::String(s) => s,
        other => other.to_string(),
    };
    if name.trim().is_empty() {
        None
    } else {
        Some(name)
    }
}
