// src/config.rs

use anyhow::{Context, Result};
use std::{env, time::Duration};
use url::Url;

use crate::fetch::{RenderOption, SheetQuery};

pub const DEFAULT_APPEND_RANGE: &str = "Sheet1!A:Z";
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(5 * 60);

/// Runtime settings, read from `SHEET_*` environment variables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub endpoint: Url,
    pub append_range: String,
    pub query: SheetQuery,
    pub refresh_interval: Duration,
}

impl SyncConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            append_range: DEFAULT_APPEND_RANGE.to_string(),
            query: SheetQuery::default(),
            refresh_interval: DEFAULT_REFRESH,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw = var("SHEET_API_URL").context("SHEET_API_URL is not set")?;
        let endpoint =
            Url::parse(raw.trim()).with_context(|| format!("parsing SHEET_API_URL {}", raw))?;
        let mut cfg = Self::new(endpoint);

        if let Some(range) = var("SHEET_APPEND_RANGE") {
            cfg.append_range = range;
        }
        cfg.query.range = var("SHEET_READ_RANGE");
        if let Some(row) = var("SHEET_HEADER_ROW") {
            cfg.query.header_row = row
                .trim()
                .parse()
                .with_context(|| format!("SHEET_HEADER_ROW must be a number, got {}", row))?;
            if cfg.query.header_row == 0 {
                anyhow::bail!("SHEET_HEADER_ROW must be at least 1");
            }
        }
        if let Some(opt) = var("SHEET_VALUE_RENDER") {
            cfg.query.value_render_option = Some(
                opt.parse::<RenderOption>()
                    .with_context(|| format!("SHEET_VALUE_RENDER {}", opt))?,
            );
        }
        if let Some(secs) = var("SHEET_REFRESH_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("SHEET_REFRESH_SECS must be a number, got {}", secs))?;
            if secs == 0 {
                anyhow::bail!("SHEET_REFRESH_SECS must be greater than zero");
            }
            cfg.refresh_interval = Duration::from_secs(secs);
        }

        Ok(cfg)
    }
}
