// src/error.rs

use thiserror::Error;

/// Number of body characters kept on an HTTP error.
pub const ERROR_BODY_PREVIEW: usize = 120;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Wrong content type or a body that does not parse as JSON.
    #[error("unexpected response format: {0}")]
    Format(String),

    /// Required form fields left empty.
    #[error("please fill in: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },

    /// Transport-level failure (unreachable host, reset connection, ...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl SyncError {
    /// Build an `Http` error, keeping only the first characters of the body.
    pub fn http(status: u16, body: &str) -> Self {
        SyncError::Http {
            status,
            body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
