//! Error types for the inference client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (connect, timeout, body read) or client construction.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
