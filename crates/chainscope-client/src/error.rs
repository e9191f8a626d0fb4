//! Client-side error types.

use thiserror::Error;

/// Errors from the HTTP engine and the backend clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Response body could not be parsed as JSON.
    #[error("Failed to parse response from {backend}.")]
    Parse { backend: String },

    /// The backend returned an error envelope or `error` object.
    #[error("{backend} error: {detail}.")]
    Upstream { backend: String, detail: String },

    /// The backend returned an empty result where one was required.
    #[error("{backend} returned an empty result.")]
    EmptyResult { backend: String },

    /// Unexpected response shape.
    #[error("Unexpected response from {backend}.")]
    UnexpectedShape { backend: String },
}

impl ClientError {
    /// Transient failures are re-attempted by the request engine; upstream
    /// error envelopes and shape mismatches are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Parse { .. } | Self::Status { status: 429, .. }
        ) || matches!(self, Self::Status { status, .. } if *status >= 500)
    }

    pub fn upstream(backend: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Upstream { backend: backend.into(), detail: detail.into() }
    }
}
