//! Discord collaborator errors

use std::time::Duration;

use crate::protocol::CloseCode;

/// Errors from the gateway client, the REST client, and the image probe
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Discord API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No usable Content-Length for {0}")]
    MissingContentLength(String),

    #[error("Gateway connection closed: {0}")]
    Closed(String),

    #[error("Gateway closed the session: {0}")]
    Fatal(CloseCode),

    #[error("Heartbeat not acknowledged")]
    HeartbeatTimeout,

    #[error("Unexpected gateway frame: {0}")]
    Protocol(String),
}

impl DiscordError {
    /// Whether reconnecting cannot help (bad token, bad intents, ...)
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Whether the error is an HTTP 404 from the REST API
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Result type alias for Discord operations
pub type DiscordResult<T> = Result<T, DiscordError>;
