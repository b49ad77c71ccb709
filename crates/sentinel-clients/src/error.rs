//! Error types for sentinel-clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("resilience layer rejected call: {0}")]
    Resilience(#[from] sentinel_resilience::ResilienceError),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("response decode error: {0}")]
    Decode(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("websocket connection closed: code {code}, reason {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("heartbeat timeout")]
    HeartbeatTimeout,

    #[error("max reconnection attempts reached")]
    MaxReconnectsReached,

    #[error("core domain error: {0}")]
    Core(#[from] sentinel_core::CoreError),
}

/// Whether a failed HTTP call should be retried, per the shared retry
/// policy (§4.E): transport errors, 429, and 5xx are retried; 429 uses a
/// longer base delay; no retry on other 4xx.
impl ClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(_) => true,
            ClientError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::HttpStatus { status, .. } if *status == 429)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
