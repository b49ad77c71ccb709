//! Error types for sentinel-resilience.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Resilience error taxonomy (§7).
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The circuit for an upstream is open; calls are failing fast.
    #[error("circuit open for {upstream}, next retry at {next_retry_time}")]
    CircuitOpen {
        upstream: String,
        next_retry_time: DateTime<Utc>,
    },

    /// Caller-provided deadline elapsed before the submission got a slot.
    #[error("rate limiter deadline exceeded for {upstream}")]
    DeadlineExceeded { upstream: String },
}

pub type Result<T> = std::result::Result<T, ResilienceError>;
