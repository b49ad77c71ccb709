//! Detector error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),
}

pub type DetectorResult<T> = Result<T, DetectorError>;
