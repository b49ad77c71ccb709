//! Forensics error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForensicsError {
    #[error("upstream client error: {0}")]
    Client(#[from] sentinel_clients::ClientError),

    #[error("cache error: {0}")]
    Cache(#[from] sentinel_cache::CacheError),

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] sentinel_core::CoreError),
}

pub type Result<T> = std::result::Result<T, ForensicsError>;
