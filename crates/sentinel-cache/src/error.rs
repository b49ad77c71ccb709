//! Error types for sentinel-cache.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("lock acquire timeout for {key}, held by token {holder:?}")]
    AcquireTimeout { key: String, holder: Option<String> },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
