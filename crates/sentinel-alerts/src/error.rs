//! Error types for sentinel-alerts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("persistence error: {0}")]
    Persistence(#[from] sentinel_persistence::PersistenceError),

    #[error("lock unavailable: {0}")]
    Lock(#[from] sentinel_cache::CacheError),
}

pub type Result<T> = std::result::Result<T, AlertError>;
