//! Ingestion error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid ingestion config: {0}")]
    Config(String),

    #[error("upstream client error: {0}")]
    Client(#[from] sentinel_clients::ClientError),

    #[error("registry error: {0}")]
    Registry(#[from] sentinel_registry::RegistryError),

    #[error("core error: {0}")]
    Core(#[from] sentinel_core::CoreError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
