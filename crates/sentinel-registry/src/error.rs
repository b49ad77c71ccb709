//! Registry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("market not found: {0}")]
    MarketNotFound(String),

    #[error("condition id already registered: {0}")]
    DuplicateConditionId(String),

    #[error("token id already registered: {0}")]
    DuplicateTokenId(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] sentinel_persistence::PersistenceError),

    #[error("upstream client error: {0}")]
    Client(#[from] sentinel_clients::ClientError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
