//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("core error: {0}")]
    Core(#[from] sentinel_core::CoreError),

    #[error("resilience error: {0}")]
    Resilience(#[from] sentinel_resilience::ResilienceError),

    #[error("cache error: {0}")]
    Cache(#[from] sentinel_cache::CacheError),

    #[error("upstream client error: {0}")]
    Client(#[from] sentinel_clients::ClientError),

    #[error("registry error: {0}")]
    Registry(#[from] sentinel_registry::RegistryError),

    #[error("ingest error: {0}")]
    Ingest(#[from] sentinel_ingest::IngestError),

    #[error("queue error: {0}")]
    Queue(#[from] sentinel_queue::QueueError),

    #[error("detector error: {0}")]
    Detector(#[from] sentinel_detector::DetectorError),

    #[error("forensics error: {0}")]
    Forensics(#[from] sentinel_forensics::ForensicsError),

    #[error("alert error: {0}")]
    Alert(#[from] sentinel_alerts::AlertError),

    #[error("persistence error: {0}")]
    Persistence(#[from] sentinel_persistence::PersistenceError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] sentinel_telemetry::TelemetryError),

    #[error("preflight error: {0}")]
    Preflight(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown requested")]
    Shutdown,
}

pub type AppResult<T> = Result<T, AppError>;
