//! Orchestrator for the real-time insider-trading surveillance pipeline.
//!
//! Wires the rate limiter/circuit breaker resilience layer, the Redis- and
//! Postgres-backed stores, the upstream clients, the market registry, both
//! trade producers, the bounded queue, and the detector/forensics/alert
//! pipeline into one running process.

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod notifier;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
