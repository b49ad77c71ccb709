//! Structured logging, Prometheus metrics, and funnel counters for the
//! surveillance pipeline.
//!
//! Provides observability from day one:
//! - Prometheus metrics for WebSocket/circuit-breaker/queue state and
//!   detector/alert funnel outcomes
//! - Structured JSON logging with tracing
//! - A named-counter registry (`StatsRegistry`) the decision framework can
//!   depend on through the narrow `CounterSink` trait rather than this
//!   crate's concrete types

pub mod daily_stats;
pub mod error;
pub mod logging;
pub mod metrics;

pub use daily_stats::{CounterSink, StatsRegistry};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
