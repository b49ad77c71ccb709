//! Enabled-market set with multi-key indexing and periodic liquidity
//! refresh (§4.F).
//!
//! The registry is the single in-memory authority over which markets are
//! live. It mirrors the relational store, exposes by-id/by-condition-id/
//! by-token-id lookups for the rest of the pipeline, and keeps the
//! market-data WebSocket subscription set in sync with the enabled set.

pub mod error;
pub mod refresh;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use refresh::{run_refresh_loop, DEFAULT_REFRESH_INTERVAL};
pub use registry::{MarketRegistry, SubscriptionSink};
