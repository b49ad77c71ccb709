//! Market-impact gating and dormancy scoring (§4.I).
//!
//! Hybrid absolute-tier + relative-impact gate over trades, plus dormancy
//! analysis over a market's recent trade history. Liquidity, volume, and
//! trade-history lookups are injected via the traits in [`sources`] so this
//! crate never depends on a concrete upstream client or persistence store.

pub mod config;
pub mod detector;
pub mod dormancy;
pub mod error;
pub mod sources;

pub use config::{DetectorConfig, OiCalculationMethod};
pub use detector::SignalDetector;
pub use error::{DetectorError, DetectorResult};
pub use sources::{LiquiditySource, TradeHistorySource, VolumeSource};
