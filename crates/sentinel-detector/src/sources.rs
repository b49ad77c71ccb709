//! Data-source abstractions the detector needs but does not own a concrete
//! client for.
//!
//! This crate deliberately has no dependency on `sentinel-clients` or
//! `sentinel-persistence`: the orchestrator wires a concrete adapter over
//! those crates in at construction time. This is the same shape as
//! `sentinel-telemetry`'s [`CounterSink`](sentinel_telemetry::CounterSink) —
//! a narrow trait at the seam, so the decision logic here can be unit
//! tested with an in-memory fake instead of a live orderbook or database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_core::{MarketId, Side, Trade, Usd};

/// Resolves available liquidity on the opposite side of the book from a
/// prospective trade (§4.I "liquidity" impact method).
#[async_trait]
pub trait LiquiditySource: Send + Sync {
    /// Summed price×size across the top `depth_levels` of the side
    /// opposite `trade_side` (a buy consumes ask liquidity; a sell
    /// consumes bid liquidity). `None` if no snapshot is available.
    async fn available_liquidity(
        &self,
        token_id: &str,
        trade_side: Side,
        depth_levels: usize,
    ) -> Option<Usd>;
}

/// Resolves rolling trading volume in a market (§4.I "volume" impact
/// method).
#[async_trait]
pub trait VolumeSource: Send + Sync {
    /// Total USD volume traded in `market_id` over the trailing
    /// `lookback_hours`. `None` if unavailable.
    async fn rolling_volume(&self, market_id: &MarketId, lookback_hours: i64) -> Option<Usd>;
}

/// Resolves historical trades for dormancy analysis (§4.I).
#[async_trait]
pub trait TradeHistorySource: Send + Sync {
    /// All trades in `market_id` at or after `since`, newest first.
    async fn trades_since(&self, market_id: &MarketId, since: DateTime<Utc>) -> Vec<Trade>;
}
