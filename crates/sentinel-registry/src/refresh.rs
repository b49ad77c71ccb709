//! Periodic open-interest/volume refresh job (§4.F): every 10 minutes,
//! pull current liquidity figures for all enabled markets and write them
//! through to the in-memory registry and the relational store.

use crate::registry::MarketRegistry;
use sentinel_clients::MarketDataClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

/// Runs `registry.refresh_all()` on a fixed interval until cancelled.
/// Intended to be spawned as its own task by the orchestrator and aborted
/// on shutdown.
pub async fn run_refresh_loop(
    registry: Arc<MarketRegistry>,
    market_data: Arc<dyn MarketDataClient>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so refresh doesn't race
    // the startup load.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        info!("running periodic market liquidity refresh");
        registry.refresh_all(market_data.as_ref()).await;
    }
}
