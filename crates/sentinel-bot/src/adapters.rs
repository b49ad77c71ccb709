//! Adapters wiring the detector's narrow data-source seams
//! ([`LiquiditySource`], [`VolumeSource`], [`TradeHistorySource`]) onto the
//! concrete market-data client and relational store. These traits live in
//! `sentinel-detector` precisely so it has no compile-time dependency on
//! `sentinel-clients` or `sentinel-persistence`; only the orchestrator
//! needs to know about both.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use sentinel_clients::{MarketDataClient, OrderbookSnapshot};
use sentinel_core::{MarketId, Side, Trade, Usd};
use sentinel_detector::{LiquiditySource, TradeHistorySource, VolumeSource};
use sentinel_persistence::PersistenceStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Trades pulled for rolling-volume and dormancy scans go back further
/// than any single lookback window so both can share one query shape.
const HISTORY_QUERY_LIMIT: i64 = 5_000;

struct CachedSnapshot {
    fetched_at: Instant,
    snapshot: OrderbookSnapshot,
}

/// Resolves available liquidity from the market-data client's orderbook
/// snapshot, with a short per-token cache so a burst of trades against the
/// same token doesn't refetch the book on every one (§4.I).
pub struct OrderbookLiquiditySource {
    market_data: Arc<dyn MarketDataClient>,
    cache: DashMap<String, CachedSnapshot>,
    ttl: Duration,
}

impl OrderbookLiquiditySource {
    pub fn new(market_data: Arc<dyn MarketDataClient>, ttl: Duration) -> Self {
        Self {
            market_data,
            cache: DashMap::new(),
            ttl,
        }
    }

    async fn snapshot(&self, token_id: &str) -> Option<OrderbookSnapshot> {
        if let Some(cached) = self.cache.get(token_id) {
            if cached.fetched_at.elapsed() < self.ttl {
                return Some(cached.snapshot.clone());
            }
        }
        match self.market_data.orderbook_snapshot(token_id).await {
            Ok(snapshot) => {
                self.cache.insert(
                    token_id.to_string(),
                    CachedSnapshot {
                        fetched_at: Instant::now(),
                        snapshot: snapshot.clone(),
                    },
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!(token_id, error = %e, "orderbook snapshot fetch failed");
                None
            }
        }
    }
}

#[async_trait]
impl LiquiditySource for OrderbookLiquiditySource {
    async fn available_liquidity(&self, token_id: &str, trade_side: Side, depth_levels: usize) -> Option<Usd> {
        let snapshot = self.snapshot(token_id).await?;
        // A buy consumes resting asks; a sell consumes resting bids.
        let side_is_bid = trade_side == Side::Sell;
        Some(snapshot.liquidity_usd(side_is_bid, depth_levels))
    }
}

/// Resolves rolling market volume from the relational trade history rather
/// than the upstream market-data client, since the venue's own volume
/// figures are only available at the market level, not in a
/// caller-chosen lookback window.
pub struct PersistedVolumeSource {
    store: PersistenceStore,
}

impl PersistedVolumeSource {
    pub fn new(store: PersistenceStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl VolumeSource for PersistedVolumeSource {
    async fn rolling_volume(&self, market_id: &MarketId, lookback_hours: i64) -> Option<Usd> {
        let since = Utc::now() - ChronoDuration::hours(lookback_hours);
        match sentinel_persistence::recent_trades_for_market(self.store.pool(), market_id, since, HISTORY_QUERY_LIMIT)
            .await
        {
            Ok(trades) => Some(Usd::new(trades.iter().map(|t| t.usd_value().inner()).sum())),
            Err(e) => {
                warn!(market_id = %market_id.0, error = %e, "rolling volume query failed");
                None
            }
        }
    }
}

/// Resolves dormancy-scan trade history from the relational store.
pub struct PersistedTradeHistorySource {
    store: PersistenceStore,
}

impl PersistedTradeHistorySource {
    pub fn new(store: PersistenceStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TradeHistorySource for PersistedTradeHistorySource {
    async fn trades_since(&self, market_id: &MarketId, since: DateTime<Utc>) -> Vec<Trade> {
        sentinel_persistence::recent_trades_for_market(self.store.pool(), market_id, since, HISTORY_QUERY_LIMIT)
            .await
            .unwrap_or_else(|e| {
                warn!(market_id = %market_id.0, error = %e, "trade history query failed");
                Vec::new()
            })
    }
}
