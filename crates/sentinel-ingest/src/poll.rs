//! Pull poller (§4.G.2): periodically sweeps exchange trades for every
//! enabled market, with a startup grace delay, priority-fetch debouncing
//! driven by push price-change events, backpressure-aware cycle skipping,
//! and an inter-batch delay that widens under upstream pressure and
//! narrows back down when things are calm.

use crate::config::IngestConfig;
use crate::normalize::{normalize_and_submit, MarketLookup, NormalizeContext, NormalizeInput};
use sentinel_cache::DedupStore;
use sentinel_clients::MarketDataClient;
use sentinel_core::{ConditionId, TradeSource};
use sentinel_queue::TradeQueue;
use sentinel_resilience::RateLimiter;
use sentinel_telemetry::CounterSink;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Tracks the last time each condition id was priority-fetched, so a burst
/// of price-change events for the same market collapses into one fetch
/// every `debounce` interval rather than one per event.
struct PriorityDebouncer {
    last_fetch: Mutex<HashMap<ConditionId, Instant>>,
    debounce: Duration,
}

impl PriorityDebouncer {
    fn new(debounce: Duration) -> Self {
        Self {
            last_fetch: Mutex::new(HashMap::new()),
            debounce,
        }
    }

    /// Returns `true` if this condition id is due for a priority fetch
    /// right now, and records the attempt either way so a caller that
    /// decides not to act doesn't need to track state itself.
    async fn should_fetch(&self, condition_id: &ConditionId) -> bool {
        let mut last_fetch = self.last_fetch.lock().await;
        let now = Instant::now();
        match last_fetch.get(condition_id) {
            Some(&last) if now.duration_since(last) < self.debounce => false,
            _ => {
                last_fetch.insert(condition_id.clone(), now);
                true
            }
        }
    }
}

/// Widens the delay between poll batches under upstream pressure (rate
/// limiter backing off, queue near capacity) and narrows it back toward
/// the configured minimum once things are calm, rather than polling at a
/// fixed cadence regardless of how the upstream is responding.
struct AdaptiveDelay {
    current_ms: Mutex<u64>,
    min_ms: u64,
    max_ms: u64,
}

impl AdaptiveDelay {
    fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            current_ms: Mutex::new(min_ms),
            min_ms,
            max_ms,
        }
    }

    async fn widen(&self) {
        let mut current = self.current_ms.lock().await;
        *current = (*current * 2).min(self.max_ms);
    }

    async fn narrow(&self) {
        let mut current = self.current_ms.lock().await;
        *current = (*current / 2).max(self.min_ms);
    }

    async fn delay(&self) -> Duration {
        Duration::from_millis(*self.current_ms.lock().await)
    }
}

pub struct PullPoller {
    registry: Arc<dyn MarketLookup>,
    market_data: Arc<dyn MarketDataClient>,
    market_data_limiter: Arc<RateLimiter>,
    dedup: Arc<DedupStore>,
    queue: Arc<TradeQueue>,
    stats: Arc<dyn CounterSink>,
    config: IngestConfig,
    debouncer: PriorityDebouncer,
    adaptive_delay: AdaptiveDelay,
    enabled_condition_ids: Box<dyn Fn() -> Vec<ConditionId> + Send + Sync>,
}

impl PullPoller {
    pub fn new(
        registry: Arc<dyn MarketLookup>,
        market_data: Arc<dyn MarketDataClient>,
        market_data_limiter: Arc<RateLimiter>,
        dedup: Arc<DedupStore>,
        queue: Arc<TradeQueue>,
        stats: Arc<dyn CounterSink>,
        config: IngestConfig,
        enabled_condition_ids: impl Fn() -> Vec<ConditionId> + Send + Sync + 'static,
    ) -> Self {
        let debouncer = PriorityDebouncer::new(config.priority_fetch_debounce());
        let adaptive_delay = AdaptiveDelay::new(config.min_inter_batch_delay_ms, config.max_inter_batch_delay_ms);
        Self {
            registry,
            market_data,
            market_data_limiter,
            dedup,
            queue,
            stats,
            config,
            debouncer,
            adaptive_delay,
            enabled_condition_ids: Box::new(enabled_condition_ids),
        }
    }

    /// Drive the poll loop until `shutdown` fires. Waits out the startup
    /// grace period first so a freshly-restarted instance doesn't flood
    /// the upstream while the registry is still loading.
    pub async fn run(&self, priority_rx: mpsc::Receiver<ConditionId>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        tokio::time::sleep(self.config.startup_grace()).await;
        info!("pull poller starting after startup grace period");

        let priority_rx = Arc::new(Mutex::new(priority_rx));
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("pull poller shutting down");
                        return;
                    }
                }
                _ = self.run_cycle(&priority_rx) => {}
            }
        }
    }

    async fn run_cycle(&self, priority_rx: &Arc<Mutex<mpsc::Receiver<ConditionId>>>) {
        self.drain_priority_fetches(priority_rx).await;

        if self.queue.is_under_pressure() {
            debug!("queue under pressure, skipping poll cycle");
            self.stats.incr("poll_cycle_skipped_queue_pressure", 1);
            tokio::time::sleep(self.config.poll_interval()).await;
            return;
        }

        if self.market_data_limiter.is_backing_off() {
            debug!("market-data upstream backing off, skipping poll cycle");
            self.stats.incr("poll_cycle_skipped_rate_limit", 1);
            tokio::time::sleep(self.config.poll_interval()).await;
            return;
        }

        let condition_ids = (self.enabled_condition_ids)();
        self.poll_batches(&condition_ids).await;
        tokio::time::sleep(self.config.poll_interval()).await;
    }

    /// Drain any pending priority-fetch signals without blocking the main
    /// cycle; each one due for a fetch (per debounce) is polled immediately
    /// and out of band from the regular sweep.
    async fn drain_priority_fetches(&self, priority_rx: &Arc<Mutex<mpsc::Receiver<ConditionId>>>) {
        let mut rx = priority_rx.lock().await;
        let mut due = Vec::new();
        while let Ok(condition_id) = rx.try_recv() {
            if self.debouncer.should_fetch(&condition_id).await {
                due.push(condition_id);
            }
        }
        drop(rx);
        if !due.is_empty() {
            debug!(count = due.len(), "priority-fetching debounced condition ids");
            self.poll_batches(&due).await;
        }
    }

    /// Poll condition ids in chunks, applying the adaptive inter-batch
    /// delay between chunks so a long sweep doesn't hammer the upstream at
    /// full speed.
    async fn poll_batches(&self, condition_ids: &[ConditionId]) {
        for chunk in condition_ids.chunks(self.config.poll_chunk_size.max(1)) {
            for condition_id in chunk {
                self.poll_one(condition_id).await;
            }
            if condition_ids.len() > self.config.poll_chunk_size {
                tokio::time::sleep(self.adaptive_delay.delay().await).await;
            }
        }
    }

    async fn poll_one(&self, condition_id: &ConditionId) {
        let result = self
            .market_data
            .exchange_trades(
                &condition_id.0,
                self.config.min_trade_usd_prefilter,
                self.config.exchange_trades_limit,
            )
            .await;

        let trades = match result {
            Ok(trades) => {
                self.market_data_limiter.note_success();
                self.adaptive_delay.narrow().await;
                trades
            }
            Err(e) => {
                warn!(condition_id = %condition_id.0, error = %e, "exchange trades fetch failed");
                self.adaptive_delay.widen().await;
                self.stats.incr("poll_fetch_failed", 1);
                return;
            }
        };

        for trade in trades {
            let input = NormalizeInput {
                id: format!("pull:{}:{}", condition_id.0, trade.trade_id),
                source: TradeSource::Pull,
                token_id: Some(trade.token_id),
                condition_id: Some(condition_id.0.clone()),
                side: trade.side,
                outcome: Some(trade.outcome),
                raw_size: trade.size,
                raw_price: trade.price,
                taker: trade.taker,
                maker: trade.maker,
                raw_timestamp: trade.timestamp_ms,
                tx_hash: trade.tx_hash.as_deref().map(sentinel_core::TxHash::parse),
            };
            let ctx = NormalizeContext {
                registry: self.registry.as_ref(),
                dedup: &self.dedup,
                queue: &self.queue,
                stats: self.stats.as_ref(),
                config: &self.config,
            };
            normalize_and_submit(input, &ctx).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn debouncer_suppresses_repeat_fetches_within_window() {
        let debouncer = PriorityDebouncer::new(Duration::from_millis(30));
        let cid = ConditionId("c1".into());
        assert!(debouncer.should_fetch(&cid).await);
        assert!(!debouncer.should_fetch(&cid).await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(debouncer.should_fetch(&cid).await);
    }

    #[tokio::test]
    async fn adaptive_delay_widens_and_narrows_within_bounds() {
        let delay = AdaptiveDelay::new(200, 5_000);
        assert_eq!(delay.delay().await, Duration::from_millis(200));
        delay.widen().await;
        assert_eq!(delay.delay().await, Duration::from_millis(400));
        for _ in 0..10 {
            delay.widen().await;
        }
        assert_eq!(delay.delay().await, Duration::from_millis(5_000));
        delay.narrow().await;
        assert!(delay.delay().await < Duration::from_millis(5_000));
        for _ in 0..10 {
            delay.narrow().await;
        }
        assert_eq!(delay.delay().await, Duration::from_millis(200));
    }
}
