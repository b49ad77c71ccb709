//! Push subscriber (§4.G.1): consumes parsed market-feed events and feeds
//! the common normalization step. Trade events without a resolvable taker
//! are dropped; price-change events are forwarded as priority-fetch
//! triggers for the pull poller to debounce and act on.
//!
//! Runs in the task that owns the WebSocket reader's event channel (§5:
//! "handlers must be non-blocking and enqueue work rather than processing
//! inline") — the only blocking-shaped work here is the bounded mpsc send
//! to the priority-fetch channel, which is itself non-blocking via
//! `try_send`.

use crate::config::IngestConfig;
use crate::normalize::{normalize_and_submit, NormalizeContext, NormalizeInput, MarketLookup};
use sentinel_cache::DedupStore;
use sentinel_clients::{MarketFeedEvent, TradeEvent};
use sentinel_core::{Address, ConditionId, Outcome, Side, TokenId, TradeSource};
use sentinel_queue::TradeQueue;
use sentinel_registry::MarketRegistry;
use sentinel_telemetry::CounterSink;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

fn parse_side(raw: &str) -> Side {
    if raw.eq_ignore_ascii_case("sell") {
        Side::Sell
    } else {
        Side::Buy
    }
}

fn to_normalize_input(event: TradeEvent) -> NormalizeInput {
    let taker = event.taker.as_deref().and_then(|raw| Address::parse(raw).ok());
    NormalizeInput {
        id: format!("push:{}:{}", event.asset_id, event.trade_id),
        source: TradeSource::Push,
        token_id: Some(event.asset_id),
        condition_id: None,
        side: parse_side(&event.side),
        outcome: None::<Outcome>,
        raw_size: event.size,
        raw_price: event.price,
        taker,
        maker: None,
        raw_timestamp: event.timestamp_ms,
        tx_hash: None,
    }
}

pub struct PushSubscriber {
    registry: Arc<MarketRegistry>,
    dedup: Arc<DedupStore>,
    queue: Arc<TradeQueue>,
    stats: Arc<dyn CounterSink>,
    config: IngestConfig,
}

impl PushSubscriber {
    pub fn new(
        registry: Arc<MarketRegistry>,
        dedup: Arc<DedupStore>,
        queue: Arc<TradeQueue>,
        stats: Arc<dyn CounterSink>,
        config: IngestConfig,
    ) -> Self {
        Self {
            registry,
            dedup,
            queue,
            stats,
            config,
        }
    }

    /// Drain the WebSocket event channel until the sender side is dropped
    /// (feed client shut down). `priority_tx` carries condition ids whose
    /// price just moved, for the poller to debounce and act on.
    pub async fn run(
        &self,
        mut event_rx: mpsc::Receiver<MarketFeedEvent>,
        priority_tx: mpsc::Sender<ConditionId>,
    ) {
        while let Some(event) = event_rx.recv().await {
            self.handle_event(event, &priority_tx).await;
        }
        debug!("market feed event channel closed, push subscriber exiting");
    }

    async fn handle_event(&self, event: MarketFeedEvent, priority_tx: &mpsc::Sender<ConditionId>) {
        match event {
            MarketFeedEvent::Trade(trade_event) => {
                let input = to_normalize_input(trade_event);
                let ctx = NormalizeContext {
                    registry: self.registry.as_ref() as &dyn MarketLookup,
                    dedup: &self.dedup,
                    queue: &self.queue,
                    stats: self.stats.as_ref(),
                    config: &self.config,
                };
                normalize_and_submit(input, &ctx).await;
            }
            MarketFeedEvent::PriceChange(price_change) => {
                if let Some(market) = self.registry.by_token_id(&TokenId(price_change.asset_id)) {
                    if priority_tx.try_send(market.condition_id).is_err() {
                        trace!("priority-fetch channel full or closed, dropping trigger");
                    }
                }
            }
            // Book snapshots, tick-size changes, and last-trade-price updates
            // carry no taker identity and are not scored directly (§9: don't
            // score off push events); they exist purely for venues that want
            // a live orderbook view, which is out of this pipeline's scope.
            MarketFeedEvent::Book(_)
            | MarketFeedEvent::TickSizeChange(_)
            | MarketFeedEvent::LastTradePrice(_) => {}
        }
    }
}
