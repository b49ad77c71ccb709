//! S2: the same fill reaching the pipeline once from the push feed and
//! once from pull polling must collapse into a single queued trade.

use chrono::Utc;
use rust_decimal_macros::dec;
use sentinel_cache::DedupStore;
use sentinel_core::{ConditionId, Market, MarketId, Side, Tier, TokenId, TradeSource, TxHash, Usd};
use sentinel_ingest::{IngestConfig, MarketLookup, NormalizeContext, NormalizeInput, NormalizeOutcome};
use sentinel_queue::TradeQueue;
use sentinel_telemetry::StatsRegistry;
use std::collections::HashMap;
use std::sync::Arc;

struct FakeRegistry(HashMap<String, Market>);

impl MarketLookup for FakeRegistry {
    fn by_token_id(&self, token_id: &TokenId) -> Option<Market> {
        self.0.get(&token_id.0).cloned()
    }
    fn by_condition_id(&self, _condition_id: &ConditionId) -> Option<Market> {
        None
    }
}

fn market() -> Market {
    Market {
        id: MarketId("m1".into()),
        condition_id: ConditionId("c1".into()),
        token_id_yes: Some(TokenId("y1".into())),
        token_id_no: Some(TokenId("n1".into())),
        question: "?".into(),
        url_slug: "q".into(),
        tier: Tier::One,
        category: "politics".into(),
        enabled: true,
        open_interest: Usd::new(dec!(50000)),
        lifetime_volume: Usd::new(dec!(1_000_000)),
    }
}

fn registry() -> FakeRegistry {
    let mut by_token = HashMap::new();
    by_token.insert("y1".to_string(), market());
    FakeRegistry(by_token)
}

fn input_from(source: TradeSource, tx_hash: &str) -> NormalizeInput {
    NormalizeInput {
        id: format!("{source:?}:y1:1"),
        source,
        token_id: Some("y1".into()),
        condition_id: None,
        side: Side::Buy,
        outcome: None,
        raw_size: dec!(150000),
        raw_price: dec!(0.5),
        taker: Some(sentinel_core::Address::parse("0x1111111111111111111111111111111111111111").unwrap()),
        maker: None,
        raw_timestamp: Utc::now().timestamp_millis(),
        tx_hash: Some(TxHash::parse(tx_hash)),
    }
}

/// The market-data WebSocket push and the indexer pull poller both observe
/// the same on-chain fill; only one trade should ever reach the queue.
#[tokio::test]
async fn push_and_pull_duplicate_collapses_to_one_queued_trade() {
    let registry = registry();
    let dedup = DedupStore::fallback_only();
    let stats = StatsRegistry::new();
    let queue = Arc::new(TradeQueue::new(10, std::sync::Arc::new(stats.clone())));
    let config = IngestConfig::default();
    let ctx = NormalizeContext {
        registry: &registry,
        dedup: &dedup,
        queue: &queue,
        stats: &stats,
        config: &config,
    };

    let push_outcome = sentinel_ingest::normalize_and_submit(input_from(TradeSource::Push, "0xc0ffee"), &ctx).await;
    let pull_outcome = sentinel_ingest::normalize_and_submit(input_from(TradeSource::Pull, "0xc0ffee"), &ctx).await;

    assert_eq!(push_outcome, NormalizeOutcome::Submitted);
    assert_eq!(pull_outcome, NormalizeOutcome::Duplicate);
    assert_eq!(queue.depth(), 1);
    assert_eq!(stats.get("ingest_duplicate"), 1);
    assert_eq!(stats.get("ingest_submitted"), 1);

    let mut consumer = queue.take_consumer().unwrap();
    let delivered = consumer.recv().await.unwrap();
    assert_eq!(delivered.source, TradeSource::Push, "the first-seen source wins the dedup race");
}
