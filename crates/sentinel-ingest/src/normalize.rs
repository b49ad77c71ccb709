//! Shared normalization step for both producers (§4.G): resolve the
//! registry, determine outcome, canonicalize units, validate invariants,
//! dedup, and hand off to the queue. Marking a trade as processed (the
//! dedup store `mark`) happens only once the queue has actually accepted
//! it, never before.

use crate::config::IngestConfig;
use chrono::Utc;
use rust_decimal::Decimal;
use sentinel_cache::DedupStore;
use sentinel_core::{
    Address, ConditionId, Market, Outcome, Probability, Side, TokenAmount, Trade, TokenId, TradeSource, TxHash,
};
use sentinel_queue::TradeQueue;
use sentinel_registry::MarketRegistry;
use sentinel_telemetry::CounterSink;
use tracing::{debug, warn};

/// Narrow read seam over the registry, so normalization can be unit tested
/// against an in-memory fake instead of a registry backed by a live
/// Postgres pool (the same shape as `sentinel_detector`'s source traits).
pub trait MarketLookup: Send + Sync {
    fn by_token_id(&self, token_id: &TokenId) -> Option<Market>;
    fn by_condition_id(&self, condition_id: &ConditionId) -> Option<Market>;
}

impl MarketLookup for MarketRegistry {
    fn by_token_id(&self, token_id: &TokenId) -> Option<Market> {
        MarketRegistry::by_token_id(self, token_id)
    }

    fn by_condition_id(&self, condition_id: &ConditionId) -> Option<Market> {
        MarketRegistry::by_condition_id(self, condition_id)
    }
}

/// A trade candidate from either producer, prior to registry resolution
/// and invariant validation. Push events rarely carry `taker`; pull events
/// are expected to (the indexer resolves signer identity upstream), but
/// `taker` stays optional here so both paths funnel through one function.
#[derive(Debug, Clone)]
pub struct NormalizeInput {
    pub id: String,
    pub source: TradeSource,
    pub token_id: Option<String>,
    pub condition_id: Option<String>,
    pub side: Side,
    pub outcome: Option<Outcome>,
    pub raw_size: Decimal,
    pub raw_price: Decimal,
    pub taker: Option<Address>,
    pub maker: Option<Address>,
    pub raw_timestamp: i64,
    pub tx_hash: Option<TxHash>,
}

/// Above this magnitude a timestamp is assumed to already be in
/// milliseconds; below it, assumed to be in seconds. Epoch seconds stay
/// under 10 digits until the year 2286; epoch milliseconds are 13 digits
/// today, so a line at 10^12 cleanly separates the two without any
/// dependence on the current date.
const MILLIS_MAGNITUDE_FLOOR: i64 = 1_000_000_000_000;

/// Resolve a push/pull timestamp that may be in seconds or milliseconds
/// into canonical milliseconds (§4.G timestamp-unit-ambiguity detection).
pub fn normalize_timestamp_ms(raw: i64) -> i64 {
    if raw.abs() < MILLIS_MAGNITUDE_FLOOR {
        raw.saturating_mul(1000)
    } else {
        raw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeOutcome {
    Submitted,
    Duplicate,
    Dropped(&'static str),
}

/// Collaborators the normalization step needs, grouped so call sites don't
/// have to thread five separate arguments through the push and pull paths.
pub struct NormalizeContext<'a> {
    pub registry: &'a dyn MarketLookup,
    pub dedup: &'a DedupStore,
    pub queue: &'a TradeQueue,
    pub stats: &'a dyn CounterSink,
    pub config: &'a IngestConfig,
}

pub async fn normalize_and_submit(input: NormalizeInput, ctx: &NormalizeContext<'_>) -> NormalizeOutcome {
    let market = match &input.token_id {
        Some(tid) => ctx.registry.by_token_id(&TokenId(tid.clone())),
        None => None,
    }
    .or_else(|| {
        input
            .condition_id
            .as_ref()
            .and_then(|cid| ctx.registry.by_condition_id(&ConditionId(cid.clone())))
    });

    let market = match market {
        Some(m) if m.is_live() => m,
        Some(m) => {
            debug!(market_id = %m.id, "trade for disabled market, dropping");
            ctx.stats.incr("filtered_market_disabled", 1);
            return NormalizeOutcome::Dropped("filtered_market_disabled");
        }
        None => {
            ctx.stats.incr("filtered_no_market_data", 1);
            return NormalizeOutcome::Dropped("filtered_no_market_data");
        }
    };

    let outcome = match &input.token_id {
        Some(tid) if market.token_id_yes.as_ref().is_some_and(|t| &t.0 == tid) => Outcome::Yes,
        Some(tid) if market.token_id_no.as_ref().is_some_and(|t| &t.0 == tid) => Outcome::No,
        _ => match input.outcome {
            Some(o) => o,
            None => {
                ctx.stats.incr("filtered_unknown_outcome", 1);
                return NormalizeOutcome::Dropped("filtered_unknown_outcome");
            }
        },
    };

    let taker = match input.taker {
        Some(a) => a,
        None => {
            debug!(trade_id = %input.id, "no resolvable taker address, dropping");
            ctx.stats.incr("filtered_no_identity", 1);
            return NormalizeOutcome::Dropped("filtered_no_identity");
        }
    };

    if let Some(prefilter) = ctx.config.min_trade_usd_prefilter {
        if input.raw_size * input.raw_price < prefilter {
            ctx.stats.incr("filtered_below_usd_prefilter", 1);
            return NormalizeOutcome::Dropped("filtered_below_usd_prefilter");
        }
    }

    let timestamp_ms = normalize_timestamp_ms(input.raw_timestamp);
    let age_minutes = (Utc::now().timestamp_millis() - timestamp_ms) as f64 / 60_000.0;
    if age_minutes > ctx.config.max_trade_age_minutes as f64 {
        ctx.stats.incr("filtered_trade_too_old", 1);
        return NormalizeOutcome::Dropped("filtered_trade_too_old");
    }

    let trade = match Trade::new(
        input.id.clone(),
        market.id.clone(),
        input.side,
        outcome,
        TokenAmount::new(input.raw_size),
        Probability::new(input.raw_price),
        taker,
        input.maker,
        timestamp_ms,
        input.source,
        input.tx_hash,
    ) {
        Ok(t) => t,
        Err(e) => {
            warn!(trade_id = %input.id, error = %e, "invalid trade, dropping without marking processed");
            ctx.stats.incr("filtered_invalid_trade", 1);
            return NormalizeOutcome::Dropped("filtered_invalid_trade");
        }
    };

    let dedup_key = trade.dedup_key();
    if ctx.dedup.contains(&dedup_key).await {
        ctx.stats.incr("ingest_duplicate", 1);
        return NormalizeOutcome::Duplicate;
    }

    if ctx.queue.submit(trade) {
        ctx.dedup.mark(&dedup_key, ctx.config.dedup_ttl()).await;
        ctx.stats.incr("ingest_submitted", 1);
        NormalizeOutcome::Submitted
    } else {
        ctx.stats.incr("ingest_queue_full", 1);
        NormalizeOutcome::Dropped("ingest_queue_full")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sentinel_core::{MarketId, Tier, Usd};
    use sentinel_telemetry::StatsRegistry;
    use std::collections::HashMap;

    #[test]
    fn seconds_magnitude_is_scaled_to_millis() {
        assert_eq!(normalize_timestamp_ms(1_700_000_000), 1_700_000_000_000);
    }

    #[test]
    fn millis_magnitude_passes_through() {
        assert_eq!(normalize_timestamp_ms(1_700_000_000_000), 1_700_000_000_000);
    }

    struct FakeLookup {
        by_token: HashMap<String, Market>,
        by_condition: HashMap<String, Market>,
    }

    impl MarketLookup for FakeLookup {
        fn by_token_id(&self, token_id: &TokenId) -> Option<Market> {
            self.by_token.get(&token_id.0).cloned()
        }

        fn by_condition_id(&self, condition_id: &ConditionId) -> Option<Market> {
            self.by_condition.get(&condition_id.0).cloned()
        }
    }

    fn sample_market(enabled: bool) -> Market {
        Market {
            id: MarketId("m1".into()),
            condition_id: ConditionId("c1".into()),
            token_id_yes: Some(TokenId("y1".into())),
            token_id_no: Some(TokenId("n1".into())),
            question: "?".into(),
            url_slug: "q".into(),
            tier: Tier::One,
            category: "politics".into(),
            enabled,
            open_interest: Usd::new(dec!(50000)),
            lifetime_volume: Usd::new(dec!(1000000)),
        }
    }

    fn lookup(enabled: bool) -> FakeLookup {
        let market = sample_market(enabled);
        let mut by_token = HashMap::new();
        by_token.insert("y1".to_string(), market.clone());
        by_token.insert("n1".to_string(), market.clone());
        let mut by_condition = HashMap::new();
        by_condition.insert("c1".to_string(), market);
        FakeLookup { by_token, by_condition }
    }

    fn taker() -> Address {
        Address::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    fn base_input() -> NormalizeInput {
        NormalizeInput {
            id: "push:y1:1".into(),
            source: TradeSource::Push,
            token_id: Some("y1".into()),
            condition_id: None,
            side: Side::Buy,
            outcome: None,
            raw_size: dec!(200000),
            raw_price: dec!(0.5),
            taker: Some(taker()),
            maker: None,
            raw_timestamp: Utc::now().timestamp_millis(),
            tx_hash: None,
        }
    }

    async fn run(input: NormalizeInput, registry: &dyn MarketLookup) -> NormalizeOutcome {
        let dedup = DedupStore::fallback_only();
        let stats = StatsRegistry::new();
        let queue = TradeQueue::new(10, std::sync::Arc::new(stats.clone()));
        let config = IngestConfig::default();
        let ctx = NormalizeContext {
            registry,
            dedup: &dedup,
            queue: &queue,
            stats: &stats,
            config: &config,
        };
        normalize_and_submit(input, &ctx).await
    }

    #[tokio::test]
    async fn valid_trade_is_submitted_and_outcome_derived_from_token() {
        let registry = lookup(true);
        let outcome = run(base_input(), &registry).await;
        assert_eq!(outcome, NormalizeOutcome::Submitted);
    }

    #[tokio::test]
    async fn unknown_market_is_dropped_without_marking_processed() {
        let registry = lookup(true);
        let mut input = base_input();
        input.token_id = Some("unknown".into());
        let outcome = run(input, &registry).await;
        assert_eq!(outcome, NormalizeOutcome::Dropped("filtered_no_market_data"));
    }

    #[tokio::test]
    async fn disabled_market_is_dropped() {
        let registry = lookup(false);
        let outcome = run(base_input(), &registry).await;
        assert_eq!(outcome, NormalizeOutcome::Dropped("filtered_market_disabled"));
    }

    #[tokio::test]
    async fn missing_taker_is_dropped_as_no_identity() {
        let registry = lookup(true);
        let mut input = base_input();
        input.taker = None;
        let outcome = run(input, &registry).await;
        assert_eq!(outcome, NormalizeOutcome::Dropped("filtered_no_identity"));
    }

    #[tokio::test]
    async fn invalid_price_is_dropped_as_invalid_trade() {
        let registry = lookup(true);
        let mut input = base_input();
        input.raw_price = dec!(1.5);
        let outcome = run(input, &registry).await;
        assert_eq!(outcome, NormalizeOutcome::Dropped("filtered_invalid_trade"));
    }

    #[tokio::test]
    async fn stale_trade_is_dropped() {
        let registry = lookup(true);
        let mut input = base_input();
        input.raw_timestamp = Utc::now().timestamp_millis() - 2 * 60 * 60 * 1000;
        let outcome = run(input, &registry).await;
        assert_eq!(outcome, NormalizeOutcome::Dropped("filtered_trade_too_old"));
    }

    #[tokio::test]
    async fn duplicate_same_tx_hash_is_collapsed() {
        let registry = lookup(true);
        let dedup = DedupStore::fallback_only();
        let stats = StatsRegistry::new();
        let queue = TradeQueue::new(10, std::sync::Arc::new(stats.clone()));
        let config = IngestConfig::default();
        let mut input = base_input();
        input.tx_hash = Some(TxHash::parse("0xdeadbeef"));

        let ctx = NormalizeContext {
            registry: &registry,
            dedup: &dedup,
            queue: &queue,
            stats: &stats,
            config: &config,
        };
        let first = normalize_and_submit(input.clone(), &ctx).await;
        let second = normalize_and_submit(input, &ctx).await;
        assert_eq!(first, NormalizeOutcome::Submitted);
        assert_eq!(second, NormalizeOutcome::Duplicate);
        assert_eq!(stats.get("ingest_duplicate"), 1);
    }

    #[tokio::test]
    async fn below_prefilter_is_dropped() {
        let registry = lookup(true);
        let dedup = DedupStore::fallback_only();
        let stats = StatsRegistry::new();
        let queue = TradeQueue::new(10, std::sync::Arc::new(stats.clone()));
        let mut config = IngestConfig::default();
        config.min_trade_usd_prefilter = Some(dec!(1_000_000));
        let ctx = NormalizeContext {
            registry: &registry,
            dedup: &dedup,
            queue: &queue,
            stats: &stats,
            config: &config,
        };
        let outcome = normalize_and_submit(base_input(), &ctx).await;
        assert_eq!(outcome, NormalizeOutcome::Dropped("filtered_below_usd_prefilter"));
    }
}
