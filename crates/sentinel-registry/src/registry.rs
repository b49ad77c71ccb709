//! In-memory authoritative market set, backed by the relational store, with
//! multi-key indexing and a periodic liquidity refresh job (§4.F).

use crate::error::{RegistryError, RegistryResult};
use dashmap::DashMap;
use sentinel_clients::MarketDataClient;
use sentinel_core::{ConditionId, Market, MarketId, Tier, TokenId};
use sentinel_persistence::PersistenceStore;
use sentinel_telemetry::Metrics;
use std::sync::Arc;
use tracing::{info, warn};

/// Anything the registry can push subscription changes to. Implemented by
/// `sentinel_clients::MarketFeedClient`; kept as a trait here so the
/// registry doesn't need to know about WebSocket transport details.
pub trait SubscriptionSink: Send + Sync {
    fn subscribe(&self, token_id: &str);
    fn unsubscribe(&self, token_id: &str);
}

/// The enabled-market set, indexed by id, condition id, and token id.
pub struct MarketRegistry {
    by_id: DashMap<MarketId, Market>,
    by_condition: DashMap<ConditionId, MarketId>,
    by_token: DashMap<TokenId, MarketId>,
    store: PersistenceStore,
    feed: Arc<dyn SubscriptionSink>,
}

impl MarketRegistry {
    pub fn new(store: PersistenceStore, feed: Arc<dyn SubscriptionSink>) -> Self {
        Self {
            by_id: DashMap::new(),
            by_condition: DashMap::new(),
            by_token: DashMap::new(),
            store,
            feed,
        }
    }

    /// Load the full market set from the relational store into memory and
    /// subscribe the feed to every enabled market's token ids. Called once
    /// at startup (§5).
    pub async fn load(&self) -> RegistryResult<()> {
        let markets = sentinel_persistence::load_all_markets(self.store.pool()).await?;
        let count = markets.len();
        for market in markets {
            self.index(market.clone());
            if market.enabled {
                for token in market.token_ids() {
                    self.feed.subscribe(&token.0);
                }
            }
        }
        Metrics::ws_subscribed_tokens(self.by_token.len() as i64);
        info!(count, "loaded markets into registry");
        Ok(())
    }

    fn index(&self, market: Market) {
        self.by_condition
            .insert(market.condition_id.clone(), market.id.clone());
        for token in market.token_ids() {
            self.by_token.insert(token, market.id.clone());
        }
        self.by_id.insert(market.id.clone(), market);
    }

    pub fn by_id(&self, id: &MarketId) -> Option<Market> {
        self.by_id.get(id).map(|r| r.clone())
    }

    pub fn by_condition_id(&self, condition_id: &ConditionId) -> Option<Market> {
        let id = self.by_condition.get(condition_id)?.clone();
        self.by_id(&id)
    }

    pub fn by_token_id(&self, token_id: &TokenId) -> Option<Market> {
        let id = self.by_token.get(token_id)?.clone();
        self.by_id(&id)
    }

    pub fn by_tier(&self, tier: Tier) -> Vec<Market> {
        self.by_id
            .iter()
            .filter(|r| r.tier == tier)
            .map(|r| r.clone())
            .collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<Market> {
        self.by_id
            .iter()
            .filter(|r| r.category == category)
            .map(|r| r.clone())
            .collect()
    }

    /// All condition ids of currently enabled markets, for indexer queries
    /// and priority-fetch bookkeeping.
    pub fn enabled_condition_ids(&self) -> Vec<ConditionId> {
        self.by_id
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.condition_id.clone())
            .collect()
    }

    /// All token ids of currently enabled markets, for WebSocket
    /// resubscription and orderbook lookups.
    pub fn enabled_token_ids(&self) -> Vec<TokenId> {
        self.by_id
            .iter()
            .filter(|r| r.enabled)
            .flat_map(|r| r.token_ids())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Add (or replace) a market, persist it, index it, and subscribe the
    /// feed to its token ids. Mutates the in-memory map and the WebSocket
    /// subscription set atomically with respect to readers: the feed
    /// subscribe happens after the index insert is visible, so a
    /// concurrent lookup either sees the old or the fully-indexed new
    /// market, never a partial one.
    pub async fn add_market(&self, market: Market) -> RegistryResult<()> {
        if let Some(existing_id) = self.by_condition.get(&market.condition_id) {
            if *existing_id != market.id {
                return Err(RegistryError::DuplicateConditionId(
                    market.condition_id.0.clone(),
                ));
            }
        }
        for token in market.token_ids() {
            if let Some(existing_id) = self.by_token.get(&token) {
                if *existing_id != market.id {
                    return Err(RegistryError::DuplicateTokenId(token.0));
                }
            }
        }

        sentinel_persistence::upsert_market(self.store.pool(), &market).await?;
        let tokens = market.token_ids();
        let enabled = market.enabled;
        self.index(market);
        if enabled {
            for token in &tokens {
                self.feed.subscribe(&token.0);
            }
        }
        Metrics::ws_subscribed_tokens(self.by_token.len() as i64);
        Ok(())
    }

    /// Disable a market, purge its live subscriptions, and persist the
    /// disabled state. The in-memory record is kept (for historical
    /// lookups) but `enabled` flips false and `enabled_*` views stop
    /// returning it.
    pub async fn disable_market(&self, id: &MarketId) -> RegistryResult<()> {
        sentinel_persistence::disable_market(self.store.pool(), id).await?;
        if let Some(mut entry) = self.by_id.get_mut(id) {
            entry.enabled = false;
            for token in entry.token_ids() {
                self.feed.unsubscribe(&token.0);
            }
        } else {
            return Err(RegistryError::MarketNotFound(id.0.clone()));
        }
        Metrics::ws_subscribed_tokens(self.by_token.len() as i64);
        Ok(())
    }

    /// Refresh one market's open-interest and lifetime-volume figures from
    /// the market-data upstream, persist, and update the in-memory copy.
    pub async fn refresh_liquidity(
        &self,
        id: &MarketId,
        market_data: &dyn MarketDataClient,
    ) -> RegistryResult<()> {
        let condition_id = match self.by_id.get(id) {
            Some(m) => m.condition_id.clone(),
            None => return Err(RegistryError::MarketNotFound(id.0.clone())),
        };
        let (open_interest, lifetime_volume) =
            market_data.market_liquidity(&condition_id.0).await?;
        sentinel_persistence::update_market_liquidity(
            self.store.pool(),
            id,
            open_interest,
            lifetime_volume,
        )
        .await?;
        if let Some(mut entry) = self.by_id.get_mut(id) {
            entry.open_interest = open_interest;
            entry.lifetime_volume = lifetime_volume;
        }
        Ok(())
    }

    /// Refresh every enabled market's liquidity figures, logging but not
    /// aborting on a single market's failure so one bad upstream response
    /// doesn't stall the whole refresh pass.
    pub async fn refresh_all(&self, market_data: &dyn MarketDataClient) {
        let ids: Vec<MarketId> = self
            .by_id
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.id.clone())
            .collect();
        for id in ids {
            if let Err(e) = self.refresh_liquidity(&id, market_data).await {
                warn!(market_id = %id, error = %e, "liquidity refresh failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use sentinel_core::Usd;

    struct RecordingSink {
        subscribed: Mutex<Vec<String>>,
        unsubscribed: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                subscribed: Mutex::new(Vec::new()),
                unsubscribed: Mutex::new(Vec::new()),
            }
        }
    }

    impl SubscriptionSink for RecordingSink {
        fn subscribe(&self, token_id: &str) {
            self.subscribed.lock().push(token_id.to_string());
        }
        fn unsubscribe(&self, token_id: &str) {
            self.unsubscribed.lock().push(token_id.to_string());
        }
    }

    fn sample_market(id: &str, condition: &str) -> Market {
        Market {
            id: MarketId(id.into()),
            condition_id: ConditionId(condition.into()),
            token_id_yes: Some(TokenId(format!("{id}-yes"))),
            token_id_no: Some(TokenId(format!("{id}-no"))),
            question: "Will X happen?".into(),
            url_slug: "will-x-happen".into(),
            tier: Tier::One,
            category: "politics".into(),
            enabled: true,
            open_interest: Usd::new(dec!(1000)),
            lifetime_volume: Usd::new(dec!(5000)),
        }
    }

    #[test]
    fn recording_sink_tracks_subscribe_and_unsubscribe() {
        let sink = RecordingSink::new();
        sink.subscribe("tok-1");
        sink.subscribe("tok-2");
        sink.unsubscribe("tok-1");
        assert_eq!(*sink.subscribed.lock(), vec!["tok-1", "tok-2"]);
        assert_eq!(*sink.unsubscribed.lock(), vec!["tok-1"]);
    }

    #[test]
    fn by_tier_and_category_filter_correctly() {
        let by_id = DashMap::new();
        let by_condition = DashMap::new();
        let by_token = DashMap::new();
        let m1 = sample_market("m1", "c1");
        let mut m2 = sample_market("m2", "c2");
        m2.tier = Tier::Two;
        m2.category = "sports".into();

        for m in [m1.clone(), m2.clone()] {
            by_condition.insert(m.condition_id.clone(), m.id.clone());
            for t in m.token_ids() {
                by_token.insert(t, m.id.clone());
            }
            by_id.insert(m.id.clone(), m);
        }

        let tier_one: Vec<_> = by_id.iter().filter(|r| r.tier == Tier::One).collect();
        assert_eq!(tier_one.len(), 1);
        let sports: Vec<_> = by_id.iter().filter(|r| r.category == "sports").collect();
        assert_eq!(sports.len(), 1);
    }
}
