//! Market-data HTTP client: exchange trades, user activity summary, and
//! orderbook snapshots (§4.E).

use crate::error::{ClientError, Result};
use crate::retry::{call_with_resilience, ensure_success, RetryPolicy};
use reqwest::Client;
use rust_decimal::Decimal;
use sentinel_core::{Address, Outcome, Side, Usd};
use sentinel_resilience::{CircuitBreaker, RateLimiter};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ExchangeTrade {
    pub trade_id: String,
    pub condition_id: String,
    pub token_id: String,
    pub side: Side,
    pub outcome: Outcome,
    pub size: Decimal,
    pub price: Decimal,
    pub taker: Option<Address>,
    pub maker: Option<Address>,
    pub timestamp_ms: i64,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserActivitySummary {
    pub lifetime_trade_count: u64,
    pub lifetime_usd_volume: Usd,
    pub markets_traded: u32,
}

/// One price level: `(price, size)`.
pub type PriceLevel = (Decimal, Decimal);

#[derive(Debug, Clone)]
pub struct OrderbookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderbookSnapshot {
    /// Sum of `price * size` across the top `depth` levels of one side,
    /// used as available-liquidity for impact gating (§4.I).
    pub fn liquidity_usd(&self, side_is_bid: bool, depth: usize) -> Usd {
        let levels = if side_is_bid { &self.bids } else { &self.asks };
        let total: Decimal = levels.iter().take(depth).map(|(p, s)| p * s).sum();
        Usd::new(total)
    }
}

#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Trades for a market sorted most-recent-first, filtered to at least
    /// `min_usd`, capped at `limit`.
    async fn exchange_trades(
        &self,
        condition_id: &str,
        min_usd: Option<Decimal>,
        limit: u32,
    ) -> Result<Vec<ExchangeTrade>>;
    async fn user_activity_summary(&self, address: &Address) -> Result<UserActivitySummary>;
    async fn orderbook_snapshot(&self, token_id: &str) -> Result<OrderbookSnapshot>;
    /// Current open-interest and lifetime volume for a market, used by the
    /// registry's periodic refresh job (§4.F).
    async fn market_liquidity(&self, condition_id: &str) -> Result<(Usd, Usd)>;
}

pub struct HttpMarketDataClient {
    http: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl HttpMarketDataClient {
    pub fn new(
        base_url: impl Into<String>,
        http: Client,
        rate_limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            rate_limiter,
            breaker,
            policy: RetryPolicy::default(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        call_with_resilience(&self.rate_limiter, &self.breaker, self.policy, || {
            let url = url.clone();
            let http = self.http.clone();
            async move {
                let response = http.get(&url).send().await?;
                let response = ensure_success(response).await?;
                response
                    .json::<T>()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))
            }
        })
        .await
    }
}

#[async_trait::async_trait]
impl MarketDataClient for HttpMarketDataClient {
    async fn exchange_trades(
        &self,
        condition_id: &str,
        min_usd: Option<Decimal>,
        limit: u32,
    ) -> Result<Vec<ExchangeTrade>> {
        #[derive(Deserialize)]
        struct RawTrade {
            trade_id: String,
            token_id: String,
            side: String,
            outcome: String,
            size: Decimal,
            price: Decimal,
            taker: Option<String>,
            maker: Option<String>,
            timestamp_ms: i64,
            tx_hash: Option<String>,
        }
        let min_usd_q = min_usd.map(|m| format!("&minUsd={m}")).unwrap_or_default();
        let raw: Vec<RawTrade> = self
            .get_json(&format!(
                "/trades?conditionId={condition_id}&limit={limit}{min_usd_q}"
            ))
            .await?;
        raw.into_iter()
            .map(|t| {
                Ok(ExchangeTrade {
                    trade_id: t.trade_id,
                    condition_id: condition_id.to_string(),
                    token_id: t.token_id,
                    side: if t.side == "buy" { Side::Buy } else { Side::Sell },
                    outcome: if t.outcome == "yes" { Outcome::Yes } else { Outcome::No },
                    size: t.size,
                    price: t.price,
                    taker: t.taker.as_deref().map(Address::parse).transpose()?,
                    maker: t.maker.as_deref().map(Address::parse).transpose()?,
                    timestamp_ms: t.timestamp_ms,
                    tx_hash: t.tx_hash,
                })
            })
            .collect()
    }

    async fn user_activity_summary(&self, address: &Address) -> Result<UserActivitySummary> {
        #[derive(Deserialize)]
        struct Resp {
            lifetime_trade_count: u64,
            lifetime_usd_volume: Decimal,
            markets_traded: u32,
        }
        let resp: Resp = self
            .get_json(&format!("/users/{address}/activity-summary"))
            .await?;
        Ok(UserActivitySummary {
            lifetime_trade_count: resp.lifetime_trade_count,
            lifetime_usd_volume: Usd::new(resp.lifetime_usd_volume),
            markets_traded: resp.markets_traded,
        })
    }

    async fn orderbook_snapshot(&self, token_id: &str) -> Result<OrderbookSnapshot> {
        #[derive(Deserialize)]
        struct Resp {
            bids: Vec<(Decimal, Decimal)>,
            asks: Vec<(Decimal, Decimal)>,
        }
        let resp: Resp = self
            .get_json(&format!("/orderbook/{token_id}"))
            .await?;
        Ok(OrderbookSnapshot {
            bids: resp.bids,
            asks: resp.asks,
        })
    }

    async fn market_liquidity(&self, condition_id: &str) -> Result<(Usd, Usd)> {
        #[derive(Deserialize)]
        struct Resp {
            open_interest: Decimal,
            lifetime_volume: Decimal,
        }
        let resp: Resp = self
            .get_json(&format!("/markets/{condition_id}/liquidity"))
            .await?;
        Ok((Usd::new(resp.open_interest), Usd::new(resp.lifetime_volume)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn liquidity_usd_sums_top_n_levels() {
        let book = OrderbookSnapshot {
            bids: vec![(dec!(0.5), dec!(1000)), (dec!(0.49), dec!(2000))],
            asks: vec![(dec!(0.51), dec!(500))],
        };
        assert_eq!(book.liquidity_usd(true, 1), Usd::new(dec!(500)));
        assert_eq!(book.liquidity_usd(true, 2), Usd::new(dec!(1480)));
        assert_eq!(book.liquidity_usd(false, 5), Usd::new(dec!(255)));
    }
}
