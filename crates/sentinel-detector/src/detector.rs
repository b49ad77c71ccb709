//! Signal detector (§4.I): market-impact gating and dormancy scoring.

use crate::config::DetectorConfig;
use crate::dormancy::compute_dormancy;
use crate::sources::{LiquiditySource, TradeHistorySource, VolumeSource};
use chrono::Utc;
use rust_decimal::Decimal;
use sentinel_core::{AbsoluteTier, DormancyMetrics, GateReason, ImpactMethod, Market, Signal, Trade};
use sentinel_telemetry::CounterSink;
use std::sync::Arc;
use tracing::debug;

/// Hybrid absolute + relative size/impact gate over a stream of trades.
///
/// Holds no mutable state of its own: every call is independent, driven by
/// injected [`LiquiditySource`]/[`VolumeSource`]/[`TradeHistorySource`]
/// implementations the orchestrator wires up over the live upstream
/// clients and persistence store.
pub struct SignalDetector {
    config: DetectorConfig,
    liquidity: Arc<dyn LiquiditySource>,
    volume: Arc<dyn VolumeSource>,
    history: Arc<dyn TradeHistorySource>,
    stats: Arc<dyn CounterSink>,
}

impl SignalDetector {
    pub fn new(
        config: DetectorConfig,
        liquidity: Arc<dyn LiquiditySource>,
        volume: Arc<dyn VolumeSource>,
        history: Arc<dyn TradeHistorySource>,
        stats: Arc<dyn CounterSink>,
    ) -> Self {
        Self {
            config,
            liquidity,
            volume,
            history,
            stats,
        }
    }

    /// Evaluate a trade against the hybrid gate. `None` means the trade is
    /// filtered; funnel counters are updated either way (§4.I, §8 S3).
    pub async fn detect(&self, trade: &Trade, market: &Market) -> Option<Signal> {
        self.stats.incr("trades_analyzed", 1);
        let usd = trade.usd_value();

        let (impact_pct, method, threshold) = self.resolve_impact(trade, market).await;

        let gate = match impact_pct {
            Some(pct) if pct >= threshold => Some(GateReason::RelativeImpact),
            _ => AbsoluteTier::classify(usd).map(GateReason::AbsoluteTier),
        };

        match gate {
            Some(gate) => {
                self.stats.incr("passed_oi_filter", 1);
                debug!(trade_id = %trade.id, ?gate, "trade passed impact gate");
                Some(Signal {
                    trade_id: trade.id.clone(),
                    usd_value: usd,
                    impact_pct: impact_pct.unwrap_or(Decimal::ZERO),
                    method,
                    threshold,
                    gate,
                })
            }
            None => {
                self.stats.incr("filtered_oi_threshold", 1);
                None
            }
        }
    }

    /// Dormancy metrics for `market` as of `reference_time` (§4.I, §3).
    pub async fn dormancy(&self, market: &Market, reference_time: chrono::DateTime<Utc>) -> DormancyMetrics {
        compute_dormancy(self.history.as_ref(), &market.id, &self.config, reference_time).await
    }

    /// Resolve impact-percentage under the configured method, falling back
    /// to open-interest if the primary method fails or yields a
    /// non-positive denominator and `fallbackToOiCalculation` is enabled.
    async fn resolve_impact(&self, trade: &Trade, market: &Market) -> (Option<Decimal>, ImpactMethod, Decimal) {
        let method: ImpactMethod = self.config.oi_calculation_method.into();
        let usd = trade.usd_value();

        let primary_denominator = match method {
            ImpactMethod::Liquidity => {
                let token_id = match trade.outcome {
                    sentinel_core::Outcome::Yes => market.token_id_yes.as_ref(),
                    sentinel_core::Outcome::No => market.token_id_no.as_ref(),
                };
                match token_id {
                    Some(token_id) => {
                        self.liquidity
                            .available_liquidity(
                                &token_id.0,
                                trade.side,
                                self.config.orderbook_depth_levels,
                            )
                            .await
                    }
                    None => None,
                }
            }
            ImpactMethod::Volume => {
                self.volume
                    .rolling_volume(&market.id, self.config.volume_lookback_hours)
                    .await
            }
            ImpactMethod::OpenInterest => Some(market.open_interest),
        };

        if let Some(denominator) = primary_denominator {
            if let Some(pct) = usd.ratio_of(denominator) {
                return (Some(pct), method, self.config.primary_threshold());
            }
        }

        if self.config.fallback_to_oi_calculation && method != ImpactMethod::OpenInterest {
            if let Some(pct) = usd.ratio_of(market.open_interest) {
                return (
                    Some(pct),
                    ImpactMethod::OpenInterest,
                    self.config.fallback_oi_percentage,
                );
            }
        }

        (None, method, self.config.primary_threshold())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OiCalculationMethod;
    use async_trait::async_trait;
    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use sentinel_core::{
        Address, ConditionId, MarketId, Outcome, Probability, Side, TokenAmount, TokenId, Tier,
        TradeSource, Usd,
    };
    use sentinel_telemetry::StatsRegistry;

    struct FixedLiquidity(Option<Usd>);
    #[async_trait]
    impl LiquiditySource for FixedLiquidity {
        async fn available_liquidity(&self, _token_id: &str, _side: Side, _depth: usize) -> Option<Usd> {
            self.0
        }
    }

    struct FixedVolume(Option<Usd>);
    #[async_trait]
    impl VolumeSource for FixedVolume {
        async fn rolling_volume(&self, _market_id: &MarketId, _lookback_hours: i64) -> Option<Usd> {
            self.0
        }
    }

    struct EmptyHistory;
    #[async_trait]
    impl TradeHistorySource for EmptyHistory {
        async fn trades_since(&self, _market_id: &MarketId, _since: DateTime<Utc>) -> Vec<Trade> {
            vec![]
        }
    }

    fn sample_market(open_interest: Decimal) -> Market {
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
            open_interest: Usd::new(open_interest),
            lifetime_volume: Usd::new(dec!(1000000)),
        }
    }

    fn sample_trade(size: Decimal, price: Decimal) -> Trade {
        Trade::new(
            "t1".into(),
            MarketId("m1".into()),
            Side::Buy,
            Outcome::Yes,
            TokenAmount::new(size),
            Probability::new(price),
            Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
            None,
            Utc::now().timestamp_millis(),
            TradeSource::Pull,
            None,
        )
        .unwrap()
    }

    fn detector(config: DetectorConfig, liquidity: Option<Usd>, volume: Option<Usd>) -> SignalDetector {
        SignalDetector::new(
            config,
            Arc::new(FixedLiquidity(liquidity)),
            Arc::new(FixedVolume(volume)),
            Arc::new(EmptyHistory),
            Arc::new(StatsRegistry::new()),
        )
    }

    #[tokio::test]
    async fn whale_trade_passes_via_absolute_tier_even_with_low_impact() {
        let config = DetectorConfig::default();
        let market = sample_market(dec!(50000));
        let trade = sample_trade(dec!(200000), dec!(0.5));
        let det = detector(config, None, None);
        let signal = det.detect(&trade, &market).await.unwrap();
        assert!(matches!(signal.gate, GateReason::RelativeImpact | GateReason::AbsoluteTier(AbsoluteTier::Whale)));
    }

    #[tokio::test]
    async fn below_threshold_and_below_tier_is_filtered() {
        let config = DetectorConfig::default();
        let market = sample_market(dec!(10_000_000));
        let trade = sample_trade(dec!(1000), dec!(0.5));
        let det = detector(config, Some(Usd::new(dec!(10_000_000))), None);
        assert!(det.detect(&trade, &market).await.is_none());
    }

    #[tokio::test]
    async fn falls_back_to_open_interest_when_liquidity_unavailable() {
        let mut config = DetectorConfig::default();
        config.oi_calculation_method = OiCalculationMethod::Liquidity;
        config.fallback_to_oi_calculation = true;
        config.fallback_oi_percentage = dec!(0.05);
        let market = sample_market(dec!(1000));
        let trade = sample_trade(dec!(200), dec!(0.5));
        let det = detector(config, None, None);
        let signal = det.detect(&trade, &market).await.unwrap();
        assert_eq!(signal.method, ImpactMethod::OpenInterest);
    }

    #[tokio::test]
    async fn funnel_counters_increment_on_filter_and_pass() {
        let config = DetectorConfig::default();
        let stats = Arc::new(StatsRegistry::new());
        let det = SignalDetector::new(
            config,
            Arc::new(FixedLiquidity(Some(Usd::new(dec!(10_000_000))))),
            Arc::new(FixedVolume(None)),
            Arc::new(EmptyHistory),
            stats.clone(),
        );
        let market = sample_market(dec!(10_000_000));
        let small_trade = sample_trade(dec!(100), dec!(0.5));
        det.detect(&small_trade, &market).await;
        assert_eq!(stats.get("trades_analyzed"), 1);
        assert_eq!(stats.get("filtered_oi_threshold"), 1);
        assert_eq!(stats.get("passed_oi_filter"), 0);
    }
}
