//! Derived-from-trade signal and dormancy types (§3).

use crate::decimal::Usd;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which impact-calculation method was active when a signal was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactMethod {
    Liquidity,
    Volume,
    OpenInterest,
}

/// Which gate admitted the trade as a candidate signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateReason {
    /// Admitted via the relative impact-percentage threshold.
    RelativeImpact,
    /// Admitted via one of the fixed absolute-USD tiers.
    AbsoluteTier(AbsoluteTier),
}

/// Fixed absolute-USD size tiers (§4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbsoluteTier {
    Notable,
    Significant,
    Large,
    Whale,
}

impl AbsoluteTier {
    pub const fn threshold_usd(self) -> Decimal {
        match self {
            AbsoluteTier::Notable => Decimal::from_parts(10000, 0, 0, false, 0),
            AbsoluteTier::Significant => Decimal::from_parts(25000, 0, 0, false, 0),
            AbsoluteTier::Large => Decimal::from_parts(50000, 0, 0, false, 0),
            AbsoluteTier::Whale => Decimal::from_parts(100000, 0, 0, false, 0),
        }
    }

    /// Highest tier whose threshold `usd` meets or exceeds, if any.
    pub fn classify(usd: Usd) -> Option<Self> {
        [
            AbsoluteTier::Whale,
            AbsoluteTier::Large,
            AbsoluteTier::Significant,
            AbsoluteTier::Notable,
        ]
        .into_iter()
        .find(|tier| usd.inner() >= tier.threshold_usd())
    }
}

/// A signal derived from a trade: USD value, impact %, and which gate fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub trade_id: String,
    pub usd_value: Usd,
    pub impact_pct: Decimal,
    pub method: ImpactMethod,
    pub threshold: Decimal,
    pub gate: GateReason,
}

/// Dormancy metrics for a (market, reference-time) pair (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DormancyMetrics {
    pub hours_since_large_trade: Option<f64>,
    pub hours_since_price_move: Option<f64>,
    pub is_dormant: bool,
}

impl DormancyMetrics {
    pub fn compute(
        hours_since_large_trade: Option<f64>,
        hours_since_price_move: Option<f64>,
        no_large_trade_window_hours: f64,
        no_price_move_window_hours: f64,
    ) -> Self {
        let no_large = hours_since_large_trade
            .map(|h| h >= no_large_trade_window_hours)
            .unwrap_or(true);
        let no_move = hours_since_price_move
            .map(|h| h >= no_price_move_window_hours)
            .unwrap_or(true);
        Self {
            hours_since_large_trade,
            hours_since_price_move,
            is_dormant: no_large && no_move,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn absolute_tier_boundary_at_10000_is_notable() {
        assert_eq!(
            AbsoluteTier::classify(Usd::new(dec!(10000))),
            Some(AbsoluteTier::Notable)
        );
    }

    #[test]
    fn absolute_tier_picks_highest_matching() {
        assert_eq!(
            AbsoluteTier::classify(Usd::new(dec!(100000))),
            Some(AbsoluteTier::Whale)
        );
        assert_eq!(
            AbsoluteTier::classify(Usd::new(dec!(60000))),
            Some(AbsoluteTier::Large)
        );
    }

    #[test]
    fn absolute_tier_below_notable_is_none() {
        assert_eq!(AbsoluteTier::classify(Usd::new(dec!(500))), None);
    }

    #[test]
    fn dormant_requires_both_windows_quiet() {
        let d = DormancyMetrics::compute(Some(48.0), Some(48.0), 24.0, 24.0);
        assert!(d.is_dormant);

        let not_dormant = DormancyMetrics::compute(Some(1.0), Some(48.0), 24.0, 24.0);
        assert!(!not_dormant.is_dormant);
    }

    #[test]
    fn dormant_treats_no_history_as_quiet() {
        let d = DormancyMetrics::compute(None, None, 24.0, 24.0);
        assert!(d.is_dormant);
    }
}
