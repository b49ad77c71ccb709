//! Market identity and liveness.
//!
//! A market has an immutable identity (canonical id, condition id, outcome
//! token ids) and mutable liveness state (enabled flag, open interest,
//! lifetime volume) refreshed periodically by the registry.

use crate::decimal::Usd;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market tier, coarse-grained by liquidity/importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    One,
    Two,
    Three,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::One => write!(f, "1"),
            Tier::Two => write!(f, "2"),
            Tier::Three => write!(f, "3"),
        }
    }
}

/// Canonical market id, unique per venue market.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub String);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Venue-canonical condition id. Stable equivalence key across upstreams
/// for a single binary question; survives token-id churn.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionId(pub String);

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Venue identifier for a YES or NO outcome-position token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A prediction-market market: identity plus mutable liveness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub condition_id: ConditionId,
    pub token_id_yes: Option<TokenId>,
    pub token_id_no: Option<TokenId>,
    pub question: String,
    pub url_slug: String,
    pub tier: Tier,
    pub category: String,
    pub enabled: bool,
    pub open_interest: Usd,
    pub lifetime_volume: Usd,
}

impl Market {
    /// Both token ids this market currently has, for WebSocket subscription.
    pub fn token_ids(&self) -> Vec<TokenId> {
        [&self.token_id_yes, &self.token_id_no]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn is_live(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_market() -> Market {
        Market {
            id: MarketId("m-1".into()),
            condition_id: ConditionId("c-1".into()),
            token_id_yes: Some(TokenId("y-1".into())),
            token_id_no: Some(TokenId("n-1".into())),
            question: "Will X happen?".into(),
            url_slug: "will-x-happen".into(),
            tier: Tier::One,
            category: "politics".into(),
            enabled: true,
            open_interest: Usd::new(dec!(50000)),
            lifetime_volume: Usd::new(dec!(1000000)),
        }
    }

    #[test]
    fn token_ids_collects_present_outcomes() {
        let m = sample_market();
        assert_eq!(m.token_ids().len(), 2);
    }

    #[test]
    fn token_ids_skips_absent_outcome() {
        let mut m = sample_market();
        m.token_id_no = None;
        assert_eq!(m.token_ids(), vec![TokenId("y-1".into())]);
    }
}
