//! Alert: the terminal artifact of the pipeline (§3, §4.K).

use crate::address::Address;
use crate::decimal::Usd;
use crate::market::MarketId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification bucket an alert's composite score falls into (§4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    LogOnly,
    MediumConfidence,
    HighConfidence,
    StrongInsider,
}

impl Classification {
    /// Bucket a composite 0-100 score (§4.K thresholds).
    pub fn from_score(score: i32) -> Self {
        if score >= 85 {
            Classification::StrongInsider
        } else if score >= 65 {
            Classification::HighConfidence
        } else if score >= 40 {
            Classification::MediumConfidence
        } else {
            Classification::LogOnly
        }
    }

    /// Whether this classification should trigger outbound notification.
    pub fn notifies(self) -> bool {
        matches!(
            self,
            Classification::StrongInsider | Classification::HighConfidence
        )
    }
}

/// Per-component contribution to the composite score, kept for audit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub impact_component: i32,
    pub dormancy_component: i32,
    pub wallet_component: i32,
    pub confidence_penalty: i32,
}

impl ScoreBreakdown {
    /// Sum of components, clamped to [0, 100].
    pub fn composite(&self) -> i32 {
        (self.impact_component + self.dormancy_component + self.wallet_component
            - self.confidence_penalty)
            .clamp(0, 100)
    }
}

/// A surfaced insider-trading alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub trade_id: String,
    pub market_id: MarketId,
    pub wallet: Address,
    pub breakdown: ScoreBreakdown,
    pub score: i32,
    pub classification: Classification,
    pub usd_value: Usd,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        trade_id: String,
        market_id: MarketId,
        wallet: Address,
        breakdown: ScoreBreakdown,
        usd_value: Usd,
        created_at: DateTime<Utc>,
    ) -> Self {
        let score = breakdown.composite();
        Self {
            id: Uuid::new_v4(),
            trade_id,
            market_id,
            wallet,
            breakdown,
            score,
            classification: Classification::from_score(score),
            usd_value,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn breakdown(impact: i32, dormancy: i32, wallet: i32, penalty: i32) -> ScoreBreakdown {
        ScoreBreakdown {
            impact_component: impact,
            dormancy_component: dormancy,
            wallet_component: wallet,
            confidence_penalty: penalty,
        }
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(Classification::from_score(85), Classification::StrongInsider);
        assert_eq!(Classification::from_score(84), Classification::HighConfidence);
        assert_eq!(Classification::from_score(65), Classification::HighConfidence);
        assert_eq!(Classification::from_score(64), Classification::MediumConfidence);
        assert_eq!(Classification::from_score(40), Classification::MediumConfidence);
        assert_eq!(Classification::from_score(39), Classification::LogOnly);
    }

    #[test]
    fn only_top_two_tiers_notify() {
        assert!(Classification::StrongInsider.notifies());
        assert!(Classification::HighConfidence.notifies());
        assert!(!Classification::MediumConfidence.notifies());
        assert!(!Classification::LogOnly.notifies());
    }

    #[test]
    fn composite_clamps_to_valid_range() {
        let b = breakdown(40, 40, 40, 0);
        assert_eq!(b.composite(), 100);

        let negative = breakdown(10, 0, 0, 50);
        assert_eq!(negative.composite(), 0);
    }

    #[test]
    fn new_alert_derives_classification_from_breakdown() {
        let alert = Alert::new(
            "t1".into(),
            MarketId("m1".into()),
            Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
            breakdown(40, 30, 20, 0),
            Usd::new(dec!(50000)),
            Utc::now(),
        );
        assert_eq!(alert.score, 90);
        assert_eq!(alert.classification, Classification::StrongInsider);
    }
}
