//! Wallet fingerprint: forensic metadata, behavioral flags, and the
//! confidence envelope that calibrates how much to trust them (§3).

use crate::address::Address;
use crate::decimal::Usd;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Behavioral red flags computed over a wallet's history.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WalletFlags {
    pub low_trade_count: bool,
    pub young_account: bool,
    pub low_volume: bool,
    pub high_concentration: bool,
    pub fresh_fat_bet: bool,
    pub low_diversification: bool,
}

impl WalletFlags {
    pub fn count(&self) -> u8 {
        [
            self.low_trade_count,
            self.young_account,
            self.low_volume,
            self.high_concentration,
            self.fresh_fat_bet,
            self.low_diversification,
        ]
        .into_iter()
        .filter(|f| *f)
        .count() as u8
    }
}

/// Aggregate confidence level in a fingerprint's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    None,
}

impl ConfidenceLevel {
    /// Map a 0-100 calibrated score to a level (§4.J).
    pub fn from_score(score: i32) -> Self {
        if score >= 75 {
            ConfidenceLevel::High
        } else if score >= 40 {
            ConfidenceLevel::Medium
        } else if score > 0 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::None
        }
    }
}

/// The confidence envelope attached to a fingerprint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceEnvelope {
    pub data_completeness: f64,
    pub cross_source_consistency: f64,
    pub freshness_minutes: f64,
    pub reliability: f64,
    pub score: i32,
    pub level: ConfidenceLevel,
}

/// Which data path produced a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForensicsPath {
    Indexer,
    OnChain,
}

/// Forensic profile of a wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFingerprint {
    pub address: Address,
    pub path: ForensicsPath,
    pub lifetime_trade_count: u64,
    pub lifetime_usd_volume: Usd,
    pub account_age_days: Option<f64>,
    pub position_concentration_pct: f64,
    pub markets_traded: u32,
    pub flags: WalletFlags,
    pub confidence: ConfidenceEnvelope,
    pub computed_at: DateTime<Utc>,
}

impl WalletFingerprint {
    /// Aggregate "suspicious" determination (§4.J): indexer path needs >= 2
    /// flags, the less-complete on-chain path needs >= 3.
    pub fn is_suspicious(&self) -> bool {
        let required = match self.path {
            ForensicsPath::Indexer => 2,
            ForensicsPath::OnChain => 3,
        };
        self.flags.count() >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(n: u8) -> WalletFlags {
        let mut f = WalletFlags::default();
        if n >= 1 {
            f.low_trade_count = true;
        }
        if n >= 2 {
            f.young_account = true;
        }
        if n >= 3 {
            f.low_volume = true;
        }
        f
    }

    fn envelope() -> ConfidenceEnvelope {
        ConfidenceEnvelope {
            data_completeness: 1.0,
            cross_source_consistency: 1.0,
            freshness_minutes: 1.0,
            reliability: 1.0,
            score: 80,
            level: ConfidenceLevel::High,
        }
    }

    #[test]
    fn indexer_path_suspicious_at_two_flags() {
        let w = WalletFingerprint {
            address: Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
            path: ForensicsPath::Indexer,
            lifetime_trade_count: 3,
            lifetime_usd_volume: Usd::ZERO,
            account_age_days: Some(6.0),
            position_concentration_pct: 85.0,
            markets_traded: 1,
            flags: flags(2),
            confidence: envelope(),
            computed_at: Utc::now(),
        };
        assert!(w.is_suspicious());
    }

    #[test]
    fn onchain_path_requires_three_flags() {
        let mut w = WalletFingerprint {
            address: Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
            path: ForensicsPath::OnChain,
            lifetime_trade_count: 3,
            lifetime_usd_volume: Usd::ZERO,
            account_age_days: Some(6.0),
            position_concentration_pct: 85.0,
            markets_traded: 1,
            flags: flags(2),
            confidence: envelope(),
            computed_at: Utc::now(),
        };
        assert!(!w.is_suspicious());
        w.flags = flags(3);
        assert!(w.is_suspicious());
    }

    #[test]
    fn confidence_level_boundaries() {
        assert_eq!(ConfidenceLevel::from_score(75), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(74), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(40), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(1), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0), ConfidenceLevel::None);
    }
}
