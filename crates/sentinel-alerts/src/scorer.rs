//! Composite alert scoring (§4.K): weighted sum of gated-impact,
//! dormancy magnitude, suspicious-flag count, and a confidence penalty.
//! Classification itself is derived from the composite by
//! [`sentinel_core::Classification::from_score`]; this module only builds
//! the [`ScoreBreakdown`] that feeds it.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use sentinel_core::{
    AbsoluteTier, ConfidenceEnvelope, ConfidenceLevel, DormancyMetrics, GateReason, ScoreBreakdown,
    Signal, WalletFingerprint,
};

/// Weight given to each absolute-USD tier (§4.I) when a trade was admitted
/// through the absolute gate rather than the relative one.
fn absolute_tier_weight(tier: AbsoluteTier) -> i32 {
    match tier {
        AbsoluteTier::Notable => 10,
        AbsoluteTier::Significant => 20,
        AbsoluteTier::Large => 30,
        AbsoluteTier::Whale => 40,
    }
}

/// Gated-impact component, capped at 40: absolute-tier admission scales by
/// tier severity; relative admission scales by how far impact_pct clears
/// its threshold, capped at 2x the threshold to avoid one outlier trade
/// dominating the score.
fn impact_component(signal: &Signal) -> i32 {
    match signal.gate {
        GateReason::AbsoluteTier(tier) => absolute_tier_weight(tier),
        GateReason::RelativeImpact => {
            if signal.threshold <= rust_decimal::Decimal::ZERO {
                return 0;
            }
            let ratio = (signal.impact_pct / signal.threshold).min(dec!(2));
            (ratio * dec!(20)).round().to_i32().unwrap_or(0).clamp(0, 40)
        }
    }
}

/// Dormancy magnitude component, capped at 30: a qualifying dormant market
/// contributes the full weight since a large trade breaking real silence
/// is the core insider-trading signature this pipeline looks for.
fn dormancy_component(dormancy: &DormancyMetrics) -> i32 {
    if dormancy.is_dormant {
        30
    } else {
        0
    }
}

/// Wallet-flag component, capped at 30: five points per red flag.
fn wallet_component(fingerprint: &WalletFingerprint) -> i32 {
    (fingerprint.flags.count() as i32 * 5).min(30)
}

/// Confidence penalty: low/no confidence in the wallet fingerprint pulls
/// the composite back down rather than letting a thin forensic profile
/// produce a strong-insider classification outright.
fn confidence_penalty(confidence: &ConfidenceEnvelope) -> i32 {
    match confidence.level {
        ConfidenceLevel::High | ConfidenceLevel::Medium => 0,
        ConfidenceLevel::Low => 10,
        ConfidenceLevel::None => 20,
    }
}

/// Build the full score breakdown for a candidate alert. Composite score
/// and classification are then derived by [`sentinel_core::Alert::new`].
pub fn score(signal: &Signal, dormancy: &DormancyMetrics, fingerprint: &WalletFingerprint) -> ScoreBreakdown {
    ScoreBreakdown {
        impact_component: impact_component(signal),
        dormancy_component: dormancy_component(dormancy),
        wallet_component: wallet_component(fingerprint),
        confidence_penalty: confidence_penalty(&fingerprint.confidence),
    }
}
