//! Confidence calibration (§4.J): a 0-100 score over how much to trust a
//! computed fingerprint, built from data-source agreement, consistency,
//! completeness, cache usage, freshness, upstream-error presence, and
//! trade-history extent.

use sentinel_core::{ConfidenceEnvelope, ConfidenceLevel};

/// Whether the indexer path, the on-chain path, both, or neither produced
/// usable data for this wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAgreement {
    Both,
    Either,
    Neither,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceInputs {
    pub agreement: SourceAgreement,
    /// 0.0-1.0: how closely independent sources agree when both ran.
    pub cross_source_consistency: f64,
    /// 0.0-1.0: fraction of expected fields actually populated.
    pub data_completeness: f64,
    pub served_from_cache: bool,
    pub freshness_minutes: f64,
    pub had_upstream_errors: bool,
    pub trade_history_count: usize,
}

const BASE_SCORE: i32 = 50;

/// Calibrate a confidence envelope from raw signal quality (§4.J).
pub fn calibrate(inputs: ConfidenceInputs) -> ConfidenceEnvelope {
    let mut score = BASE_SCORE;

    score += match inputs.agreement {
        SourceAgreement::Both => 10,
        SourceAgreement::Either => 0,
        SourceAgreement::Neither => -30,
    };

    score += ((inputs.cross_source_consistency - 0.5) * 20.0).round() as i32;
    score += ((inputs.data_completeness - 0.5) * 20.0).round() as i32;

    if inputs.served_from_cache {
        score -= 5;
    }

    let freshness_penalty = (inputs.freshness_minutes / 30.0).min(15.0) as i32;
    score -= freshness_penalty;

    if inputs.had_upstream_errors {
        score -= 10;
    }

    score += match inputs.trade_history_count {
        0 => -20,
        1..=4 => -10,
        n if n > 50 => 10,
        _ => 0,
    };

    let score = score.clamp(0, 100);
    let level = ConfidenceLevel::from_score(score);
    if matches!(level, ConfidenceLevel::Low | ConfidenceLevel::None) {
        tracing::warn!(score, ?level, "wallet forensics produced low-confidence analysis");
    }

    ConfidenceEnvelope {
        data_completeness: inputs.data_completeness,
        cross_source_consistency: inputs.cross_source_consistency,
        freshness_minutes: inputs.freshness_minutes,
        reliability: if inputs.had_upstream_errors { 0.5 } else { 1.0 },
        score,
        level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> ConfidenceInputs {
        ConfidenceInputs {
            agreement: SourceAgreement::Either,
            cross_source_consistency: 0.5,
            data_completeness: 0.5,
            served_from_cache: false,
            freshness_minutes: 0.0,
            had_upstream_errors: false,
            trade_history_count: 10,
        }
    }

    #[test]
    fn both_sources_agreeing_raises_score() {
        let mut both = baseline();
        both.agreement = SourceAgreement::Both;
        let mut either = baseline();
        either.agreement = SourceAgreement::Either;
        assert!(calibrate(both).score > calibrate(either).score);
    }

    #[test]
    fn neither_source_drops_to_low_or_none() {
        let mut inputs = baseline();
        inputs.agreement = SourceAgreement::Neither;
        inputs.trade_history_count = 0;
        let envelope = calibrate(inputs);
        assert!(matches!(envelope.level, ConfidenceLevel::Low | ConfidenceLevel::None));
    }

    #[test]
    fn rich_trade_history_raises_score() {
        let mut inputs = baseline();
        inputs.trade_history_count = 51;
        let sparse = baseline();
        assert!(calibrate(inputs).score > calibrate(sparse).score);
    }

    #[test]
    fn score_is_clamped_to_0_100() {
        let mut inputs = baseline();
        inputs.agreement = SourceAgreement::Neither;
        inputs.trade_history_count = 0;
        inputs.had_upstream_errors = true;
        inputs.freshness_minutes = 10_000.0;
        let envelope = calibrate(inputs);
        assert!(envelope.score >= 0 && envelope.score <= 100);
    }
}
