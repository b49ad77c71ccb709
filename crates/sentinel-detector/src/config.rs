//! Detector configuration (§6): impact method selection, per-method
//! thresholds, fallback behavior, microstructure windows, and dormancy
//! thresholds.

use crate::error::{DetectorError, DetectorResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_core::ImpactMethod;
use serde::{Deserialize, Serialize};

fn default_min_oi_percentage() -> Decimal {
    dec!(0.05)
}

fn default_min_liquidity_impact_percentage() -> Decimal {
    dec!(0.25)
}

fn default_min_volume_impact_percentage() -> Decimal {
    dec!(0.10)
}

fn default_fallback_to_oi_calculation() -> bool {
    true
}

fn default_fallback_oi_percentage() -> Decimal {
    dec!(0.05)
}

fn default_orderbook_depth_levels() -> usize {
    10
}

fn default_orderbook_cache_ttl_seconds() -> u64 {
    5
}

fn default_volume_lookback_hours() -> i64 {
    24
}

fn default_dormant_hours_no_large_trades() -> f64 {
    24.0
}

fn default_dormant_hours_no_price_moves() -> f64 {
    24.0
}

fn default_dormant_large_trade_threshold() -> Decimal {
    dec!(5000)
}

fn default_dormant_price_move_threshold() -> Decimal {
    dec!(0.05)
}

/// Which impact-calculation method is active (§4.I). Distinct from
/// [`sentinel_core::ImpactMethod`] only in that it is the configured
/// *choice*, not the method a given signal was actually resolved under
/// (which may differ after a fallback-to-OI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OiCalculationMethod {
    Liquidity,
    Volume,
    OpenInterest,
}

impl From<OiCalculationMethod> for ImpactMethod {
    fn from(method: OiCalculationMethod) -> Self {
        match method {
            OiCalculationMethod::Liquidity => ImpactMethod::Liquidity,
            OiCalculationMethod::Volume => ImpactMethod::Volume,
            OiCalculationMethod::OpenInterest => ImpactMethod::OpenInterest,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub oi_calculation_method: OiCalculationMethod,

    #[serde(default = "default_min_oi_percentage")]
    pub min_oi_percentage: Decimal,
    #[serde(default = "default_min_liquidity_impact_percentage")]
    pub min_liquidity_impact_percentage: Decimal,
    #[serde(default = "default_min_volume_impact_percentage")]
    pub min_volume_impact_percentage: Decimal,

    #[serde(default = "default_fallback_to_oi_calculation")]
    pub fallback_to_oi_calculation: bool,
    #[serde(default = "default_fallback_oi_percentage")]
    pub fallback_oi_percentage: Decimal,

    #[serde(default = "default_orderbook_depth_levels")]
    pub orderbook_depth_levels: usize,
    #[serde(default = "default_orderbook_cache_ttl_seconds")]
    pub orderbook_cache_ttl_seconds: u64,
    #[serde(default = "default_volume_lookback_hours")]
    pub volume_lookback_hours: i64,

    #[serde(default = "default_dormant_hours_no_large_trades")]
    pub dormant_hours_no_large_trades: f64,
    #[serde(default = "default_dormant_hours_no_price_moves")]
    pub dormant_hours_no_price_moves: f64,
    #[serde(default = "default_dormant_large_trade_threshold")]
    pub dormant_large_trade_threshold: Decimal,
    #[serde(default = "default_dormant_price_move_threshold")]
    pub dormant_price_move_threshold: Decimal,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            oi_calculation_method: OiCalculationMethod::Liquidity,
            min_oi_percentage: default_min_oi_percentage(),
            min_liquidity_impact_percentage: default_min_liquidity_impact_percentage(),
            min_volume_impact_percentage: default_min_volume_impact_percentage(),
            fallback_to_oi_calculation: default_fallback_to_oi_calculation(),
            fallback_oi_percentage: default_fallback_oi_percentage(),
            orderbook_depth_levels: default_orderbook_depth_levels(),
            orderbook_cache_ttl_seconds: default_orderbook_cache_ttl_seconds(),
            volume_lookback_hours: default_volume_lookback_hours(),
            dormant_hours_no_large_trades: default_dormant_hours_no_large_trades(),
            dormant_hours_no_price_moves: default_dormant_hours_no_price_moves(),
            dormant_large_trade_threshold: default_dormant_large_trade_threshold(),
            dormant_price_move_threshold: default_dormant_price_move_threshold(),
        }
    }
}

impl DetectorConfig {
    /// Threshold that applies to the currently configured primary method.
    pub fn primary_threshold(&self) -> Decimal {
        match self.oi_calculation_method {
            OiCalculationMethod::Liquidity => self.min_liquidity_impact_percentage,
            OiCalculationMethod::Volume => self.min_volume_impact_percentage,
            OiCalculationMethod::OpenInterest => self.min_oi_percentage,
        }
    }

    pub fn validate(&self) -> DetectorResult<()> {
        if self.orderbook_depth_levels == 0 {
            return Err(DetectorError::ConfigError(
                "orderbookDepthLevels must be positive".into(),
            ));
        }
        if self.volume_lookback_hours <= 0 {
            return Err(DetectorError::ConfigError(
                "volumeLookbackHours must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_threshold_follows_configured_method() {
        let mut config = DetectorConfig::default();
        config.oi_calculation_method = OiCalculationMethod::Volume;
        assert_eq!(config.primary_threshold(), config.min_volume_impact_percentage);
    }

    #[test]
    fn rejects_zero_depth_levels() {
        let mut config = DetectorConfig::default();
        config.orderbook_depth_levels = 0;
        assert!(config.validate().is_err());
    }
}
