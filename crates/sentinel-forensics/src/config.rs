//! Forensics configuration (§6): flag thresholds, fresh-fat-bet, on-chain
//! fallback parameters, and cache lifetime.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

fn default_subgraph_low_trade_count() -> u64 {
    5
}

fn default_subgraph_young_account_days() -> f64 {
    14.0
}

fn default_subgraph_low_volume_usd() -> Decimal {
    dec!(5000)
}

fn default_subgraph_high_concentration_pct() -> f64 {
    80.0
}

fn default_subgraph_fresh_fat_bet_size_usd() -> Decimal {
    dec!(10000)
}

fn default_subgraph_fresh_fat_bet_max_oi() -> Decimal {
    dec!(100000)
}

fn default_subgraph_fresh_fat_bet_prior_trades() -> u64 {
    2
}

fn default_subgraph_low_diversification_threshold() -> u32 {
    2
}

fn default_cex_funding_window_days() -> i64 {
    7
}

fn default_min_wallet_age_in_days() -> f64 {
    14.0
}

fn default_max_wallet_transactions() -> u64 {
    5
}

fn default_min_netflow_percentage() -> f64 {
    80.0
}

fn default_subgraph_cache_ttl_hours() -> i64 {
    6
}

fn default_onchain_cache_ttl_hours() -> i64 {
    1
}

fn default_skip_trades_on_proxy_error() -> bool {
    false
}

fn default_enable_shadow_scoring() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForensicsConfig {
    #[serde(default = "default_subgraph_low_trade_count")]
    pub subgraph_low_trade_count: u64,
    #[serde(default = "default_subgraph_young_account_days")]
    pub subgraph_young_account_days: f64,
    #[serde(default = "default_subgraph_low_volume_usd")]
    pub subgraph_low_volume_usd: Decimal,
    #[serde(default = "default_subgraph_high_concentration_pct")]
    pub subgraph_high_concentration_pct: f64,

    #[serde(default = "default_subgraph_fresh_fat_bet_size_usd")]
    pub subgraph_fresh_fat_bet_size_usd: Decimal,
    #[serde(default = "default_subgraph_fresh_fat_bet_max_oi")]
    pub subgraph_fresh_fat_bet_max_oi: Decimal,
    #[serde(default = "default_subgraph_fresh_fat_bet_prior_trades")]
    pub subgraph_fresh_fat_bet_prior_trades: u64,

    #[serde(default = "default_subgraph_low_diversification_threshold")]
    pub subgraph_low_diversification_threshold: u32,

    #[serde(default = "default_cex_funding_window_days")]
    pub cex_funding_window_days: i64,
    #[serde(default = "default_min_wallet_age_in_days")]
    pub min_wallet_age_in_days: f64,
    #[serde(default = "default_max_wallet_transactions")]
    pub max_wallet_transactions: u64,
    #[serde(default = "default_min_netflow_percentage")]
    pub min_netflow_percentage: f64,

    #[serde(default = "default_subgraph_cache_ttl_hours")]
    pub subgraph_cache_ttl_hours: i64,
    #[serde(default = "default_onchain_cache_ttl_hours")]
    pub onchain_cache_ttl_hours: i64,

    #[serde(default = "default_skip_trades_on_proxy_error")]
    pub skip_trades_on_proxy_error: bool,

    /// When true, also run the on-chain path after an indexer-path result
    /// and fold its agreement/disagreement with the indexer path into the
    /// confidence envelope's source-agreement factor, logging an
    /// AGREE/DISAGREE record (§4.J). The on-chain result is never the one
    /// returned to the caller in this mode; it exists purely for
    /// calibration. On by default: without it, source agreement can only
    /// ever read as `Either`, and the confidence formula's `Both`/`Neither`
    /// bands never fire in production. Set to false to save the extra
    /// upstream round-trip when that calibration signal isn't needed.
    #[serde(default = "default_enable_shadow_scoring")]
    pub enable_shadow_scoring: bool,

    /// Known centralized-exchange hot-wallet addresses, lowercase hex, for
    /// the CEX-funding on-chain flag.
    #[serde(default)]
    pub known_cex_addresses: Vec<String>,
}

impl Default for ForensicsConfig {
    fn default() -> Self {
        Self {
            subgraph_low_trade_count: default_subgraph_low_trade_count(),
            subgraph_young_account_days: default_subgraph_young_account_days(),
            subgraph_low_volume_usd: default_subgraph_low_volume_usd(),
            subgraph_high_concentration_pct: default_subgraph_high_concentration_pct(),
            subgraph_fresh_fat_bet_size_usd: default_subgraph_fresh_fat_bet_size_usd(),
            subgraph_fresh_fat_bet_max_oi: default_subgraph_fresh_fat_bet_max_oi(),
            subgraph_fresh_fat_bet_prior_trades: default_subgraph_fresh_fat_bet_prior_trades(),
            subgraph_low_diversification_threshold: default_subgraph_low_diversification_threshold(),
            cex_funding_window_days: default_cex_funding_window_days(),
            min_wallet_age_in_days: default_min_wallet_age_in_days(),
            max_wallet_transactions: default_max_wallet_transactions(),
            min_netflow_percentage: default_min_netflow_percentage(),
            subgraph_cache_ttl_hours: default_subgraph_cache_ttl_hours(),
            onchain_cache_ttl_hours: default_onchain_cache_ttl_hours(),
            skip_trades_on_proxy_error: default_skip_trades_on_proxy_error(),
            enable_shadow_scoring: default_enable_shadow_scoring(),
            known_cex_addresses: Vec::new(),
        }
    }
}
