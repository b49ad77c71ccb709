//! Flag computation (§4.J): boolean red flags over a wallet's metadata,
//! shared by both the indexer and on-chain paths but fed from different
//! raw signals per path.

use crate::config::ForensicsConfig;
use rust_decimal::Decimal;
use sentinel_core::{Usd, WalletFlags};

/// Raw per-wallet metrics resolved via the indexer path.
#[derive(Debug, Clone)]
pub struct IndexerMetrics {
    pub lifetime_trade_count: u64,
    pub account_age_days: Option<f64>,
    pub lifetime_usd_volume: Usd,
    pub position_concentration_pct: f64,
    pub markets_traded: u32,
    pub current_trade_usd: Usd,
    pub market_open_interest: Usd,
}

pub fn compute_indexer_flags(metrics: &IndexerMetrics, config: &ForensicsConfig) -> WalletFlags {
    WalletFlags {
        low_trade_count: metrics.lifetime_trade_count <= config.subgraph_low_trade_count,
        young_account: metrics
            .account_age_days
            .map(|d| d <= config.subgraph_young_account_days)
            .unwrap_or(true),
        low_volume: metrics.lifetime_usd_volume.inner() <= config.subgraph_low_volume_usd,
        high_concentration: metrics.position_concentration_pct
            >= config.subgraph_high_concentration_pct,
        fresh_fat_bet: metrics.lifetime_trade_count <= config.subgraph_fresh_fat_bet_prior_trades
            && metrics.current_trade_usd.inner() >= config.subgraph_fresh_fat_bet_size_usd
            && metrics.market_open_interest.inner() <= config.subgraph_fresh_fat_bet_max_oi,
        low_diversification: metrics.markets_traded
            <= config.subgraph_low_diversification_threshold,
    }
}

/// Raw per-wallet metrics resolved via the on-chain fallback path.
/// §4.J: transaction count is the size of the unique set of inbound and
/// outbound transfer records, never the RPC nonce (which only counts
/// sent transactions and misses funding activity).
#[derive(Debug, Clone)]
pub struct OnChainMetrics {
    pub transaction_count: u64,
    pub account_age_days: Option<f64>,
    pub cex_funded_recently: bool,
    pub protocol_diversity: u32,
    pub netflow_concentration_pct: f64,
    pub current_trade_usd: Usd,
    pub market_open_interest: Usd,
}

pub fn compute_onchain_flags(metrics: &OnChainMetrics, config: &ForensicsConfig) -> WalletFlags {
    WalletFlags {
        low_trade_count: metrics.transaction_count <= config.max_wallet_transactions,
        young_account: metrics
            .account_age_days
            .map(|d| d <= config.min_wallet_age_in_days)
            .unwrap_or(true),
        // No reliable on-chain USD-volume signal; left unset rather than
        // approximated from a single observed trade.
        low_volume: false,
        high_concentration: metrics.netflow_concentration_pct >= config.min_netflow_percentage,
        fresh_fat_bet: metrics.cex_funded_recently
            && metrics.current_trade_usd.inner() >= config.subgraph_fresh_fat_bet_size_usd
            && metrics.market_open_interest.inner() <= config.subgraph_fresh_fat_bet_max_oi,
        low_diversification: metrics.protocol_diversity
            <= config.subgraph_low_diversification_threshold,
    }
}

/// Ratio-based netflow concentration: how lopsided inbound vs. outbound
/// transfer volume is, as a percentage. 100% means entirely one-directional.
pub fn netflow_concentration_pct(inbound: Decimal, outbound: Decimal) -> f64 {
    let total = inbound + outbound;
    if total <= Decimal::ZERO {
        return 0.0;
    }
    let imbalance = (inbound - outbound).abs();
    use rust_decimal::prelude::ToPrimitive;
    ((imbalance / total) * Decimal::from(100)).to_f64().unwrap_or(0.0)
}
