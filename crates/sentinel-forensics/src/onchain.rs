//! On-chain fallback path (§4.J): used when the indexer has no data for an
//! address. Transaction count comes from the unique set of inbound and
//! outbound asset transfers — never the RPC nonce, which only counts sent
//! transactions and misses funding activity entirely.

use crate::config::ForensicsConfig;
use crate::error::Result;
use crate::flags::netflow_concentration_pct;
use rust_decimal::Decimal;
use sentinel_clients::{ChainRpcClient, ExplorerClient, TransferDirection};
use sentinel_core::Address;
use std::collections::HashSet;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// On-chain signals gathered for one address, independent of the trade
/// that triggered forensics (fresh-fat-bet still needs the live trade,
/// applied by the caller when computing flags).
#[derive(Debug, Clone)]
pub struct OnChainSignals {
    pub transaction_count: u64,
    pub account_age_days: Option<f64>,
    pub cex_funded_recently: bool,
    pub protocol_diversity: u32,
    pub netflow_concentration_pct: f64,
}

pub async fn gather_onchain_signals(
    chain: &dyn ChainRpcClient,
    explorer: &dyn ExplorerClient,
    address: &Address,
    config: &ForensicsConfig,
    now_ms: i64,
) -> Result<OnChainSignals> {
    let to_block = chain.current_block_number().await?;
    let from_block = 0;

    let inbound = chain
        .asset_transfers(address, TransferDirection::Inbound, "external", from_block, to_block)
        .await?;
    let outbound = chain
        .asset_transfers(address, TransferDirection::Outbound, "external", from_block, to_block)
        .await?;

    let mut unique = HashSet::new();
    for t in inbound.iter().chain(outbound.iter()) {
        unique.insert((t.block_number, t.counterparty, t.category.clone()));
    }
    let transaction_count = unique.len() as u64;

    let first_transfer_ms = match chain.first_transfer_timestamp(address).await? {
        Some(ts) => Some(ts),
        None => explorer.first_transfer_timestamp(address).await?,
    };
    let account_age_days = first_transfer_ms.map(|ts| (now_ms - ts) as f64 / MILLIS_PER_DAY);

    let window_start_ms = now_ms - config.cex_funding_window_days * 86_400_000;
    let cex_funded_recently = inbound.iter().any(|t| {
        t.timestamp_ms >= window_start_ms
            && config
                .known_cex_addresses
                .iter()
                .any(|known| known.eq_ignore_ascii_case(&t.counterparty.to_string()))
    });

    let normal_txs = explorer.normal_transactions(address, None).await?;
    let protocol_diversity = normal_txs
        .iter()
        .filter(|tx| tx.method_id != "0x")
        .filter_map(|tx| tx.to)
        .collect::<HashSet<_>>()
        .len() as u32;

    let inbound_total: Decimal = inbound.iter().map(|t| t.amount.inner()).sum();
    let outbound_total: Decimal = outbound.iter().map(|t| t.amount.inner()).sum();

    Ok(OnChainSignals {
        transaction_count,
        account_age_days,
        cex_funded_recently,
        protocol_diversity,
        netflow_concentration_pct: netflow_concentration_pct(inbound_total, outbound_total),
    })
}
