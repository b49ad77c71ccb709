//! Wallet forensics orchestrator (§4.J): indexer-first with on-chain
//! fallback, proxy resolution, two-keyspace caching, and confidence
//! calibration.

use crate::confidence::{calibrate, ConfidenceInputs, SourceAgreement};
use crate::config::ForensicsConfig;
use crate::error::Result;
use crate::flags::{compute_indexer_flags, compute_onchain_flags, IndexerMetrics, OnChainMetrics};
use crate::onchain::gather_onchain_signals;
use crate::proxy::resolve_signer;
use chrono::Utc;
use sentinel_cache::FingerprintStore;
use sentinel_clients::{ChainRpcClient, ExplorerClient, IndexerClient};
use sentinel_core::{Address, ForensicsPath, Market, Trade, Usd, WalletFingerprint};
use sentinel_telemetry::CounterSink;
use std::sync::Arc;
use tracing::{info, warn};

pub struct WalletForensics {
    config: ForensicsConfig,
    indexer: Arc<dyn IndexerClient>,
    chain: Arc<dyn ChainRpcClient>,
    explorer: Arc<dyn ExplorerClient>,
    indexer_cache: Arc<dyn FingerprintStore>,
    onchain_cache: Arc<dyn FingerprintStore>,
    stats: Arc<dyn CounterSink>,
}

impl WalletForensics {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ForensicsConfig,
        indexer: Arc<dyn IndexerClient>,
        chain: Arc<dyn ChainRpcClient>,
        explorer: Arc<dyn ExplorerClient>,
        indexer_cache: Arc<dyn FingerprintStore>,
        onchain_cache: Arc<dyn FingerprintStore>,
        stats: Arc<dyn CounterSink>,
    ) -> Self {
        Self {
            config,
            indexer,
            chain,
            explorer,
            indexer_cache,
            onchain_cache,
            stats,
        }
    }

    async fn cached(store: &dyn FingerprintStore, key: &str) -> Option<WalletFingerprint> {
        let raw = store.get_raw(key).await?;
        match serde_json::from_str(&raw) {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                warn!(error = %e, "cached fingerprint payload corrupt, recomputing");
                None
            }
        }
    }

    async fn store(store: &dyn FingerprintStore, key: &str, fingerprint: &WalletFingerprint) -> Result<()> {
        let payload = serde_json::to_string(fingerprint).map_err(sentinel_cache::CacheError::Serialization)?;
        store.set_raw(key, payload).await?;
        Ok(())
    }

    /// Produce a wallet fingerprint for the taker of `trade` in `market`,
    /// resolving proxy→signer identity first (§4.J).
    pub async fn analyze(&self, trade: &Trade, market: &Market) -> Result<WalletFingerprint> {
        let signer = resolve_signer(self.indexer.as_ref(), trade.taker, &self.config).await?;
        let cache_key = signer.to_string();

        if let Some(cached) = Self::cached(self.indexer_cache.as_ref(), &cache_key).await {
            self.stats.incr("forensics_cache_hit_indexer", 1);
            return Ok(cached);
        }

        let (activity, positions, maker_trades, taker_trades) = tokio::join!(
            self.indexer.user_activity(&signer),
            self.indexer.user_positions(&signer),
            self.indexer.clob_trades_as_maker(&signer),
            self.indexer.clob_trades_as_taker(&signer),
        );

        let had_error = activity.is_err()
            || positions.is_err()
            || maker_trades.is_err()
            || taker_trades.is_err();
        let activity = activity.unwrap_or_default();
        let positions = positions.unwrap_or_default();
        let maker_trades = maker_trades.unwrap_or_default();
        let taker_trades = taker_trades.unwrap_or_default();
        let merged = sentinel_clients::merge_clob_trades(maker_trades, taker_trades);

        let has_indexer_data = !merged.is_empty() || !positions.is_empty() || !activity.is_empty();

        let fingerprint = if has_indexer_data {
            self.stats.incr("forensics_path_indexer", 1);
            let lifetime_trade_count = merged.len() as u64;
            let lifetime_usd_volume = Usd::new(merged.iter().map(|t| t.usd_size).sum());

            let earliest_ms = merged
                .iter()
                .map(|t| t.timestamp_ms)
                .chain(activity.iter().map(|a| a.timestamp_ms))
                .min();
            let account_age_days =
                earliest_ms.map(|ms| (Utc::now().timestamp_millis() - ms) as f64 / 86_400_000.0);

            let total_position_value: rust_decimal::Decimal = positions
                .iter()
                .map(|p| (p.net_deposits_usd - p.net_withdrawals_usd).abs())
                .sum();
            let max_position_value = positions
                .iter()
                .map(|p| (p.net_deposits_usd - p.net_withdrawals_usd).abs())
                .fold(rust_decimal::Decimal::ZERO, |acc, v| acc.max(v));
            let position_concentration_pct = if total_position_value.is_zero() {
                0.0
            } else {
                use rust_decimal::prelude::ToPrimitive;
                ((max_position_value / total_position_value) * rust_decimal::Decimal::from(100))
                    .to_f64()
                    .unwrap_or(0.0)
            };

            let markets_traded = {
                let mut ids: Vec<&str> = merged.iter().map(|t| t.condition_id.as_str()).collect();
                ids.sort_unstable();
                ids.dedup();
                ids.len() as u32
            };

            let metrics = IndexerMetrics {
                lifetime_trade_count,
                account_age_days,
                lifetime_usd_volume,
                position_concentration_pct,
                markets_traded,
                current_trade_usd: trade.usd_value(),
                market_open_interest: market.open_interest,
            };
            let flags = compute_indexer_flags(&metrics, &self.config);

            let (agreement, trade_history_count) = if self.config.enable_shadow_scoring {
                self.shadow_onchain_agreement(&signer, trade, market, merged.len(), flags.count()).await
            } else {
                (SourceAgreement::Either, merged.len())
            };

            let confidence = calibrate(ConfidenceInputs {
                agreement,
                cross_source_consistency: 1.0,
                data_completeness: if positions.is_empty() { 0.5 } else { 1.0 },
                served_from_cache: false,
                freshness_minutes: 0.0,
                had_upstream_errors: had_error,
                trade_history_count,
            });

            let fingerprint = WalletFingerprint {
                address: signer,
                path: ForensicsPath::Indexer,
                lifetime_trade_count,
                lifetime_usd_volume,
                account_age_days,
                position_concentration_pct,
                markets_traded,
                flags,
                confidence,
                computed_at: Utc::now(),
            };

            Self::store(self.indexer_cache.as_ref(), &cache_key, &fingerprint).await?;

            fingerprint
        } else {
            self.stats.incr("forensics_path_onchain", 1);
            self.onchain_fingerprint(&signer, trade, market).await?
        };

        sentinel_telemetry::Metrics::wallet_confidence(
            match fingerprint.path {
                ForensicsPath::Indexer => "indexer",
                ForensicsPath::OnChain => "onchain",
            },
            fingerprint.confidence.score,
        );

        Ok(fingerprint)
    }

    async fn onchain_fingerprint(
        &self,
        signer: &Address,
        trade: &Trade,
        market: &Market,
    ) -> Result<WalletFingerprint> {
        let cache_key = signer.to_string();
        if let Some(cached) = Self::cached(self.onchain_cache.as_ref(), &cache_key).await {
            self.stats.incr("forensics_cache_hit_onchain", 1);
            return Ok(cached);
        }

        let signals = gather_onchain_signals(
            self.chain.as_ref(),
            self.explorer.as_ref(),
            signer,
            &self.config,
            Utc::now().timestamp_millis(),
        )
        .await?;

        let metrics = OnChainMetrics {
            transaction_count: signals.transaction_count,
            account_age_days: signals.account_age_days,
            cex_funded_recently: signals.cex_funded_recently,
            protocol_diversity: signals.protocol_diversity,
            netflow_concentration_pct: signals.netflow_concentration_pct,
            current_trade_usd: trade.usd_value(),
            market_open_interest: market.open_interest,
        };
        let flags = compute_onchain_flags(&metrics, &self.config);

        let onchain_has_data = signals.transaction_count > 0 || signals.account_age_days.is_some();
        let agreement = if onchain_has_data {
            SourceAgreement::Either
        } else {
            SourceAgreement::Neither
        };

        let confidence = calibrate(ConfidenceInputs {
            agreement,
            cross_source_consistency: 1.0,
            data_completeness: 0.6,
            served_from_cache: false,
            freshness_minutes: 0.0,
            had_upstream_errors: false,
            trade_history_count: signals.transaction_count as usize,
        });

        let fingerprint = WalletFingerprint {
            address: *signer,
            path: ForensicsPath::OnChain,
            lifetime_trade_count: signals.transaction_count,
            lifetime_usd_volume: Usd::ZERO,
            account_age_days: signals.account_age_days,
            position_concentration_pct: signals.netflow_concentration_pct,
            markets_traded: 0,
            flags,
            confidence,
            computed_at: Utc::now(),
        };

        Self::store(self.onchain_cache.as_ref(), &cache_key, &fingerprint).await?;
        Ok(fingerprint)
    }

    /// Run the on-chain path alongside the indexer path (§4.J) and fold its
    /// verdict into the confidence inputs: `Both` when the two paths concur
    /// on suspiciousness, `Neither` when they actively disagree, `Either`
    /// when the shadow call itself fails and only one source is available.
    /// Trade-history evidence is combined across both sources so a wallet
    /// thin on indexer history but deep on-chain isn't penalized twice.
    async fn shadow_onchain_agreement(
        &self,
        signer: &Address,
        trade: &Trade,
        market: &Market,
        indexer_trade_history_count: usize,
        indexer_flags_count: u8,
    ) -> (SourceAgreement, usize) {
        match self.onchain_fingerprint(signer, trade, market).await {
            Ok(shadow) => {
                let indexer_suspicious = indexer_flags_count >= 2;
                let combined_history = indexer_trade_history_count.max(shadow.lifetime_trade_count as usize);
                if indexer_suspicious == shadow.is_suspicious() {
                    self.stats.incr("forensics_shadow_agree", 1);
                    info!(address = %signer, "AGREE: indexer and on-chain paths concur on suspiciousness");
                    (SourceAgreement::Both, combined_history)
                } else {
                    self.stats.incr("forensics_shadow_disagree", 1);
                    info!(address = %signer, "DISAGREE: indexer and on-chain paths diverge on suspiciousness");
                    (SourceAgreement::Neither, combined_history)
                }
            }
            Err(e) => {
                warn!(address = %signer, error = %e, "shadow on-chain scoring failed");
                (SourceAgreement::Either, indexer_trade_history_count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sentinel_clients::{
        ActivityRecord, ClientError, ClobTrade, NormalTransaction, TransactionReceipt, TransferDirection,
        TransferRecord, UserPosition,
    };
    use sentinel_core::{ConditionId, Side, TokenAmount, TokenId, Tier, TradeSource, TxHash};
    use sentinel_telemetry::StatsRegistry;
    use std::collections::HashMap;

    /// Indexer fake returning a fixed set of records per address; no two
    /// tests share state because each constructs its own instance.
    #[derive(Default)]
    struct FakeIndexer {
        activity: Vec<ActivityRecord>,
        positions: Vec<UserPosition>,
        maker_trades: Vec<ClobTrade>,
        taker_trades: Vec<ClobTrade>,
        signer: Option<Address>,
    }

    #[async_trait]
    impl IndexerClient for FakeIndexer {
        async fn user_activity(&self, _address: &Address) -> sentinel_clients::Result<Vec<ActivityRecord>> {
            Ok(self.activity.clone())
        }
        async fn user_positions(&self, _address: &Address) -> sentinel_clients::Result<Vec<UserPosition>> {
            Ok(self.positions.clone())
        }
        async fn clob_trades_as_maker(&self, _address: &Address) -> sentinel_clients::Result<Vec<ClobTrade>> {
            Ok(self.maker_trades.clone())
        }
        async fn clob_trades_as_taker(&self, _address: &Address) -> sentinel_clients::Result<Vec<ClobTrade>> {
            Ok(self.taker_trades.clone())
        }
        async fn resolve_signer(&self, _proxy: &Address) -> sentinel_clients::Result<Option<Address>> {
            Ok(self.signer)
        }
        async fn recent_trades(
            &self,
            _token_ids: &[String],
            _from_block: u64,
            _to_block: u64,
        ) -> sentinel_clients::Result<Vec<ClobTrade>> {
            Ok(vec![])
        }
    }

    /// On-chain fake used only by the fallback-path test: a handful of
    /// transfers and normal transactions, no RPC-nonce shortcuts.
    struct FakeChain {
        inbound: Vec<TransferRecord>,
        outbound: Vec<TransferRecord>,
        first_transfer_ms: Option<i64>,
    }

    #[async_trait]
    impl ChainRpcClient for FakeChain {
        async fn transaction_count(&self, _address: &Address) -> sentinel_clients::Result<u64> {
            Ok(0)
        }
        async fn first_transfer_timestamp(&self, _address: &Address) -> sentinel_clients::Result<Option<i64>> {
            Ok(self.first_transfer_ms)
        }
        async fn asset_transfers(
            &self,
            _address: &Address,
            direction: TransferDirection,
            _category: &str,
            _from_block: u64,
            _to_block: u64,
        ) -> sentinel_clients::Result<Vec<TransferRecord>> {
            Ok(match direction {
                TransferDirection::Inbound => self.inbound.clone(),
                TransferDirection::Outbound => self.outbound.clone(),
            })
        }
        async fn current_block_number(&self) -> sentinel_clients::Result<u64> {
            Ok(1000)
        }
        async fn block_timestamp(&self, _block_number: u64) -> sentinel_clients::Result<i64> {
            Ok(0)
        }
        async fn transaction_receipt(&self, _tx_hash: &TxHash) -> sentinel_clients::Result<TransactionReceipt> {
            Err(ClientError::Decode("not used in this fake".into()))
        }
    }

    struct FakeExplorer {
        normal_txs: Vec<NormalTransaction>,
    }

    #[async_trait]
    impl ExplorerClient for FakeExplorer {
        async fn first_transfer_timestamp(&self, _address: &Address) -> sentinel_clients::Result<Option<i64>> {
            Ok(None)
        }
        async fn normal_transactions(
            &self,
            _address: &Address,
            _method_id: Option<&str>,
        ) -> sentinel_clients::Result<Vec<NormalTransaction>> {
            Ok(self.normal_txs.clone())
        }
    }

    #[derive(Default)]
    struct InMemoryFingerprintStore(Mutex<HashMap<String, String>>);

    #[async_trait]
    impl FingerprintStore for InMemoryFingerprintStore {
        async fn get_raw(&self, identity: &str) -> Option<String> {
            self.0.lock().get(identity).cloned()
        }
        async fn set_raw(&self, identity: &str, payload: String) -> sentinel_cache::Result<()> {
            self.0.lock().insert(identity.to_string(), payload);
            Ok(())
        }
    }

    fn wallet() -> Address {
        Address::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    fn market(open_interest: Decimal) -> Market {
        Market {
            id: MarketId("m1".into()),
            condition_id: ConditionId("c1".into()),
            token_id_yes: Some(TokenId("y1".into())),
            token_id_no: Some(TokenId("n1".into())),
            question: "?".into(),
            url_slug: "q".into(),
            tier: Tier::One,
            category: "politics".into(),
            enabled: true,
            open_interest: Usd::new(open_interest),
            lifetime_volume: Usd::new(dec!(1_000_000)),
        }
    }

    fn trade() -> Trade {
        Trade::new(
            "t1".into(),
            MarketId("m1".into()),
            Side::Buy,
            sentinel_core::Outcome::Yes,
            TokenAmount::new(dec!(200000)),
            sentinel_core::Probability::new(dec!(0.5)),
            wallet(),
            None,
            Utc::now().timestamp_millis(),
            TradeSource::Pull,
            None,
        )
        .unwrap()
    }

    fn harness(indexer: FakeIndexer, chain: FakeChain, explorer: FakeExplorer) -> WalletForensics {
        WalletForensics::new(
            ForensicsConfig::default(),
            Arc::new(indexer),
            Arc::new(chain),
            Arc::new(explorer),
            Arc::new(InMemoryFingerprintStore::default()),
            Arc::new(InMemoryFingerprintStore::default()),
            Arc::new(StatsRegistry::new()),
        )
    }

    /// A young, low-volume, highly concentrated wallet making a fresh fat
    /// bet (§8 S1's wallet) should surface every indexer-path flag.
    #[tokio::test]
    async fn indexer_path_surfaces_fresh_fat_bet_and_concentration_flags() {
        let indexer = FakeIndexer {
            signer: None,
            maker_trades: vec![],
            taker_trades: vec![
                ClobTrade {
                    event_id: "e1".into(),
                    condition_id: "c1".into(),
                    token_id: "y1".into(),
                    usd_size: dec!(1000),
                    timestamp_ms: Utc::now().timestamp_millis() - 86_400_000 * 6,
                    as_maker: false,
                },
                ClobTrade {
                    event_id: "e2".into(),
                    condition_id: "c1".into(),
                    token_id: "y1".into(),
                    usd_size: dec!(1500),
                    timestamp_ms: Utc::now().timestamp_millis() - 86_400_000 * 5,
                    as_maker: false,
                },
            ],
            positions: vec![UserPosition {
                condition_id: "c1".into(),
                net_deposits_usd: dec!(4000),
                net_withdrawals_usd: dec!(0),
                realized_pnl_usd: dec!(0),
                unrealized_pnl_usd: dec!(0),
            }],
            activity: vec![],
        };
        let chain = FakeChain {
            inbound: vec![],
            outbound: vec![],
            first_transfer_ms: None,
        };
        let explorer = FakeExplorer { normal_txs: vec![] };

        let forensics = harness(indexer, chain, explorer);
        let fp = forensics.analyze(&trade(), &market(dec!(50000))).await.unwrap();

        assert_eq!(fp.path, ForensicsPath::Indexer);
        assert!(fp.flags.low_trade_count, "2 lifetime trades should trip the low-trade-count threshold");
        assert!(fp.flags.low_volume, "$2500 lifetime volume is below the $5000 threshold");
        assert!(fp.flags.high_concentration, "single market holds 100% of position value");
        assert!(fp.flags.fresh_fat_bet, "young wallet, $100k trade, $50k OI market");
        assert!(fp.flags.low_diversification, "only one market traded");
        assert!(fp.is_suspicious());
    }

    /// When the indexer has nothing for an address, forensics must fall
    /// back to the on-chain path rather than returning an empty fingerprint
    /// (§4.J).
    #[tokio::test]
    async fn falls_back_to_onchain_path_when_indexer_has_no_data() {
        let indexer = FakeIndexer::default();
        let chain = FakeChain {
            inbound: vec![TransferRecord {
                direction: TransferDirection::Inbound,
                counterparty: wallet(),
                category: "external".into(),
                amount: TokenAmount::new(dec!(10)),
                block_number: 1,
                timestamp_ms: Utc::now().timestamp_millis() - 86_400_000 * 2,
            }],
            outbound: vec![],
            first_transfer_ms: Some(Utc::now().timestamp_millis() - 86_400_000 * 2),
        };
        let explorer = FakeExplorer { normal_txs: vec![] };

        let forensics = harness(indexer, chain, explorer);
        let fp = forensics.analyze(&trade(), &market(dec!(50000))).await.unwrap();

        assert_eq!(fp.path, ForensicsPath::OnChain);
        assert!(fp.account_age_days.unwrap() < 3.0);
    }

    /// A second `analyze` call for the same address must be served from
    /// the indexer-path cache rather than re-querying the indexer.
    #[tokio::test]
    async fn second_analyze_is_served_from_cache() {
        let indexer = FakeIndexer {
            signer: None,
            maker_trades: vec![],
            taker_trades: vec![ClobTrade {
                event_id: "e1".into(),
                condition_id: "c1".into(),
                token_id: "y1".into(),
                usd_size: dec!(100_000),
                timestamp_ms: Utc::now().timestamp_millis() - 86_400_000 * 400,
                as_maker: false,
            }],
            positions: vec![],
            activity: vec![],
        };
        let chain = FakeChain {
            inbound: vec![],
            outbound: vec![],
            first_transfer_ms: None,
        };
        let explorer = FakeExplorer { normal_txs: vec![] };
        let cache = Arc::new(InMemoryFingerprintStore::default());

        let forensics = WalletForensics::new(
            ForensicsConfig::default(),
            Arc::new(indexer),
            Arc::new(chain),
            Arc::new(explorer),
            cache.clone(),
            Arc::new(InMemoryFingerprintStore::default()),
            Arc::new(StatsRegistry::new()),
        );

        let first = forensics.analyze(&trade(), &market(dec!(50000))).await.unwrap();
        let second = forensics.analyze(&trade(), &market(dec!(50000))).await.unwrap();
        assert_eq!(first.computed_at, second.computed_at, "second call should reuse the cached fingerprint");
    }
}
