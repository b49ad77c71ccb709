//! S4: the indexer going hard down opens its circuit breaker, forensics
//! falls back to the on-chain path while the breaker is open, and the
//! breaker recovers through half-open once the indexer comes back.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use sentinel_cache::FingerprintStore;
use sentinel_clients::retry::{call_with_resilience, RetryPolicy};
use sentinel_clients::{
    ActivityRecord, ChainRpcClient, ClientError, ClobTrade, ExplorerClient, IndexerClient, LogEntry,
    NormalTransaction, TransactionReceipt, TransferDirection, TransferRecord, UserPosition,
};
use sentinel_core::{
    Address, ConditionId, Market, MarketId, Side, Tier, TokenAmount, TokenId, Trade, TradeSource, TxHash, Usd,
};
use sentinel_forensics::{ForensicsConfig, WalletForensics};
use sentinel_resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RateLimiter, ResilienceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn fast_breaker_config() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 3,
        monitoring_period: chrono::Duration::seconds(60),
        recovery_timeout: chrono::Duration::milliseconds(20),
        half_open_max_attempts: 1,
    }
}

async fn call_upstream(
    rate_limiter: &RateLimiter,
    breaker: &CircuitBreaker,
    calls: &AtomicUsize,
    down: &std::sync::atomic::AtomicBool,
) -> sentinel_clients::Result<()> {
    let policy = RetryPolicy {
        max_retries: 0,
        ..RetryPolicy::default()
    };
    call_with_resilience(rate_limiter, breaker, policy, || {
        calls.fetch_add(1, Ordering::SeqCst);
        let is_down = down.load(Ordering::SeqCst);
        async move {
            if is_down {
                Err(ClientError::Decode("indexer unreachable".into()))
            } else {
                Ok(())
            }
        }
    })
    .await
}

/// Drives the real rate-limit -> circuit-break -> retry pipeline
/// (`sentinel_clients::retry::call_with_resilience`) against an upstream
/// that is down for the first three calls, confirming the breaker opens,
/// short-circuits further attempts without touching the upstream, then
/// recovers through half-open once it is reachable again.
#[tokio::test]
async fn breaker_opens_on_sustained_failure_and_recovers_through_half_open() {
    let rate_limiter = RateLimiter::new("indexer", 1_000);
    let breaker = CircuitBreaker::new("indexer", fast_breaker_config());
    let calls = AtomicUsize::new(0);
    let upstream_down = std::sync::atomic::AtomicBool::new(true);

    for _ in 0..3 {
        assert!(call_upstream(&rate_limiter, &breaker, &calls, &upstream_down).await.is_err());
    }
    assert_eq!(breaker.state().await, CircuitState::Open);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Further calls are rejected at the breaker without reaching the fake
    // upstream at all.
    let err = call_upstream(&rate_limiter, &breaker, &calls, &upstream_down).await.unwrap_err();
    assert!(matches!(err, ClientError::Resilience(ResilienceError::CircuitOpen { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 3, "short-circuited call must not invoke the upstream");

    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    upstream_down.store(false, Ordering::SeqCst);

    assert!(call_upstream(&rate_limiter, &breaker, &calls, &upstream_down).await.is_ok());
    assert_eq!(breaker.state().await, CircuitState::Closed);
}

/// A young wallet with no indexer footprint at all (the shape an indexer
/// outage produces for every address) must still be fingerprinted via the
/// on-chain fallback rather than surfacing an empty result.
struct DownIndexer;

#[async_trait]
impl IndexerClient for DownIndexer {
    async fn user_activity(&self, _address: &Address) -> sentinel_clients::Result<Vec<ActivityRecord>> {
        Err(ClientError::Decode("indexer unreachable".into()))
    }
    async fn user_positions(&self, _address: &Address) -> sentinel_clients::Result<Vec<UserPosition>> {
        Err(ClientError::Decode("indexer unreachable".into()))
    }
    async fn clob_trades_as_maker(&self, _address: &Address) -> sentinel_clients::Result<Vec<ClobTrade>> {
        Err(ClientError::Decode("indexer unreachable".into()))
    }
    async fn clob_trades_as_taker(&self, _address: &Address) -> sentinel_clients::Result<Vec<ClobTrade>> {
        Err(ClientError::Decode("indexer unreachable".into()))
    }
    async fn resolve_signer(&self, _proxy: &Address) -> sentinel_clients::Result<Option<Address>> {
        Err(ClientError::Decode("indexer unreachable".into()))
    }
    async fn recent_trades(
        &self,
        _token_ids: &[String],
        _from_block: u64,
        _to_block: u64,
    ) -> sentinel_clients::Result<Vec<ClobTrade>> {
        Err(ClientError::Decode("indexer unreachable".into()))
    }
}

struct ReachableChain {
    inbound: Vec<TransferRecord>,
}

#[async_trait]
impl ChainRpcClient for ReachableChain {
    async fn transaction_count(&self, _address: &Address) -> sentinel_clients::Result<u64> {
        Ok(self.inbound.len() as u64)
    }
    async fn first_transfer_timestamp(&self, _address: &Address) -> sentinel_clients::Result<Option<i64>> {
        Ok(Some(Utc::now().timestamp_millis() - 86_400_000 * 10))
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
            TransferDirection::Outbound => vec![],
        })
    }
    async fn current_block_number(&self) -> sentinel_clients::Result<u64> {
        Ok(5000)
    }
    async fn block_timestamp(&self, _block_number: u64) -> sentinel_clients::Result<i64> {
        Ok(0)
    }
    async fn transaction_receipt(&self, _tx_hash: &TxHash) -> sentinel_clients::Result<TransactionReceipt> {
        Ok(TransactionReceipt {
            tx_hash: TxHash::parse("0xdead"),
            block_number: 5000,
            status: true,
            logs: Vec::<LogEntry>::new(),
        })
    }
}

struct EmptyExplorer;

#[async_trait]
impl ExplorerClient for EmptyExplorer {
    async fn first_transfer_timestamp(&self, _address: &Address) -> sentinel_clients::Result<Option<i64>> {
        Ok(None)
    }
    async fn normal_transactions(
        &self,
        _address: &Address,
        _method_id: Option<&str>,
    ) -> sentinel_clients::Result<Vec<NormalTransaction>> {
        Ok(vec![])
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

fn market() -> Market {
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
        open_interest: Usd::new(dec!(50000)),
        lifetime_volume: Usd::new(dec!(1_000_000)),
    }
}

fn whale_trade(taker: Address) -> Trade {
    Trade::new(
        "t1".into(),
        MarketId("m1".into()),
        Side::Buy,
        sentinel_core::Outcome::Yes,
        TokenAmount::new(dec!(200000)),
        sentinel_core::Probability::new(dec!(0.5)),
        taker,
        None,
        Utc::now().timestamp_millis(),
        TradeSource::Pull,
        None,
    )
    .unwrap()
}

#[tokio::test]
async fn falls_back_to_onchain_fingerprint_when_indexer_is_entirely_down() {
    let taker = Address::parse("0x2222222222222222222222222222222222222222").unwrap();
    let chain = ReachableChain {
        inbound: vec![TransferRecord {
            direction: TransferDirection::Inbound,
            counterparty: taker,
            category: "external".into(),
            amount: TokenAmount::new(dec!(5)),
            block_number: 1,
            timestamp_ms: Utc::now().timestamp_millis() - 86_400_000 * 10,
        }],
    };

    let forensics = WalletForensics::new(
        ForensicsConfig::default(),
        Arc::new(DownIndexer),
        Arc::new(chain),
        Arc::new(EmptyExplorer),
        Arc::new(InMemoryFingerprintStore::default()),
        Arc::new(InMemoryFingerprintStore::default()),
        Arc::new(sentinel_telemetry::StatsRegistry::new()),
    );

    let fingerprint = forensics.analyze(&whale_trade(taker), &market()).await.unwrap();
    assert_eq!(fingerprint.path, sentinel_core::ForensicsPath::OnChain);
    assert!(fingerprint.account_age_days.unwrap() > 9.0);
}
