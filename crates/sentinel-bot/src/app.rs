//! Main application orchestration.
//!
//! Wires every layer together: upstream clients behind per-upstream rate
//! limiters and circuit breakers, the market registry, both trade
//! producers, the bounded queue, the detector/forensics/alert pipeline,
//! and the background tasks that drive them. `Application::new` performs
//! all async setup (pool connections, cache wiring); `run` spawns the
//! producers and drives the single trade-consumer loop until shutdown.

use crate::adapters::{OrderbookLiquiditySource, PersistedTradeHistorySource, PersistedVolumeSource};
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::notifier::WebhookNotifier;
use chrono::Utc;
use sentinel_alerts::{AlertOutcome, AlertProcessor, MarketContext};
use sentinel_cache::{DedupStore, DistributedLock, FingerprintCache, RedisBreakerStore};
use sentinel_clients::{
    ChainRpcClient, ExplorerClient, GraphQlIndexerClient, HttpChainRpcClient, HttpExplorerClient,
    HttpMarketDataClient, IndexerClient, MarketDataClient, MarketFeedClient,
};
use sentinel_detector::SignalDetector;
use sentinel_forensics::WalletForensics;
use sentinel_ingest::{FeedSubscriptionSink, MarketLookup, PullPoller, PushSubscriber};
use sentinel_queue::{TradeConsumer, TradeQueue};
use sentinel_registry::MarketRegistry;
use sentinel_registry::run_refresh_loop as registry_refresh_loop;
use sentinel_resilience::{CircuitBreaker, CircuitBreakerConfig, RateLimiter};
use sentinel_telemetry::{CounterSink, StatsRegistry};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

const FINGERPRINT_INDEXER_KEYSPACE: &str = "forensics:indexer";
const FINGERPRINT_ONCHAIN_KEYSPACE: &str = "forensics:onchain";
const MARKET_FEED_EVENT_CAPACITY: usize = 4_096;
const PRIORITY_FETCH_CHANNEL_CAPACITY: usize = 256;

/// Top-level surveillance pipeline. Holds every long-lived component plus
/// the handles needed to drive graceful shutdown (§5).
pub struct Application {
    config: AppConfig,
    registry: Arc<MarketRegistry>,
    market_data: Arc<dyn MarketDataClient>,
    queue: Arc<TradeQueue>,
    consumer: Option<TradeConsumer>,
    detector: Arc<SignalDetector>,
    forensics: Arc<WalletForensics>,
    alerts: Arc<AlertProcessor>,
    feed_client: Arc<MarketFeedClient>,
    push_subscriber: Arc<PushSubscriber>,
    pull_poller: Arc<PullPoller>,
    feed_event_rx: Option<mpsc::Receiver<sentinel_clients::MarketFeedEvent>>,
    priority_tx: mpsc::Sender<sentinel_core::ConditionId>,
    priority_rx: Option<mpsc::Receiver<sentinel_core::ConditionId>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Application {
    /// Connect every upstream dependency and wire the pipeline. No
    /// background work runs until [`Application::run`] is called.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_db_connections)
            .connect(&config.database_url)
            .await?;
        let store = sentinel_persistence::PersistenceStore::new(pool);

        let redis_client = redis::Client::open(config.redis_url.clone())?;
        let conn = redis_client.get_connection_manager().await?;

        let http = reqwest::Client::new();
        let stats: Arc<dyn CounterSink> = Arc::new(StatsRegistry::new());

        let breaker_store: Arc<dyn sentinel_resilience::SharedStateStore> =
            Arc::new(RedisBreakerStore::new(conn.clone()));

        let chain_rpc_limiter = RateLimiter::new("chain-rpc", config.chain_rpc_rate_limit);
        let explorer_limiter = RateLimiter::new("explorer", config.explorer_rate_limit);
        let indexer_limiter = RateLimiter::new("indexer", config.indexer_rate_limit);
        let market_data_limiter = RateLimiter::new("market-data", config.market_data_rate_limit);

        let chain_rpc_breaker =
            CircuitBreaker::with_store("chain-rpc", CircuitBreakerConfig::default(), breaker_store.clone());
        let explorer_breaker =
            CircuitBreaker::with_store("explorer", CircuitBreakerConfig::default(), breaker_store.clone());
        let indexer_breaker =
            CircuitBreaker::with_store("indexer", CircuitBreakerConfig::default(), breaker_store.clone());
        let market_data_breaker =
            CircuitBreaker::with_store("market-data", CircuitBreakerConfig::default(), breaker_store.clone());

        let chain_rpc: Arc<dyn ChainRpcClient> = Arc::new(HttpChainRpcClient::new(
            config.chain_rpc_url.clone(),
            http.clone(),
            chain_rpc_limiter,
            chain_rpc_breaker,
        ));
        let explorer: Arc<dyn ExplorerClient> = Arc::new(HttpExplorerClient::new(
            config.explorer_url.clone(),
            http.clone(),
            explorer_limiter,
            explorer_breaker,
        ));
        let indexer: Arc<dyn IndexerClient> = Arc::new(GraphQlIndexerClient::new(
            config.indexer_url.clone(),
            http.clone(),
            indexer_limiter,
            indexer_breaker,
        ));
        let market_data: Arc<dyn MarketDataClient> = Arc::new(HttpMarketDataClient::new(
            config.market_data_url.clone(),
            http.clone(),
            market_data_limiter.clone(),
            market_data_breaker,
        ));

        let (feed_event_tx, feed_event_rx) = mpsc::channel(MARKET_FEED_EVENT_CAPACITY);
        let feed_client = Arc::new(MarketFeedClient::new(config.feed_config(), feed_event_tx));
        let feed_sink = Arc::new(FeedSubscriptionSink::new(feed_client.clone()));

        let registry = Arc::new(MarketRegistry::new(store.clone(), feed_sink));
        registry.load().await?;

        let dedup = Arc::new(DedupStore::new(conn.clone()));
        let lock = Arc::new(DistributedLock::new(conn.clone()));
        let indexer_cache: Arc<dyn sentinel_cache::FingerprintStore> = Arc::new(FingerprintCache::new(
            conn.clone(),
            FINGERPRINT_INDEXER_KEYSPACE,
            Duration::from_secs(config.forensics.subgraph_cache_ttl_hours.max(0) as u64 * 3_600),
        ));
        let onchain_cache: Arc<dyn sentinel_cache::FingerprintStore> = Arc::new(FingerprintCache::new(
            conn.clone(),
            FINGERPRINT_ONCHAIN_KEYSPACE,
            Duration::from_secs(config.forensics.onchain_cache_ttl_hours.max(0) as u64 * 3_600),
        ));

        let queue = Arc::new(TradeQueue::new(config.queue_capacity, stats.clone()));
        let consumer = Some(queue.take_consumer()?);

        let liquidity = Arc::new(OrderbookLiquiditySource::new(market_data.clone(), Duration::from_secs(5)));
        let volume = Arc::new(PersistedVolumeSource::new(store.clone()));
        let history = Arc::new(PersistedTradeHistorySource::new(store.clone()));
        let detector = Arc::new(SignalDetector::new(
            config.detector.clone(),
            liquidity,
            volume,
            history,
            stats.clone(),
        ));

        let forensics = Arc::new(WalletForensics::new(
            config.forensics.clone(),
            indexer,
            chain_rpc,
            explorer,
            indexer_cache,
            onchain_cache,
            stats.clone(),
        ));

        let notifier = Arc::new(WebhookNotifier::new(http.clone(), config.notification_webhook_url.clone()));
        let alerts = Arc::new(AlertProcessor::new(store, lock, notifier, stats.clone(), config.alerts.clone()));

        let push_subscriber = Arc::new(PushSubscriber::new(
            registry.clone(),
            dedup.clone(),
            queue.clone(),
            stats.clone(),
            config.ingest.clone(),
        ));

        let (priority_tx, priority_rx) = mpsc::channel(PRIORITY_FETCH_CHANNEL_CAPACITY);
        let registry_for_poller = registry.clone();
        let pull_poller = Arc::new(PullPoller::new(
            registry.clone() as Arc<dyn MarketLookup>,
            market_data.clone(),
            market_data_limiter,
            dedup,
            queue.clone(),
            stats,
            config.ingest.clone(),
            move || registry_for_poller.enabled_condition_ids(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            registry,
            market_data,
            queue,
            consumer,
            detector,
            forensics,
            alerts,
            feed_client,
            push_subscriber,
            pull_poller,
            feed_event_rx: Some(feed_event_rx),
            priority_tx,
            priority_rx: Some(priority_rx),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Spawn producers and drive the consumer loop until `ctrl_c` or an
    /// internal shutdown request, then drain the queue and disconnect
    /// upstreams (§5's cancellation contract, §8 S6).
    pub async fn run(mut self) -> AppResult<()> {
        let feed_client = self.feed_client.clone();
        let feed_handle = tokio::spawn(async move {
            if let Err(e) = feed_client.run().await {
                warn!(error = %e, "market feed client exited");
            }
        });

        let push_subscriber = self.push_subscriber.clone();
        let feed_event_rx = self
            .feed_event_rx
            .take()
            .expect("feed event receiver taken exactly once");
        let priority_tx = self.priority_tx.clone();
        let push_handle = tokio::spawn(async move {
            push_subscriber.run(feed_event_rx, priority_tx).await;
        });

        let pull_poller = self.pull_poller.clone();
        let priority_rx = self.priority_rx.take().expect("priority receiver taken exactly once");
        let poll_shutdown_rx = self.shutdown_rx.clone();
        let poll_handle = tokio::spawn(async move {
            pull_poller.run(priority_rx, poll_shutdown_rx).await;
        });

        let registry = self.registry.clone();
        let market_data = self.market_data.clone();
        let refresh_interval = self.config.registry_refresh_interval();
        let refresh_handle = tokio::spawn(async move {
            registry_refresh_loop(registry, market_data, refresh_interval).await;
        });

        // The consumer keeps draining until the channel empties and every
        // sender is gone; `TradeQueue::drain`'s depth poll below only makes
        // progress while this task is still calling `recv`, so it must
        // outlive the producer shutdown, not race it.
        let mut consumer = self.consumer.take().expect("consumer taken exactly once");
        let registry = self.registry.clone();
        let detector = self.detector.clone();
        let forensics = self.forensics.clone();
        let alerts = self.alerts.clone();
        let consumer_handle = tokio::spawn(async move {
            while let Some(trade) = consumer.recv().await {
                process_trade(&registry, &detector, &forensics, &alerts, &mut consumer, trade).await;
            }
        });

        info!("sentinel-bot running");
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received, stopping producers");

        let _ = self.shutdown_tx.send(true);
        for (name, handle) in [
            ("market feed", feed_handle),
            ("push subscriber", push_handle),
            ("registry refresh", refresh_handle),
        ] {
            handle.abort();
            let _ = handle.await;
            info!(task = name, "producer stopped");
        }
        let _ = poll_handle.await;

        if !self.queue.drain(self.config.drain_timeout()).await {
            warn!("queue did not fully drain within the configured timeout");
        }
        consumer_handle.abort();
        let _ = consumer_handle.await;

        info!("shutdown complete");
        Ok(())
    }
}

/// Handle one trade end to end: detect, dormancy, forensics, score and
/// persist. Any terminal failure routes the trade to the dead-letter queue
/// rather than panicking the single consumer task.
async fn process_trade(
    registry: &Arc<MarketRegistry>,
    detector: &Arc<SignalDetector>,
    forensics: &Arc<WalletForensics>,
    alerts: &Arc<AlertProcessor>,
    consumer: &mut TradeConsumer,
    trade: sentinel_core::Trade,
) {
    let Some(market) = registry.by_id(&trade.market_id) else {
        consumer.dead_letter(trade, "market not found in registry");
        return;
    };

    let Some(signal) = detector.detect(&trade, &market).await else {
        return;
    };

    let dormancy = detector.dormancy(&market, Utc::now()).await;

    let fingerprint = match forensics.analyze(&trade, &market).await {
        Ok(fingerprint) => fingerprint,
        Err(e) => {
            warn!(trade_id = %trade.id, error = %e, "wallet forensics failed");
            consumer.dead_letter(trade, format!("forensics failed: {e}"));
            return;
        }
    };

    let market_context = MarketContext {
        slug: market.url_slug.clone(),
        question: market.question.clone(),
    };

    let outcome = alerts
        .process(
            trade.id.clone(),
            trade.market_id.clone(),
            trade.taker,
            trade.usd_value(),
            &signal,
            &dormancy,
            &fingerprint,
            market_context,
        )
        .await;

    match outcome {
        Ok(AlertOutcome::Persisted(_)) | Ok(AlertOutcome::BelowThreshold { .. }) => {}
        Ok(AlertOutcome::LockUnavailable) => {
            warn!(trade_id = %trade.id, "alert lock unavailable, dropping");
        }
        Err(e) => {
            warn!(trade_id = %trade.id, error = %e, "alert persistence failed");
            consumer.dead_letter(trade, format!("alert persistence failed: {e}"));
        }
    }
}

