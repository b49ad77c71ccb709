//! Composite scorer + idempotent persister (§4.K).
//!
//! A distributed lock keyed by trade id guards the write path so push and
//! pull duplicates of the same trade cannot double-emit an alert (§8
//! property 3). The lock is released on write success or on a typed lock
//! error, never held across the fire-and-forget notification.

use crate::config::AlertConfig;
use crate::notifier::{truncate_address, AlertNotification, Notifier};
use crate::scorer::score;
use chrono::Utc;
use sentinel_cache::DistributedLock;
use sentinel_core::{Address, Alert, Classification, DormancyMetrics, MarketId, Signal, Usd, WalletFingerprint};
use sentinel_persistence::{alert_exists_for_trade, upsert_alert, PersistenceStore};
use sentinel_telemetry::CounterSink;
use std::sync::Arc;
use tracing::warn;

fn classification_counter_name(classification: Classification) -> &'static str {
    match classification {
        Classification::StrongInsider => "alert_strong_insider",
        Classification::HighConfidence => "alert_high_confidence",
        Classification::MediumConfidence => "alert_medium_confidence",
        Classification::LogOnly => "alert_log_only",
    }
}

#[derive(Debug)]
pub enum AlertOutcome {
    /// Persisted (or re-persisted, idempotently) with this final record.
    Persisted(Box<Alert>),
    /// Composite score fell below `alertThreshold`; nothing written.
    BelowThreshold { score: i32 },
    /// The trade-id lock could not be acquired within the configured
    /// retry budget; caller should treat this the same as a transient
    /// upstream failure (retry later or drop per its own policy).
    LockUnavailable,
}

/// Market metadata needed only for the outbound notification payload; the
/// alert row itself only needs the market id.
pub struct MarketContext {
    pub slug: String,
    pub question: String,
}

pub struct AlertProcessor {
    store: PersistenceStore,
    lock: Arc<DistributedLock>,
    notifier: Arc<dyn Notifier>,
    stats: Arc<dyn CounterSink>,
    config: AlertConfig,
}

impl AlertProcessor {
    pub fn new(
        store: PersistenceStore,
        lock: Arc<DistributedLock>,
        notifier: Arc<dyn Notifier>,
        stats: Arc<dyn CounterSink>,
        config: AlertConfig,
    ) -> Self {
        Self {
            store,
            lock,
            notifier,
            stats,
            config,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn process(
        &self,
        trade_id: String,
        market_id: MarketId,
        wallet: Address,
        usd_value: Usd,
        signal: &Signal,
        dormancy: &DormancyMetrics,
        fingerprint: &WalletFingerprint,
        market: MarketContext,
    ) -> crate::error::Result<AlertOutcome> {
        let breakdown = score(signal, dormancy, fingerprint);
        let composite = breakdown.composite();

        if composite < self.config.alert_threshold {
            self.stats.incr("alert_below_threshold", 1);
            return Ok(AlertOutcome::BelowThreshold { score: composite });
        }

        let lock_key = format!("alert:{trade_id}");
        let handle = match self
            .lock
            .acquire(
                &lock_key,
                self.config.lock_ttl(),
                self.config.lock_max_retries,
                self.config.lock_retry_delay(),
            )
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!(trade_id = %trade_id, error = %e, "failed to acquire alert lock");
                self.stats.incr("alert_lock_unavailable", 1);
                return Ok(AlertOutcome::LockUnavailable);
            }
        };

        let already_persisted = alert_exists_for_trade(self.store.pool(), &trade_id).await?;
        let alert = Alert::new(trade_id.clone(), market_id, wallet, breakdown, usd_value, Utc::now());
        let write_result = upsert_alert(self.store.pool(), &alert).await;

        if let Err(e) = handle.release().await {
            warn!(trade_id = %trade_id, error = %e, "failed to release alert lock");
        }
        write_result?;

        if !already_persisted {
            self.stats.incr("alerts_persisted", 1);
            self.stats.incr(classification_counter_name(alert.classification), 1);
        }

        if alert.classification.notifies() {
            let notification = AlertNotification {
                market_slug: market.slug,
                market_question: market.question,
                classification: alert.classification,
                score: alert.score,
                wallet_truncated: truncate_address(&wallet.to_string()),
                usd_value: usd_value.to_string(),
            };
            let notifier = self.notifier.clone();
            tokio::spawn(async move {
                notifier.notify(notification).await;
            });
        }

        Ok(AlertOutcome::Persisted(Box::new(alert)))
    }
}
