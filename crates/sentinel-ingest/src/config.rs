//! Ingestion configuration (§4.G, §6).

use crate::error::IngestError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_max_trade_age_minutes() -> i64 {
    60
}

fn default_startup_grace_ms() -> u64 {
    10_000
}

fn default_priority_fetch_debounce_secs() -> u64 {
    15
}

fn default_poll_chunk_size() -> usize {
    25
}

fn default_min_inter_batch_delay_ms() -> u64 {
    200
}

fn default_max_inter_batch_delay_ms() -> u64 {
    5_000
}

fn default_exchange_trades_limit() -> u32 {
    100
}

fn default_dedup_ttl_secs() -> u64 {
    86_400
}

/// Typed surface for every ingestion-related option in §6's configuration
/// table (`pollIntervalMs`, `minTradeUsdPrefilter`, `maxTradeAgeMinutes`)
/// plus the poller's internal tuning knobs that the spec names only by
/// behavior (startup grace, priority-fetch debounce, adaptive batching).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub poll_interval_ms: u64,
    pub min_trade_usd_prefilter: Option<Decimal>,
    pub max_trade_age_minutes: i64,
    pub startup_grace_ms: u64,
    pub priority_fetch_debounce_secs: u64,
    pub poll_chunk_size: usize,
    pub min_inter_batch_delay_ms: u64,
    pub max_inter_batch_delay_ms: u64,
    pub exchange_trades_limit: u32,
    pub dedup_ttl_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            min_trade_usd_prefilter: None,
            max_trade_age_minutes: default_max_trade_age_minutes(),
            startup_grace_ms: default_startup_grace_ms(),
            priority_fetch_debounce_secs: default_priority_fetch_debounce_secs(),
            poll_chunk_size: default_poll_chunk_size(),
            min_inter_batch_delay_ms: default_min_inter_batch_delay_ms(),
            max_inter_batch_delay_ms: default_max_inter_batch_delay_ms(),
            exchange_trades_limit: default_exchange_trades_limit(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.poll_interval_ms == 0 {
            return Err(IngestError::Config("pollIntervalMs must be positive".into()));
        }
        if self.poll_chunk_size == 0 {
            return Err(IngestError::Config("pollChunkSize must be positive".into()));
        }
        if self.min_inter_batch_delay_ms > self.max_inter_batch_delay_ms {
            return Err(IngestError::Config(
                "minInterBatchDelayMs must not exceed maxInterBatchDelayMs".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn priority_fetch_debounce(&self) -> Duration {
        Duration::from_secs(self.priority_fetch_debounce_secs)
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.dedup_ttl_secs)
    }
}
