//! Scoring and persistence configuration (§4.K, §6).

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_alert_threshold() -> i32 {
    65
}

fn default_lock_ttl_secs() -> u64 {
    10
}

fn default_lock_max_retries() -> u32 {
    5
}

fn default_lock_retry_delay_ms() -> u64 {
    100
}

/// `alertThreshold` (§6) plus the distributed-lock tuning the trade-id
/// guard around the write path uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub alert_threshold: i32,
    pub lock_ttl_secs: u64,
    pub lock_max_retries: u32,
    pub lock_retry_delay_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            alert_threshold: default_alert_threshold(),
            lock_ttl_secs: default_lock_ttl_secs(),
            lock_max_retries: default_lock_max_retries(),
            lock_retry_delay_ms: default_lock_retry_delay_ms(),
        }
    }
}

impl AlertConfig {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn lock_retry_delay(&self) -> Duration {
        Duration::from_millis(self.lock_retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_matches_spec() {
        assert_eq!(AlertConfig::default().alert_threshold, 65);
    }
}
