//! Heartbeat management for the market-data WebSocket connection.
//!
//! Monitors connection health by tracking ping/pong timing and message
//! activity.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default ping interval for the market feed (§4.E).
pub const DEFAULT_PING_INTERVAL_MS: u64 = 30_000;
/// Default pong timeout for the market feed (§4.E).
pub const DEFAULT_PONG_TIMEOUT_MS: u64 = 5_000;

/// Heartbeat manager for WebSocket connection health.
pub struct HeartbeatManager {
    /// Heartbeat interval (how often to send ping).
    interval_ms: u64,
    /// Timeout (how long to wait for pong).
    timeout_ms: u64,
    /// Last ping sent time.
    last_ping: Arc<RwLock<Option<DateTime<Utc>>>>,
    /// Last pong received time.
    last_pong: Arc<RwLock<Option<DateTime<Utc>>>>,
    /// Last message received time (any message).
    last_message: Arc<RwLock<DateTime<Utc>>>,
    /// Whether we're waiting for pong.
    waiting_for_pong: Arc<RwLock<bool>>,
}

impl HeartbeatManager {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms,
            last_ping: Arc::new(RwLock::new(None)),
            last_pong: Arc::new(RwLock::new(None)),
            last_message: Arc::new(RwLock::new(Utc::now())),
            waiting_for_pong: Arc::new(RwLock::new(false)),
        }
    }

    /// Reset heartbeat state (called on connection).
    pub fn reset(&self) {
        *self.last_ping.write() = None;
        *self.last_pong.write() = None;
        *self.last_message.write() = Utc::now();
        *self.waiting_for_pong.write() = false;
    }

    pub fn record_ping(&self) {
        let now = Utc::now();
        *self.last_ping.write() = Some(now);
        *self.waiting_for_pong.write() = true;
        debug!(time = %now, "sent ping");
    }

    pub fn record_pong(&self) {
        let now = Utc::now();
        *self.last_pong.write() = Some(now);
        *self.waiting_for_pong.write() = false;

        if let Some(ping_time) = *self.last_ping.read() {
            let rtt_ms = (now - ping_time).num_milliseconds();
            debug!(rtt_ms, "received pong");
        }
    }

    /// Record that any message was received (book/trade/price_change/etc).
    pub fn record_message(&self) {
        *self.last_message.write() = Utc::now();
    }

    pub fn is_timed_out(&self) -> bool {
        if !*self.waiting_for_pong.read() {
            return false;
        }
        if let Some(ping_time) = *self.last_ping.read() {
            let elapsed_ms = (Utc::now() - ping_time).num_milliseconds();
            return elapsed_ms > self.timeout_ms as i64;
        }
        false
    }

    pub fn time_since_last_message_ms(&self) -> i64 {
        (Utc::now() - *self.last_message.read()).num_milliseconds()
    }

    pub fn should_send_heartbeat(&self) -> bool {
        if *self.waiting_for_pong.read() {
            return false;
        }
        self.time_since_last_message_ms() >= self.interval_ms as i64
    }

    /// Wait for the next heartbeat check.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep(Duration::from_millis(self.interval_ms / 2)).await;
    }

    pub fn stats(&self) -> HeartbeatStats {
        HeartbeatStats {
            last_ping: *self.last_ping.read(),
            last_pong: *self.last_pong.read(),
            last_message: *self.last_message.read(),
            waiting_for_pong: *self.waiting_for_pong.read(),
            time_since_last_message_ms: self.time_since_last_message_ms(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeartbeatStats {
    pub last_ping: Option<DateTime<Utc>>,
    pub last_pong: Option<DateTime<Utc>>,
    pub last_message: DateTime<Utc>,
    pub waiting_for_pong: bool,
    pub time_since_last_message_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_not_timed_out() {
        let hb = HeartbeatManager::new(DEFAULT_PING_INTERVAL_MS, DEFAULT_PONG_TIMEOUT_MS);
        assert!(!hb.is_timed_out());
        assert!(!*hb.waiting_for_pong.read());
    }

    #[test]
    fn ping_then_pong_clears_wait_flag() {
        let hb = HeartbeatManager::new(DEFAULT_PING_INTERVAL_MS, DEFAULT_PONG_TIMEOUT_MS);
        hb.record_ping();
        assert!(*hb.waiting_for_pong.read());
        hb.record_pong();
        assert!(!*hb.waiting_for_pong.read());
    }

    #[test]
    fn unanswered_ping_times_out_after_timeout_ms() {
        let hb = HeartbeatManager::new(DEFAULT_PING_INTERVAL_MS, 0);
        hb.record_ping();
        std::thread::sleep(Duration::from_millis(5));
        assert!(hb.is_timed_out());
    }

    #[test]
    fn should_send_heartbeat_respects_waiting_flag() {
        let hb = HeartbeatManager::new(0, DEFAULT_PONG_TIMEOUT_MS);
        assert!(hb.should_send_heartbeat());
        hb.record_ping();
        assert!(!hb.should_send_heartbeat());
    }
}
