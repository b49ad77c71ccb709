//! Per-upstream sliding-window rate limiting (§4.A).
//!
//! Submissions queue FIFO behind the window; the limiter never originates
//! an error for the wrapped call itself, only for a caller deadline.

use crate::error::{ResilienceError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Sliding-window rate limiter for a single named upstream.
pub struct RateLimiter {
    upstream: String,
    max_ops_per_sec: u32,
    timestamps: Mutex<VecDeque<Instant>>,
    consecutive_429s: AtomicU32,
    backing_off_until: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(upstream: impl Into<String>, max_ops_per_sec: u32) -> Arc<Self> {
        Arc::new(Self {
            upstream: upstream.into(),
            max_ops_per_sec,
            timestamps: Mutex::new(VecDeque::with_capacity(max_ops_per_sec as usize)),
            consecutive_429s: AtomicU32::new(0),
            backing_off_until: Mutex::new(None),
        })
    }

    fn cleanup(&self) {
        let cutoff = Instant::now() - Duration::from_secs(1);
        let mut timestamps = self.timestamps.lock();
        while timestamps.front().is_some_and(|&t| t < cutoff) {
            timestamps.pop_front();
        }
    }

    fn has_capacity(&self) -> bool {
        self.cleanup();
        self.timestamps.lock().len() < self.max_ops_per_sec as usize
    }

    /// Block (FIFO: first caller to see capacity proceeds) until capacity is
    /// available or `deadline` elapses.
    pub async fn wait_for_capacity(&self, deadline: Option<Instant>) -> Result<()> {
        loop {
            if self.has_capacity() {
                let mut timestamps = self.timestamps.lock();
                timestamps.push_back(Instant::now());
                return Ok(());
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(ResilienceError::DeadlineExceeded {
                        upstream: self.upstream.clone(),
                    });
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Query-only signal: is this upstream sustaining rate-limit responses.
    /// Used by Ingestion to skip or lengthen polls (§4.A, §4.G).
    pub fn is_backing_off(&self) -> bool {
        match *self.backing_off_until.lock() {
            Some(until) => Instant::now() < until,
            None => false,
        }
    }

    /// Record that the upstream itself returned a rate-limit response.
    /// After three consecutive occurrences the limiter starts signaling
    /// back-off for an exponential window capped at 60s.
    pub fn note_rate_limited(&self) {
        let count = self.consecutive_429s.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= 3 {
            let backoff_secs = (2u64.saturating_pow(count.min(6))).min(60);
            *self.backing_off_until.lock() = Some(Instant::now() + Duration::from_secs(backoff_secs));
            warn!(upstream = %self.upstream, count, backoff_secs, "upstream sustaining rate limits, backing off");
        }
    }

    /// Record a successful call, clearing back-off state.
    pub fn note_success(&self) {
        self.consecutive_429s.store(0, Ordering::SeqCst);
        *self.backing_off_until.lock() = None;
    }

    pub fn current_count(&self) -> u32 {
        self.cleanup();
        self.timestamps.lock().len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_calls_under_capacity() {
        let limiter = RateLimiter::new("chain-rpc", 10);
        for _ in 0..5 {
            limiter.wait_for_capacity(None).await.unwrap();
        }
        assert_eq!(limiter.current_count(), 5);
    }

    #[tokio::test]
    async fn deadline_exceeded_when_saturated() {
        let limiter = RateLimiter::new("chain-rpc", 1);
        limiter.wait_for_capacity(None).await.unwrap();
        let deadline = Instant::now() + Duration::from_millis(30);
        let err = limiter.wait_for_capacity(Some(deadline)).await.unwrap_err();
        assert!(matches!(err, ResilienceError::DeadlineExceeded { .. }));
    }

    #[test]
    fn backs_off_after_three_consecutive_rate_limits() {
        let limiter = RateLimiter::new("indexer", 100);
        assert!(!limiter.is_backing_off());
        limiter.note_rate_limited();
        limiter.note_rate_limited();
        assert!(!limiter.is_backing_off());
        limiter.note_rate_limited();
        assert!(limiter.is_backing_off());
    }

    #[test]
    fn success_clears_backoff() {
        let limiter = RateLimiter::new("indexer", 100);
        limiter.note_rate_limited();
        limiter.note_rate_limited();
        limiter.note_rate_limited();
        assert!(limiter.is_backing_off());
        limiter.note_success();
        assert!(!limiter.is_backing_off());
    }
}
