//! Per-upstream circuit breaker: closed/open/half-open (§4.B).

use crate::error::{ResilienceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Backing store for breaker state, shared across process instances.
/// Implemented over Redis by `sentinel-cache`; a failing store degrades to
/// the breaker's local last-known snapshot rather than erasing an open
/// circuit.
#[async_trait]
pub trait SharedStateStore: Send + Sync {
    async fn load(&self, upstream: &str) -> Option<PersistedState>;
    async fn store(&self, upstream: &str, state: &PersistedState);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub state: CircuitState,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub half_open_successes: u32,
    pub half_open_in_flight: u32,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            last_failure_time: None,
            half_open_successes: 0,
            half_open_in_flight: 0,
        }
    }
}

pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub monitoring_period: chrono::Duration,
    pub recovery_timeout: chrono::Duration,
    pub half_open_max_attempts: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            monitoring_period: chrono::Duration::seconds(60),
            recovery_timeout: chrono::Duration::seconds(30),
            half_open_max_attempts: 3,
        }
    }
}

struct NoopStore;

#[async_trait]
impl SharedStateStore for NoopStore {
    async fn load(&self, _upstream: &str) -> Option<PersistedState> {
        None
    }
    async fn store(&self, _upstream: &str, _state: &PersistedState) {}
}

/// A single upstream's circuit breaker.
pub struct CircuitBreaker {
    upstream: String,
    config: CircuitBreakerConfig,
    store: Arc<dyn SharedStateStore>,
    failures: Mutex<VecDeque<DateTime<Utc>>>,
    local: Mutex<PersistedState>,
}

impl CircuitBreaker {
    pub fn new(upstream: impl Into<String>, config: CircuitBreakerConfig) -> Arc<Self> {
        Self::with_store(upstream, config, Arc::new(NoopStore))
    }

    pub fn with_store(
        upstream: impl Into<String>,
        config: CircuitBreakerConfig,
        store: Arc<dyn SharedStateStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            upstream: upstream.into(),
            config,
            store,
            failures: Mutex::new(VecDeque::new()),
            local: Mutex::new(PersistedState::default()),
        })
    }

    /// Refresh local state from the shared store, falling back to the last
    /// known local snapshot if the store is unavailable.
    async fn sync(&self) -> PersistedState {
        if let Some(remote) = self.store.load(&self.upstream).await {
            *self.local.lock() = remote.clone();
            remote
        } else {
            self.local.lock().clone()
        }
    }

    async fn persist(&self, state: &PersistedState) {
        *self.local.lock() = state.clone();
        self.store.store(&self.upstream, state).await;
    }

    /// Check admission. Returns an error immediately if the circuit is open
    /// and `recoveryTimeout` has not yet elapsed, transitioning to
    /// half-open at that point.
    pub async fn check(&self) -> Result<()> {
        let mut state = self.sync().await;

        match state.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let last_failure = state.last_failure_time.unwrap_or_else(Utc::now);
                let next_retry_time = last_failure + self.config.recovery_timeout;
                if Utc::now() >= next_retry_time {
                    info!(upstream = %self.upstream, "recovery timeout elapsed, moving to half-open");
                    state.state = CircuitState::HalfOpen;
                    state.half_open_successes = 0;
                    state.half_open_in_flight = 0;
                    self.persist(&state).await;
                    Ok(())
                } else {
                    Err(ResilienceError::CircuitOpen {
                        upstream: self.upstream.clone(),
                        next_retry_time,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if state.half_open_in_flight >= self.config.half_open_max_attempts {
                    let next_retry_time = Utc::now() + self.config.recovery_timeout;
                    return Err(ResilienceError::CircuitOpen {
                        upstream: self.upstream.clone(),
                        next_retry_time,
                    });
                }
                state.half_open_in_flight += 1;
                self.persist(&state).await;
                Ok(())
            }
        }
    }

    /// Record a successful call.
    pub async fn record_success(&self) {
        let mut state = self.sync().await;
        match state.state {
            CircuitState::Closed => {
                self.failures.lock().clear();
            }
            CircuitState::HalfOpen => {
                state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
                state.half_open_successes += 1;
                if state.half_open_successes >= self.config.half_open_max_attempts {
                    info!(upstream = %self.upstream, "half-open probes succeeded, closing circuit");
                    state.state = CircuitState::Closed;
                    state.half_open_successes = 0;
                    state.half_open_in_flight = 0;
                    self.failures.lock().clear();
                }
                self.persist(&state).await;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call.
    pub async fn record_failure(&self) {
        let mut state = self.sync().await;
        let now = Utc::now();

        match state.state {
            CircuitState::HalfOpen => {
                warn!(upstream = %self.upstream, "half-open probe failed, reopening circuit");
                state.state = CircuitState::Open;
                state.last_failure_time = Some(now);
                state.half_open_successes = 0;
                state.half_open_in_flight = 0;
                self.persist(&state).await;
            }
            CircuitState::Closed => {
                let cutoff = now - self.config.monitoring_period;
                let mut failures = self.failures.lock();
                failures.push_back(now);
                while failures.front().is_some_and(|&t| t < cutoff) {
                    failures.pop_front();
                }
                if failures.len() as u32 >= self.config.failure_threshold {
                    error!(upstream = %self.upstream, count = failures.len(), "failure threshold reached, opening circuit");
                    state.state = CircuitState::Open;
                    state.last_failure_time = Some(now);
                    drop(failures);
                    self.persist(&state).await;
                }
            }
            CircuitState::Open => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.sync().await.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct InMemoryStore(StdMutex<Option<PersistedState>>);

    #[async_trait]
    impl SharedStateStore for InMemoryStore {
        async fn load(&self, _upstream: &str) -> Option<PersistedState> {
            self.0.lock().unwrap().clone()
        }
        async fn store(&self, _upstream: &str, state: &PersistedState) {
            *self.0.lock().unwrap() = Some(state.clone());
        }
    }

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            monitoring_period: chrono::Duration::seconds(60),
            recovery_timeout: chrono::Duration::milliseconds(1),
            half_open_max_attempts: 2,
        }
    }

    #[tokio::test]
    async fn opens_after_failure_threshold() {
        let cb = CircuitBreaker::new("indexer", fast_config());
        for _ in 0..3 {
            cb.check().await.unwrap();
            cb.record_failure().await;
        }
        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(matches!(
            cb.check().await.unwrap_err(),
            ResilienceError::CircuitOpen { .. }
        ));
    }

    #[tokio::test]
    async fn transitions_to_half_open_after_recovery_timeout_then_closes() {
        let cb = CircuitBreaker::new("indexer", fast_config());
        for _ in 0..3 {
            cb.check().await.unwrap();
            cb.record_failure().await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        cb.check().await.unwrap();
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
        cb.record_success().await;
        cb.check().await.unwrap();
        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let cb = CircuitBreaker::new("indexer", fast_config());
        for _ in 0..3 {
            cb.check().await.unwrap();
            cb.record_failure().await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        cb.check().await.unwrap();
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn shared_store_survives_new_breaker_instance() {
        let store: Arc<dyn SharedStateStore> = Arc::new(InMemoryStore::default());
        let cb1 = CircuitBreaker::with_store("chain-rpc", fast_config(), store.clone());
        for _ in 0..3 {
            cb1.check().await.unwrap();
            cb1.record_failure().await;
        }
        assert_eq!(cb1.state().await, CircuitState::Open);

        let cb2 = CircuitBreaker::with_store("chain-rpc", fast_config(), store);
        assert_eq!(cb2.state().await, CircuitState::Open);
    }
}
