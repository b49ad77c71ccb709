//! Redis-backed [`SharedStateStore`] for circuit breaker state (§4.B),
//! letting breaker state in one process instance be observed by another.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sentinel_resilience::circuit_breaker::{PersistedState, SharedStateStore};
use tracing::warn;

fn full_key(upstream: &str) -> String {
    format!("sentinel:breaker:{upstream}")
}

pub struct RedisBreakerStore {
    conn: ConnectionManager,
}

impl RedisBreakerStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SharedStateStore for RedisBreakerStore {
    async fn load(&self, upstream: &str) -> Option<PersistedState> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(full_key(upstream)).await.ok()?;
        match raw {
            Some(s) => match serde_json::from_str(&s) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!(upstream, error = %e, "failed to deserialize breaker state");
                    None
                }
            },
            None => None,
        }
    }

    async fn store(&self, upstream: &str, state: &PersistedState) {
        let mut conn = self.conn.clone();
        let Ok(serialized) = serde_json::to_string(state) else {
            return;
        };
        // Breaker state outlives a single monitoring period so other
        // instances can still observe an open circuit after a restart.
        let result: redis::RedisResult<()> = conn.set_ex(full_key(upstream), serialized, 3600).await;
        if let Err(e) = result {
            warn!(upstream, error = %e, "failed to persist breaker state to redis");
        }
    }
}
