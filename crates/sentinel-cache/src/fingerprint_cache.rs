//! Wallet-fingerprint cache: Redis-backed JSON cache with an explicit TTL
//! per keyspace (§4.J). Two independent keyspaces exist side by side —
//! indexer-derived and on-chain-derived fingerprints — so a hit on one
//! path never masks a miss on the other.
//!
//! [`FingerprintStore`] is the narrow seam: forensics depends on the trait,
//! never on [`FingerprintCache`] directly, so its decision logic can be
//! unit tested against an in-memory fake instead of live Redis — the same
//! shape as [`sentinel_resilience::circuit_breaker::SharedStateStore`].

use crate::error::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::warn;

fn full_key(keyspace: &str, identity: &str) -> String {
    format!("sentinel:fingerprint:{keyspace}:{identity}")
}

/// Raw JSON get/set over one fingerprint keyspace. Object-safe so callers
/// can hold `Arc<dyn FingerprintStore>`; (de)serialization of the actual
/// fingerprint type happens on the caller's side.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn get_raw(&self, identity: &str) -> Option<String>;
    async fn set_raw(&self, identity: &str, payload: String) -> Result<()>;
}

/// Redis-backed [`FingerprintStore`], parameterized by a fixed keyspace
/// prefix so the indexer-path and on-chain-path caches can share this
/// implementation with distinct TTLs and key namespaces.
pub struct FingerprintCache {
    conn: ConnectionManager,
    keyspace: &'static str,
    ttl: Duration,
}

impl FingerprintCache {
    pub fn new(conn: ConnectionManager, keyspace: &'static str, ttl: Duration) -> Self {
        Self { conn, keyspace, ttl }
    }
}

#[async_trait]
impl FingerprintStore for FingerprintCache {
    /// A Redis error is logged and treated as a miss rather than
    /// propagated: a cache-read failure degrades to a live recompute, it
    /// never fails the request (§4.J, §7 DependencyUnavailable is
    /// contained, not fatal).
    async fn get_raw(&self, identity: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get(full_key(self.keyspace, identity)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, keyspace = self.keyspace, "fingerprint cache read failed");
                None
            }
        }
    }

    /// Write with this cache's configured TTL. Failures are logged, not
    /// propagated: a write miss only means the next lookup recomputes.
    async fn set_raw(&self, identity: &str, payload: String) -> Result<()> {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = conn
            .set_ex(full_key(self.keyspace, identity), payload, self.ttl.as_secs().max(1))
            .await;
        if let Err(e) = result {
            warn!(error = %e, keyspace = self.keyspace, "fingerprint cache write failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::full_key;

    #[test]
    fn key_is_namespaced_by_keyspace() {
        assert_eq!(
            full_key("indexer", "0xabc"),
            "sentinel:fingerprint:indexer:0xabc"
        );
        assert_ne!(full_key("indexer", "0xabc"), full_key("onchain", "0xabc"));
    }
}
