//! Redis-backed distributed mutex with fencing tokens (§4.C).

use crate::error::{CacheError, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const REFRESH_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

fn full_key(key: &str) -> String {
    format!("sentinel:lock:{key}")
}

/// Keyed mutex backed by Redis `SET NX PX`.
pub struct DistributedLock {
    conn: ConnectionManager,
}

impl DistributedLock {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Attempt atomic set-if-absent with a random fencing token; retries at
    /// `retry_delay` until success or `max_retries` attempts are exhausted.
    pub async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<LockHandle> {
        let full = full_key(key);
        let token = Uuid::new_v4().to_string();
        let mut conn = self.conn.clone();

        let mut attempt = 0;
        loop {
            let acquired: bool = redis::cmd("SET")
                .arg(&full)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(ttl.as_millis() as u64)
                .query_async(&mut conn)
                .await?;

            if acquired {
                debug!(key, token = %token, "acquired distributed lock");
                return Ok(LockHandle {
                    key: full,
                    token,
                    conn: self.conn.clone(),
                    refresh_task: None,
                });
            }

            attempt += 1;
            if attempt > max_retries {
                let holder: Option<String> = conn.get(&full).await.ok();
                return Err(CacheError::AcquireTimeout {
                    key: key.to_string(),
                    holder,
                });
            }
            tokio::time::sleep(retry_delay).await;
        }
    }
}

/// A held lock. Auto-refresh, if started, extends TTL for as long as this
/// holder still owns the token; a stale holder's refresh is a silent no-op.
pub struct LockHandle {
    key: String,
    token: String,
    conn: ConnectionManager,
    refresh_task: Option<JoinHandle<()>>,
}

impl LockHandle {
    /// Start a background task extending TTL every `refresh_interval`
    /// (must be `< ttl`) as long as this handle still owns the lock.
    pub fn start_auto_refresh(&mut self, ttl: Duration, refresh_interval: Duration) {
        let key = self.key.clone();
        let token = self.token.clone();
        let mut conn = self.conn.clone();
        let ttl_ms = ttl.as_millis() as u64;

        let handle = tokio::spawn(async move {
            let script = Script::new(REFRESH_SCRIPT);
            loop {
                tokio::time::sleep(refresh_interval).await;
                let refreshed: i64 = match script
                    .key(&key)
                    .arg(&token)
                    .arg(ttl_ms)
                    .invoke_async(&mut conn)
                    .await
                {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(key, error = %e, "lock auto-refresh failed");
                        continue;
                    }
                };
                if refreshed == 0 {
                    warn!(key, "auto-refresh found lock no longer owned, stopping");
                    break;
                }
            }
        });
        self.refresh_task = Some(handle);
    }

    /// Release via compare-and-delete; a holder whose TTL already expired
    /// simply finds the script return 0 and logs instead of erroring.
    pub async fn release(mut self) -> Result<()> {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
        let mut conn = self.conn.clone();
        let script = Script::new(RELEASE_SCRIPT);
        let deleted: i64 = script.key(&self.key).arg(&self.token).invoke_async(&mut conn).await?;
        if deleted == 0 {
            debug!(key = %self.key, "release no-op: lock already expired or reassigned");
        }
        Ok(())
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_key_is_namespaced() {
        assert_eq!(full_key("market:m1"), "sentinel:lock:market:m1");
    }
}
