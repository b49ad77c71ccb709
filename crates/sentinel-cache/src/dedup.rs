//! Processed-trade-id tombstone set: Redis primary, bounded in-memory
//! fallback (§4.D). The fallback may admit duplicates across process
//! restarts; downstream writes must tolerate that (upserts, not inserts).

use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::warn;

const MAX_FALLBACK: usize = 100_000;

fn full_key(key: &str) -> String {
    format!("sentinel:dedup:{key}")
}

struct Fallback {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl Fallback {
    fn new() -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    fn insert(&mut self, key: &str) {
        if self.members.contains(key) {
            return;
        }
        if self.order.len() >= MAX_FALLBACK {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.order.push_back(key.to_string());
        self.members.insert(key.to_string());
    }
}

/// Set with TTL-per-member, degrading gracefully when Redis is unreachable.
pub struct DedupStore {
    conn: Option<ConnectionManager>,
    fallback: Mutex<Fallback>,
}

impl DedupStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn: Some(conn),
            fallback: Mutex::new(Fallback::new()),
        }
    }

    /// For tests and degraded-mode construction: no Redis connection at all.
    pub fn fallback_only() -> Self {
        Self {
            conn: None,
            fallback: Mutex::new(Fallback::new()),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        if let Some(conn) = &self.conn {
            let mut conn = conn.clone();
            match conn.exists::<_, bool>(full_key(key)).await {
                Ok(exists) => return exists,
                Err(e) => {
                    warn!(error = %e, "dedup store redis unavailable, consulting fallback");
                }
            }
        }
        self.fallback.lock().contains(key)
    }

    pub async fn mark(&self, key: &str, ttl: Duration) {
        if let Some(conn) = &self.conn {
            let mut conn = conn.clone();
            let result: redis::RedisResult<()> = conn
                .set_ex(full_key(key), 1u8, ttl.as_secs().max(1))
                .await;
            if let Err(e) = result {
                warn!(error = %e, "dedup store redis unavailable, marking in fallback");
                self.fallback.lock().insert(key);
            }
            return;
        }
        self.fallback.lock().insert(key);
    }
}
