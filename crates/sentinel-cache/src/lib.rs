//! Redis-backed distributed lock and dedup store (§4.C, §4.D).

pub mod breaker_store;
pub mod dedup;
pub mod error;
pub mod fingerprint_cache;
pub mod lock;

pub use breaker_store::RedisBreakerStore;
pub use dedup::DedupStore;
pub use error::{CacheError, Result};
pub use fingerprint_cache::{FingerprintCache, FingerprintStore};
pub use lock::{DistributedLock, LockHandle};
