//! Funnel counter registry and periodic summary reporting.
//!
//! §9 calls for an injected counter interface so the detector and alert
//! pipeline can record funnel outcomes (`trades_analyzed`,
//! `filtered_oi_threshold`, `passed_oi_filter`, per-classification alert
//! counts, ...) without depending on the telemetry crate's types directly,
//! breaking the reference cycle that would otherwise exist between the
//! stats layer and the decision framework it instruments. `StatsRegistry`
//! is the concrete implementation of that interface: a cache of named
//! counters, readable by an operator as a point-in-time snapshot.

use crate::metrics::Metrics;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Narrow trait the decision framework depends on; `StatsRegistry`
/// implements it but callers only need to name the counter.
pub trait CounterSink: Send + Sync {
    fn incr(&self, name: &str, delta: i64);
    fn set(&self, name: &str, value: i64);
}

/// Cache of named funnel counters, snapshot-readable for an operator view.
#[derive(Clone)]
pub struct StatsRegistry {
    counters: Arc<DashMap<String, AtomicI64>>,
    start_time: DateTime<Utc>,
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(DashMap::new()),
            start_time: Utc::now(),
        }
    }

    pub fn incr(&self, name: &str, delta: i64) {
        self.counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(delta, Ordering::Relaxed);
        Metrics::funnel_counter_set(name, self.get(name));
    }

    pub fn set(&self, name: &str, value: i64) {
        self.counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicI64::new(0))
            .store(value, Ordering::Relaxed);
        Metrics::funnel_counter_set(name, value);
    }

    pub fn get(&self, name: &str) -> i64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Point-in-time snapshot of every counter touched so far.
    pub fn snapshot(&self) -> HashMap<String, i64> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect()
    }

    /// Log a human-readable summary of the funnel since start.
    pub fn log_summary(&self) {
        let duration = Utc::now() - self.start_time;
        let hours = duration.num_hours();
        let minutes = duration.num_minutes() % 60;

        info!("========== Funnel Counter Summary ==========");
        info!(
            "Period: {} ({} hours {} minutes)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            hours,
            minutes
        );

        let mut snapshot: Vec<(String, i64)> = self.snapshot().into_iter().collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, value) in snapshot {
            info!("  {name}: {value}");
        }
        info!("=============================================");
    }
}

impl CounterSink for StatsRegistry {
    fn incr(&self, name: &str, delta: i64) {
        StatsRegistry::incr(self, name, delta);
    }

    fn set(&self, name: &str, value: i64) {
        StatsRegistry::set(self, name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incr_accumulates_per_name() {
        let reg = StatsRegistry::new();
        reg.incr("trades_analyzed", 1);
        reg.incr("trades_analyzed", 1);
        reg.incr("filtered_oi_threshold", 1);
        assert_eq!(reg.get("trades_analyzed"), 2);
        assert_eq!(reg.get("filtered_oi_threshold"), 1);
        assert_eq!(reg.get("never_touched"), 0);
    }

    #[test]
    fn set_overwrites() {
        let reg = StatsRegistry::new();
        reg.incr("queue_depth", 5);
        reg.set("queue_depth", 0);
        assert_eq!(reg.get("queue_depth"), 0);
    }

    #[test]
    fn snapshot_reflects_all_touched_counters() {
        let reg = StatsRegistry::new();
        reg.incr("a", 1);
        reg.incr("b", 2);
        let snap = reg.snapshot();
        assert_eq!(snap.get("a"), Some(&1));
        assert_eq!(snap.get("b"), Some(&2));
    }

    #[test]
    fn counter_sink_trait_object_delegates() {
        let reg = StatsRegistry::new();
        let sink: &dyn CounterSink = &reg;
        sink.incr("via_trait", 3);
        assert_eq!(reg.get("via_trait"), 3);
    }
}
