//! Prometheus metrics for the surveillance pipeline.
//!
//! Covers the observable surface named across §4: WebSocket connection
//! state, circuit breaker/rate limiter state per upstream, queue depth and
//! dead-letter depth, detector gate outcomes, wallet-forensics confidence,
//! and alert classification counts.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally: registration only
//! fails on a duplicate metric name, a fatal configuration error that
//! should crash at startup rather than fail silently. These panics occur
//! only during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_gauge,
    register_int_gauge_vec, CounterVec, GaugeVec, HistogramVec, IntGauge, IntGaugeVec,
};

/// WebSocket connection state machine (1 = active state, 0 = inactive).
/// Labels: state (disconnected/connecting/open/subscribed/reconnecting/failed)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "sentinel_ws_state",
        "Market-feed WebSocket state machine current state",
        &["state"]
    )
    .unwrap()
});

/// Total WebSocket reconnection attempts.
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sentinel_ws_reconnect_total",
        "Total market-feed WebSocket reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Current count of subscribed token ids.
pub static WS_SUBSCRIBED_TOKENS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "sentinel_ws_subscribed_tokens",
        "Current number of subscribed token ids"
    )
    .unwrap()
});

/// Circuit breaker state per upstream (1=open, 0.5=half-open, 0=closed).
pub static CIRCUIT_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "sentinel_circuit_state",
        "Circuit breaker state per upstream (1=open, 0.5=half-open, 0=closed)",
        &["upstream"]
    )
    .unwrap()
});

/// Rate limiter back-off signal per upstream (1=backing off).
pub static RATE_LIMITER_BACKOFF: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "sentinel_rate_limiter_backoff",
        "Rate limiter back-off signal per upstream",
        &["upstream"]
    )
    .unwrap()
});

/// Upstream call latency in milliseconds.
pub static UPSTREAM_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "sentinel_upstream_latency_ms",
        "Upstream call latency in milliseconds",
        &["upstream", "operation"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap()
});

/// Total upstream call failures.
pub static UPSTREAM_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sentinel_upstream_errors_total",
        "Total upstream call failures",
        &["upstream", "kind"]
    )
    .unwrap()
});

/// Current trade queue depth.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("sentinel_queue_depth", "Current trade queue depth").unwrap()
});

/// Current dead-letter queue depth.
pub static DLQ_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("sentinel_dlq_depth", "Current dead-letter queue depth").unwrap()
});

/// Total trades dropped at the queue because it was at capacity.
pub static QUEUE_DROPPED_TOTAL: Lazy<prometheus::IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!(
        "sentinel_queue_dropped_total",
        "Total trades dropped because the queue was at capacity"
    )
    .unwrap()
});

/// Funnel counters (§4.I, §4.K): one counter per named decision-point
/// outcome (`trades_analyzed`, `filtered_no_market_data`,
/// `filtered_oi_threshold`, `passed_oi_filter`, per-classification alert
/// counts, ...). Labeled by counter name rather than one static per name so
/// new funnel stages don't require a code change here.
pub static FUNNEL_COUNTER: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "sentinel_funnel_counter",
        "Named funnel counter value, snapshot-style (see StatsRegistry)",
        &["name"]
    )
    .unwrap()
});

/// Wallet-forensics confidence score distribution.
pub static WALLET_CONFIDENCE_SCORE: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "sentinel_wallet_confidence_score",
        "Calibrated wallet confidence score (0-100)",
        &["path"],
        vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 75.0, 80.0, 90.0, 100.0]
    )
    .unwrap()
});

/// Total alerts by classification.
pub static ALERTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sentinel_alerts_total",
        "Total alerts emitted by classification",
        &["classification"]
    )
    .unwrap()
});

/// Composite alert score distribution.
pub static ALERT_SCORE: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "sentinel_alert_score",
        "Composite alert score (0-100)",
        &["classification"],
        vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 65.0, 70.0, 80.0, 85.0, 90.0, 100.0]
    )
    .unwrap()
});

/// End-to-end pipeline latency from ingest to alert decision, milliseconds.
pub static PIPELINE_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "sentinel_pipeline_latency_ms",
        "Latency from trade ingest to alert decision in milliseconds",
        &["stage"],
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Distributed lock acquire outcomes.
pub static LOCK_ACQUIRE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sentinel_lock_acquire_total",
        "Distributed lock acquire attempts by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Metrics facade for easy access from call sites.
pub struct Metrics;

impl Metrics {
    const WS_STATES: [&'static str; 6] = [
        "disconnected",
        "connecting",
        "open",
        "subscribed",
        "reconnecting",
        "failed",
    ];

    /// Set WebSocket state machine state; only the active state reads 1.
    pub fn ws_state_set(state: &str) {
        for s in Self::WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn ws_subscribed_tokens(count: i64) {
        WS_SUBSCRIBED_TOKENS.set(count);
    }

    /// Circuit breaker state: 0.0 closed, 0.5 half-open, 1.0 open.
    pub fn circuit_state(upstream: &str, state: f64) {
        CIRCUIT_STATE.with_label_values(&[upstream]).set(state);
    }

    pub fn rate_limiter_backoff(upstream: &str, backing_off: bool) {
        RATE_LIMITER_BACKOFF
            .with_label_values(&[upstream])
            .set(if backing_off { 1.0 } else { 0.0 });
    }

    pub fn upstream_latency(upstream: &str, operation: &str, latency_ms: f64) {
        UPSTREAM_LATENCY_MS
            .with_label_values(&[upstream, operation])
            .observe(latency_ms);
    }

    pub fn upstream_error(upstream: &str, kind: &str) {
        UPSTREAM_ERRORS_TOTAL
            .with_label_values(&[upstream, kind])
            .inc();
    }

    pub fn queue_depth(depth: i64) {
        QUEUE_DEPTH.set(depth);
    }

    pub fn dlq_depth(depth: i64) {
        DLQ_DEPTH.set(depth);
    }

    pub fn queue_dropped() {
        QUEUE_DROPPED_TOTAL.inc();
    }

    pub fn funnel_counter_set(name: &str, value: i64) {
        FUNNEL_COUNTER.with_label_values(&[name]).set(value);
    }

    pub fn wallet_confidence(path: &str, score: i32) {
        WALLET_CONFIDENCE_SCORE
            .with_label_values(&[path])
            .observe(score as f64);
    }

    pub fn alert_emitted(classification: &str, score: i32) {
        ALERTS_TOTAL.with_label_values(&[classification]).inc();
        ALERT_SCORE
            .with_label_values(&[classification])
            .observe(score as f64);
    }

    pub fn pipeline_latency(stage: &str, latency_ms: f64) {
        PIPELINE_LATENCY_MS
            .with_label_values(&[stage])
            .observe(latency_ms);
    }

    pub fn lock_acquired() {
        LOCK_ACQUIRE_TOTAL.with_label_values(&["acquired"]).inc();
    }

    pub fn lock_timed_out() {
        LOCK_ACQUIRE_TOTAL.with_label_values(&["timed_out"]).inc();
    }
}
