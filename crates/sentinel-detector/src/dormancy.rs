//! Market-dormancy analysis (§4.I, §3).
//!
//! A market is dormant if, scanning back far enough to find them, neither
//! a qualifying large trade nor a qualifying price move falls inside its
//! respective lookback window.

use crate::config::DetectorConfig;
use crate::sources::TradeHistorySource;
use chrono::{DateTime, Duration, Utc};
use sentinel_core::{DormancyMetrics, MarketId, Usd};

/// How far back trade history is pulled to locate the most recent
/// qualifying event, independent of the dormancy window thresholds
/// themselves. Generous enough that "no qualifying event in the last N
/// days" is effectively equivalent to "none exists".
const HISTORY_LOOKBACK_DAYS: i64 = 30;

pub async fn compute_dormancy(
    history: &dyn TradeHistorySource,
    market_id: &MarketId,
    config: &DetectorConfig,
    reference_time: DateTime<Utc>,
) -> DormancyMetrics {
    let since = reference_time - Duration::days(HISTORY_LOOKBACK_DAYS);
    let mut trades = history.trades_since(market_id, since).await;
    trades.sort_by_key(|t| t.timestamp_ms);

    let hours_since_large_trade = trades
        .iter()
        .rev()
        .find(|t| t.usd_value() >= Usd::new(config.dormant_large_trade_threshold))
        .map(|t| hours_since(reference_time, t.timestamp_ms));

    let hours_since_price_move = trades
        .windows(2)
        .filter_map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            let prev_price = prev.price.inner();
            if prev_price.is_zero() {
                return None;
            }
            let pct_change = ((curr.price.inner() - prev_price) / prev_price).abs();
            (pct_change >= config.dormant_price_move_threshold).then_some(curr)
        })
        .next_back()
        .map(|t| hours_since(reference_time, t.timestamp_ms));

    DormancyMetrics::compute(
        hours_since_large_trade,
        hours_since_price_move,
        config.dormant_hours_no_large_trades,
        config.dormant_hours_no_price_moves,
    )
}

fn hours_since(reference_time: DateTime<Utc>, timestamp_ms: i64) -> f64 {
    let trade_time = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or(reference_time);
    (reference_time - trade_time).num_seconds() as f64 / 3600.0
}
