//! Dead-letter queue: holds trades that failed processing terminally after
//! in-component retries (§4.H). Depth is observable for operator visibility.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sentinel_core::Trade;
use sentinel_telemetry::Metrics;
use std::collections::VecDeque;
use tracing::warn;

/// One dead-lettered trade plus the reason it was terminal.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub trade: Trade,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Bounded FIFO of dead-lettered trades. Oldest entries are evicted once
/// `max_len` is reached so the DLQ itself cannot become an unbounded leak.
pub struct DeadLetterQueue {
    entries: Mutex<VecDeque<DeadLetterEntry>>,
    max_len: usize,
}

impl DeadLetterQueue {
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_len,
        }
    }

    pub fn push(&self, trade: Trade, reason: impl Into<String>) {
        let reason = reason.into();
        let mut entries = self.entries.lock();
        if entries.len() >= self.max_len {
            entries.pop_front();
        }
        warn!(trade_id = %trade.id, reason = %reason, "trade dead-lettered");
        entries.push_back(DeadLetterEntry {
            trade,
            reason,
            failed_at: Utc::now(),
        });
        Metrics::dlq_depth(entries.len() as i64);
    }

    pub fn depth(&self) -> usize {
        self.entries.lock().len()
    }

    /// Drain and return every entry, for operator inspection or reprocessing.
    pub fn drain_all(&self) -> Vec<DeadLetterEntry> {
        let mut entries = self.entries.lock();
        let drained = entries.drain(..).collect();
        Metrics::dlq_depth(0);
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sentinel_core::{Address, MarketId, Outcome, Probability, Side, TokenAmount, TradeSource};

    fn sample_trade(id: &str) -> Trade {
        Trade::new(
            id.into(),
            MarketId("m1".into()),
            Side::Buy,
            Outcome::Yes,
            TokenAmount::new(dec!(100)),
            Probability::new(dec!(0.5)),
            Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
            None,
            0,
            TradeSource::Pull,
            None,
        )
        .unwrap()
    }

    #[test]
    fn push_and_depth() {
        let dlq = DeadLetterQueue::new(10);
        dlq.push(sample_trade("t1"), "forensics retries exhausted");
        assert_eq!(dlq.depth(), 1);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let dlq = DeadLetterQueue::new(2);
        dlq.push(sample_trade("t1"), "r1");
        dlq.push(sample_trade("t2"), "r2");
        dlq.push(sample_trade("t3"), "r3");
        let all = dlq.drain_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].trade.id, "t2");
        assert_eq!(all[1].trade.id, "t3");
    }

    #[test]
    fn drain_all_empties_and_returns_entries() {
        let dlq = DeadLetterQueue::new(10);
        dlq.push(sample_trade("t1"), "r1");
        let drained = dlq.drain_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(dlq.depth(), 0);
    }
}
