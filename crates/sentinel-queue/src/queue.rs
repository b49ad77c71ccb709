//! Bounded trade queue: FIFO with backpressure, never blocks the producer
//! (§4.H). A single consumer is handed out once via [`TradeQueue::take_consumer`];
//! this is how the crate enforces §5's "single consumer processes items
//! sequentially" at the type level rather than by convention.

use crate::dlq::DeadLetterQueue;
use crate::error::{QueueError, Result};
use parking_lot::Mutex;
use sentinel_core::Trade;
use sentinel_telemetry::{CounterSink, Metrics};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};

/// Queue depth at or above this fraction of capacity is "under pressure"
/// (§4.H): the pull poller uses this to skip a cycle.
const PRESSURE_RATIO: f64 = 0.8;

/// Default drain timeout on graceful shutdown (§4.H, §5).
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded trade queue. `submit` is non-blocking: at capacity, the trade is
/// dropped with a warning and a counter increment, never backing up the
/// producer (§8 property 6).
pub struct TradeQueue {
    sender: mpsc::Sender<Trade>,
    receiver: Mutex<Option<mpsc::Receiver<Trade>>>,
    capacity: usize,
    dlq: Arc<DeadLetterQueue>,
    stats: Arc<dyn CounterSink>,
}

impl TradeQueue {
    pub fn new(capacity: usize, stats: Arc<dyn CounterSink>) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            capacity,
            dlq: Arc::new(DeadLetterQueue::new(capacity.max(1))),
            stats,
        }
    }

    /// Current in-flight depth. Derived from the bounded channel's
    /// remaining-permit count rather than a separately maintained counter,
    /// so it can never drift from what the channel itself will actually
    /// accept.
    pub fn depth(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` once depth reaches 80% of capacity (§4.H); the pull poller
    /// treats this as a skip-this-cycle signal.
    pub fn is_under_pressure(&self) -> bool {
        self.depth() as f64 / self.capacity.max(1) as f64 >= PRESSURE_RATIO
    }

    pub fn dead_letter_queue(&self) -> Arc<DeadLetterQueue> {
        self.dlq.clone()
    }

    /// Submit a trade. Never blocks: at capacity, the trade is dropped and
    /// counted rather than applying backpressure to the caller.
    pub fn submit(&self, trade: Trade) -> bool {
        match self.sender.try_send(trade) {
            Ok(()) => {
                Metrics::queue_depth(self.depth() as i64);
                true
            }
            Err(_) => {
                warn!("trade queue at capacity, dropping submission");
                self.stats.incr("queue_dropped_total", 1);
                Metrics::queue_dropped();
                false
            }
        }
    }

    /// Hand out the single consumer. Returns an error if already taken:
    /// §5 requires exactly one task driving the queue.
    pub fn take_consumer(self: &Arc<Self>) -> Result<TradeConsumer> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(QueueError::ConsumerAlreadyTaken)?;
        Ok(TradeConsumer {
            receiver,
            queue: self.clone(),
        })
    }

    /// Poll depth until it reaches zero or `timeout` elapses (§4.H's
    /// graceful-drain contract). Returns `true` if fully drained.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.depth() == 0 {
                info!("trade queue fully drained");
                return true;
            }
            if Instant::now() >= deadline {
                warn!(depth = self.depth(), dlq_depth = self.dlq.depth(), "drain timed out with items remaining");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// The single handle permitted to pull trades off the queue.
pub struct TradeConsumer {
    receiver: mpsc::Receiver<Trade>,
    queue: Arc<TradeQueue>,
}

impl TradeConsumer {
    /// Receive the next trade in submit order, or `None` once every sender
    /// has been dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Trade> {
        let trade = self.receiver.recv().await;
        Metrics::queue_depth(self.queue.depth() as i64);
        trade
    }

    /// Route a terminally-failed trade to the dead-letter queue.
    pub fn dead_letter(&self, trade: Trade, reason: impl Into<String>) {
        self.queue.dlq.push(trade, reason);
    }
}
