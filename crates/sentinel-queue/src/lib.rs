//! Bounded trade queue with backpressure and a dead-letter queue (§4.H).
//!
//! `submit` never blocks the producer: at capacity it drops the trade with
//! a warning and a counter increment. A single [`TradeConsumer`], handed
//! out once, drains the queue in submit order; terminal per-trade failures
//! are routed to the [`DeadLetterQueue`] rather than lost silently.

pub mod dlq;
pub mod error;
pub mod queue;

pub use dlq::{DeadLetterEntry, DeadLetterQueue};
pub use error::{QueueError, Result};
pub use queue::{TradeConsumer, TradeQueue, DEFAULT_DRAIN_TIMEOUT};
