//! Error types for sentinel-queue.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// `take_consumer` was called a second time; the queue is single-consumer
    /// by design (§4.H, §5).
    #[error("queue consumer already taken")]
    ConsumerAlreadyTaken,
}

pub type Result<T> = std::result::Result<T, QueueError>;
