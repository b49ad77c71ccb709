//! Push subscription and pull polling ingestion, shared normalization, and
//! cross-source dedup (§4.G).

pub mod config;
pub mod error;
pub mod feed_sink;
pub mod normalize;
pub mod poll;
pub mod push;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use feed_sink::FeedSubscriptionSink;
pub use normalize::{
    normalize_and_submit, normalize_timestamp_ms, MarketLookup, NormalizeContext, NormalizeInput,
    NormalizeOutcome,
};
pub use poll::PullPoller;
pub use push::PushSubscriber;
