//! Composite alert scoring, classification, and idempotent persistence
//! (§4.K).

pub mod config;
pub mod error;
pub mod notifier;
pub mod persister;
pub mod scorer;

pub use config::AlertConfig;
pub use error::{AlertError, Result};
pub use notifier::{truncate_address, AlertNotification, Notifier};
pub use persister::{AlertOutcome, AlertProcessor, MarketContext};
pub use scorer::score;
