//! Core domain types for the insider-trading surveillance pipeline.
//!
//! This crate provides the fundamental, dependency-free types shared by
//! every other crate in the workspace:
//! - `Address`, `TxHash`: normalized on-chain identity
//! - `Probability`, `TokenAmount`, `Usd`: precision-safe decimal newtypes
//! - `Market`, `Trade`: venue and fill data
//! - `Signal`, `DormancyMetrics`: detector outputs
//! - `WalletFingerprint`: forensic profile
//! - `Alert`: the terminal, persisted artifact

pub mod address;
pub mod alert;
pub mod decimal;
pub mod error;
pub mod market;
pub mod signal;
pub mod trade;
pub mod wallet;

pub use address::{Address, TxHash};
pub use alert::{Alert, Classification, ScoreBreakdown};
pub use decimal::{Probability, TokenAmount, Usd};
pub use error::{CoreError, Result};
pub use market::{ConditionId, Market, MarketId, Tier, TokenId};
pub use signal::{AbsoluteTier, DormancyMetrics, GateReason, ImpactMethod, Signal};
pub use trade::{Outcome, Side, Trade, TradeSource};
pub use wallet::{
    ConfidenceEnvelope, ConfidenceLevel, ForensicsPath, WalletFingerprint, WalletFlags,
};
