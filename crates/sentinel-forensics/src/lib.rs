//! Multi-source wallet fingerprinting and confidence calibration (§4.J).
//!
//! Indexer-first, falling back to an on-chain path when the indexer has no
//! data for an address. Both paths compute the same [`WalletFlags`] shape
//! from path-specific raw signals, and a confidence envelope calibrates
//! how much to trust the result.

pub mod confidence;
pub mod config;
pub mod error;
pub mod flags;
pub mod forensics;
pub mod onchain;
pub mod proxy;

pub use config::ForensicsConfig;
pub use confidence::{calibrate, ConfidenceInputs, SourceAgreement};
pub use error::{ForensicsError, Result};
pub use flags::{compute_indexer_flags, compute_onchain_flags, IndexerMetrics, OnChainMetrics};
pub use forensics::WalletForensics;
pub use onchain::{gather_onchain_signals, OnChainSignals};
pub use sentinel_core::WalletFlags;
