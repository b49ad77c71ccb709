//! Trade identity and normalized representation.

use crate::address::{Address, TxHash};
use crate::decimal::{Probability, TokenAmount, Usd};
use crate::error::CoreError;
use crate::market::MarketId;
use serde::{Deserialize, Serialize};

/// Which side of the book the taker hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// Which outcome token the trade was denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
}

/// Where a trade was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSource {
    Push,
    Pull,
}

/// A normalized, canonical-unit trade ready for queueing.
///
/// Invariants (enforced by [`Trade::new`], never re-checked downstream):
/// `0 <= price <= 1`, `size > 0`, addresses are 20-byte lowercase hex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Source-namespaced id, e.g. `"push:0xabc...:42"`.
    pub id: String,
    pub market_id: MarketId,
    pub side: Side,
    pub outcome: Outcome,
    pub size: TokenAmount,
    pub price: Probability,
    pub taker: Address,
    pub maker: Option<Address>,
    pub timestamp_ms: i64,
    pub source: TradeSource,
    pub tx_hash: Option<TxHash>,
}

impl Trade {
    /// Construct a trade, enforcing the invariants from §3.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        market_id: MarketId,
        side: Side,
        outcome: Outcome,
        size: TokenAmount,
        price: Probability,
        taker: Address,
        maker: Option<Address>,
        timestamp_ms: i64,
        source: TradeSource,
        tx_hash: Option<TxHash>,
    ) -> Result<Self, CoreError> {
        if !price.is_valid() {
            return Err(CoreError::InvalidPrice(format!(
                "price {} out of [0,1]",
                price.inner()
            )));
        }
        if !size.is_positive() {
            return Err(CoreError::InvalidSize(format!(
                "size {} must be positive",
                size.inner()
            )));
        }
        Ok(Self {
            id,
            market_id,
            side,
            outcome,
            size,
            price,
            taker,
            maker,
            timestamp_ms,
            source,
            tx_hash,
        })
    }

    /// USD notional of the fill: `size * price`.
    pub fn usd_value(&self) -> Usd {
        self.size.notional(self.price)
    }

    /// Stable dedup key: tx hash if present, else `timestamp|address` (§4.G).
    pub fn dedup_key(&self) -> String {
        match &self.tx_hash {
            Some(h) => h.to_string(),
            None => format!("{}|{}", self.timestamp_ms, self.taker),
        }
    }
}
