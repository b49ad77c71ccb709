//! Relational row shapes and upsert access for the surveillance pipeline.
//!
//! The durable store itself (schema migrations, connection pooling policy,
//! backup) is an external collaborator per the system's scope; this crate
//! owns only the row shapes in §6 and the upsert/read access patterns each
//! component needs (markets, trades, wallets, alerts).

pub mod alerts;
pub mod error;
pub mod markets;
pub mod trades;
pub mod wallets;

pub use alerts::{alert_exists_for_trade, upsert_alert, AlertRow};
pub use error::{PersistenceError, PersistenceResult};
pub use markets::{
    disable_market, load_all_markets, update_market_liquidity, upsert_market, MarketRow,
};
pub use trades::{recent_trades_for_market, upsert_trade, TradeRow};
pub use wallets::{load_wallet, upsert_wallet, WalletRow};

use sqlx::PgPool;

/// Thin handle over the connection pool, passed to collaborators rather
/// than reached for as a global (§9's singleton-components note).
#[derive(Clone)]
pub struct PersistenceStore {
    pool: PgPool,
}

impl PersistenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
