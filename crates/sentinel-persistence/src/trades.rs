//! Trades table: keyed by id, upserted exactly once per §3's Trade lifecycle.

use crate::error::PersistenceResult;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sentinel_core::{Address, MarketId, Outcome, Probability, Side, TokenAmount, Trade, TradeSource, TxHash};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TradeRow {
    pub id: String,
    pub market_id: String,
    pub side: String,
    pub outcome: String,
    pub size: Decimal,
    pub price: Decimal,
    pub taker: String,
    pub maker: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub tx_hash: Option<String>,
}

impl From<&Trade> for TradeRow {
    fn from(t: &Trade) -> Self {
        Self {
            id: t.id.clone(),
            market_id: t.market_id.0.clone(),
            side: match t.side {
                Side::Buy => "buy".into(),
                Side::Sell => "sell".into(),
            },
            outcome: match t.outcome {
                Outcome::Yes => "yes".into(),
                Outcome::No => "no".into(),
            },
            size: t.size.inner(),
            price: t.price.inner(),
            taker: t.taker.to_string(),
            maker: t.maker.map(|m| m.to_string()),
            timestamp: Utc.timestamp_millis_opt(t.timestamp_ms).single().unwrap_or_else(Utc::now),
            source: match t.source {
                TradeSource::Push => "push".into(),
                TradeSource::Pull => "pull".into(),
            },
            tx_hash: t.tx_hash.as_ref().map(|h| h.to_string()),
        }
    }
}

impl TryFrom<TradeRow> for Trade {
    type Error = sentinel_core::CoreError;

    fn try_from(r: TradeRow) -> Result<Self, Self::Error> {
        Trade::new(
            r.id,
            MarketId(r.market_id),
            if r.side == "buy" { Side::Buy } else { Side::Sell },
            if r.outcome == "yes" { Outcome::Yes } else { Outcome::No },
            TokenAmount::new(r.size),
            Probability::new(r.price),
            Address::parse(&r.taker)?,
            r.maker.map(|m| Address::parse(&m)).transpose()?,
            r.timestamp.timestamp_millis(),
            if r.source == "push" { TradeSource::Push } else { TradeSource::Pull },
            r.tx_hash.map(|h| TxHash::parse(&h)),
        )
    }
}

/// Upsert a trade by id, idempotent across at-least-once delivery (§3, §8:
/// `persistAlert`/submit idempotence laws apply equally here).
pub async fn upsert_trade(pool: &PgPool, trade: &Trade) -> PersistenceResult<()> {
    let row = TradeRow::from(trade);
    sqlx::query(
        r#"
        INSERT INTO trades (
            id, market_id, side, outcome, size, price, taker, maker,
            timestamp, source, tx_hash
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            market_id = EXCLUDED.market_id,
            side = EXCLUDED.side,
            outcome = EXCLUDED.outcome,
            size = EXCLUDED.size,
            price = EXCLUDED.price,
            taker = EXCLUDED.taker,
            maker = EXCLUDED.maker,
            timestamp = EXCLUDED.timestamp,
            source = EXCLUDED.source,
            tx_hash = EXCLUDED.tx_hash
        "#,
    )
    .bind(row.id)
    .bind(row.market_id)
    .bind(row.side)
    .bind(row.outcome)
    .bind(row.size)
    .bind(row.price)
    .bind(row.taker)
    .bind(row.maker)
    .bind(row.timestamp)
    .bind(row.source)
    .bind(row.tx_hash)
    .execute(pool)
    .await?;
    Ok(())
}

/// Trades for a market in `[since, now]`, most-recent-first, for dormancy
/// lookback scans (§4.I) and market-data-unavailable fallback.
pub async fn recent_trades_for_market(
    pool: &PgPool,
    market_id: &MarketId,
    since: DateTime<Utc>,
    limit: i64,
) -> PersistenceResult<Vec<Trade>> {
    let rows: Vec<TradeRow> = sqlx::query_as(
        "SELECT * FROM trades WHERE market_id = $1 AND timestamp >= $2 ORDER BY timestamp DESC LIMIT $3",
    )
    .bind(&market_id.0)
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|r| Trade::try_from(r).ok())
        .collect())
}
