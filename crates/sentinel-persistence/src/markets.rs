//! Markets table: keyed by id, columns matching §3's Market attributes.

use crate::error::PersistenceResult;
use rust_decimal::Decimal;
use sentinel_core::{ConditionId, Market, MarketId, Tier, TokenId, Usd};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MarketRow {
    pub id: String,
    pub condition_id: String,
    pub token_id_yes: Option<String>,
    pub token_id_no: Option<String>,
    pub question: String,
    pub url_slug: String,
    pub tier: i16,
    pub category: String,
    pub enabled: bool,
    pub open_interest: Decimal,
    pub lifetime_volume: Decimal,
}

impl From<&Market> for MarketRow {
    fn from(m: &Market) -> Self {
        Self {
            id: m.id.0.clone(),
            condition_id: m.condition_id.0.clone(),
            token_id_yes: m.token_id_yes.as_ref().map(|t| t.0.clone()),
            token_id_no: m.token_id_no.as_ref().map(|t| t.0.clone()),
            question: m.question.clone(),
            url_slug: m.url_slug.clone(),
            tier: match m.tier {
                Tier::One => 1,
                Tier::Two => 2,
                Tier::Three => 3,
            },
            category: m.category.clone(),
            enabled: m.enabled,
            open_interest: m.open_interest.inner(),
            lifetime_volume: m.lifetime_volume.inner(),
        }
    }
}

impl From<MarketRow> for Market {
    fn from(r: MarketRow) -> Self {
        Market {
            id: MarketId(r.id),
            condition_id: ConditionId(r.condition_id),
            token_id_yes: r.token_id_yes.map(TokenId),
            token_id_no: r.token_id_no.map(TokenId),
            question: r.question,
            url_slug: r.url_slug,
            tier: match r.tier {
                1 => Tier::One,
                2 => Tier::Two,
                _ => Tier::Three,
            },
            category: r.category,
            enabled: r.enabled,
            open_interest: Usd::new(r.open_interest),
            lifetime_volume: Usd::new(r.lifetime_volume),
        }
    }
}

/// Upsert a market by id. Used both by the admin-command create path and by
/// the registry's periodic open-interest/volume refresh (§4.F).
pub async fn upsert_market(pool: &PgPool, market: &Market) -> PersistenceResult<()> {
    let row = MarketRow::from(market);
    sqlx::query(
        r#"
        INSERT INTO markets (
            id, condition_id, token_id_yes, token_id_no, question, url_slug,
            tier, category, enabled, open_interest, lifetime_volume
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            condition_id = EXCLUDED.condition_id,
            token_id_yes = EXCLUDED.token_id_yes,
            token_id_no = EXCLUDED.token_id_no,
            question = EXCLUDED.question,
            url_slug = EXCLUDED.url_slug,
            tier = EXCLUDED.tier,
            category = EXCLUDED.category,
            enabled = EXCLUDED.enabled,
            open_interest = EXCLUDED.open_interest,
            lifetime_volume = EXCLUDED.lifetime_volume
        "#,
    )
    .bind(row.id)
    .bind(row.condition_id)
    .bind(row.token_id_yes)
    .bind(row.token_id_no)
    .bind(row.question)
    .bind(row.url_slug)
    .bind(row.tier)
    .bind(row.category)
    .bind(row.enabled)
    .bind(row.open_interest)
    .bind(row.lifetime_volume)
    .execute(pool)
    .await?;
    Ok(())
}

/// Refresh just the liquidity/volume columns (§4.F's 10-minute refresh job),
/// without touching identity or enabled state.
pub async fn update_market_liquidity(
    pool: &PgPool,
    id: &MarketId,
    open_interest: Usd,
    lifetime_volume: Usd,
) -> PersistenceResult<()> {
    sqlx::query("UPDATE markets SET open_interest = $1, lifetime_volume = $2 WHERE id = $3")
        .bind(open_interest.inner())
        .bind(lifetime_volume.inner())
        .bind(&id.0)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn load_all_markets(pool: &PgPool) -> PersistenceResult<Vec<Market>> {
    let rows: Vec<MarketRow> = sqlx::query_as("SELECT * FROM markets").fetch_all(pool).await?;
    Ok(rows.into_iter().map(Market::from).collect())
}

pub async fn disable_market(pool: &PgPool, id: &MarketId) -> PersistenceResult<()> {
    sqlx::query("UPDATE markets SET enabled = false WHERE id = $1")
        .bind(&id.0)
        .execute(pool)
        .await?;
    Ok(())
}
