//! Alerts table: keyed by trade id (§3's uniqueness invariant: one alert per
//! trade id). Written under the trade-id distributed lock (§4.K).

use crate::error::PersistenceResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sentinel_core::{Address, Alert, Classification, MarketId, ScoreBreakdown, Usd};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertRow {
    pub id: Uuid,
    pub trade_id: String,
    pub market_id: String,
    pub wallet: String,
    pub score: i32,
    pub classification: String,
    pub impact_component: i32,
    pub dormancy_component: i32,
    pub wallet_component: i32,
    pub confidence_penalty: i32,
    pub usd_value: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&Alert> for AlertRow {
    fn from(a: &Alert) -> Self {
        Self {
            id: a.id,
            trade_id: a.trade_id.clone(),
            market_id: a.market_id.0.clone(),
            wallet: a.wallet.to_string(),
            score: a.score,
            classification: classification_str(a.classification).to_string(),
            impact_component: a.breakdown.impact_component,
            dormancy_component: a.breakdown.dormancy_component,
            wallet_component: a.breakdown.wallet_component,
            confidence_penalty: a.breakdown.confidence_penalty,
            usd_value: a.usd_value.inner(),
            created_at: a.created_at,
        }
    }
}

fn classification_str(c: Classification) -> &'static str {
    match c {
        Classification::StrongInsider => "strong-insider",
        Classification::HighConfidence => "high-confidence",
        Classification::MediumConfidence => "medium-confidence",
        Classification::LogOnly => "log-only",
    }
}

impl TryFrom<AlertRow> for Alert {
    type Error = sentinel_core::CoreError;

    fn try_from(r: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: r.id,
            trade_id: r.trade_id,
            market_id: MarketId(r.market_id),
            wallet: Address::parse(&r.wallet)?,
            breakdown: ScoreBreakdown {
                impact_component: r.impact_component,
                dormancy_component: r.dormancy_component,
                wallet_component: r.wallet_component,
                confidence_penalty: r.confidence_penalty,
            },
            score: r.score,
            classification: match r.classification.as_str() {
                "strong-insider" => Classification::StrongInsider,
                "high-confidence" => Classification::HighConfidence,
                "medium-confidence" => Classification::MediumConfidence,
                _ => Classification::LogOnly,
            },
            usd_value: Usd::new(r.usd_value),
            created_at: r.created_at,
        })
    }
}

/// Upsert by trade id (§3, §8): `persistAlert(a); persistAlert(a)` yields
/// exactly one row. Caller must hold the trade-id distributed lock.
pub async fn upsert_alert(pool: &PgPool, alert: &Alert) -> PersistenceResult<()> {
    let row = AlertRow::from(alert);
    sqlx::query(
        r#"
        INSERT INTO alerts (
            id, trade_id, market_id, wallet, score, classification,
            impact_component, dormancy_component, wallet_component,
            confidence_penalty, usd_value, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (trade_id) DO UPDATE SET
            score = EXCLUDED.score,
            classification = EXCLUDED.classification,
            impact_component = EXCLUDED.impact_component,
            dormancy_component = EXCLUDED.dormancy_component,
            wallet_component = EXCLUDED.wallet_component,
            confidence_penalty = EXCLUDED.confidence_penalty,
            usd_value = EXCLUDED.usd_value
        "#,
    )
    .bind(row.id)
    .bind(row.trade_id)
    .bind(row.market_id)
    .bind(row.wallet)
    .bind(row.score)
    .bind(row.classification)
    .bind(row.impact_component)
    .bind(row.dormancy_component)
    .bind(row.wallet_component)
    .bind(row.confidence_penalty)
    .bind(row.usd_value)
    .bind(row.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn alert_exists_for_trade(pool: &PgPool, trade_id: &str) -> PersistenceResult<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM alerts WHERE trade_id = $1")
        .bind(trade_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}
