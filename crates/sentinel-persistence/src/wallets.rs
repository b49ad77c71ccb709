//! Wallets table: keyed by address, upserted on every fresh fingerprint
//! computation (§3's WalletFingerprint lifecycle: computed on demand,
//! cached with TTL, persisted via upsert).

use crate::error::PersistenceResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sentinel_core::{
    Address, ConfidenceEnvelope, ConfidenceLevel, ForensicsPath, Usd, WalletFingerprint,
    WalletFlags,
};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletRow {
    pub address: String,
    pub path: String,
    pub lifetime_trade_count: i64,
    pub lifetime_usd_volume: Decimal,
    pub account_age_days: Option<f64>,
    pub position_concentration_pct: f64,
    pub markets_traded: i32,
    pub flags: serde_json::Value,
    pub confidence_score: i32,
    pub confidence_level: String,
    pub computed_at: DateTime<Utc>,
}

impl From<&WalletFingerprint> for WalletRow {
    fn from(w: &WalletFingerprint) -> Self {
        Self {
            address: w.address.to_string(),
            path: match w.path {
                ForensicsPath::Indexer => "indexer".into(),
                ForensicsPath::OnChain => "onchain".into(),
            },
            lifetime_trade_count: w.lifetime_trade_count as i64,
            lifetime_usd_volume: w.lifetime_usd_volume.inner(),
            account_age_days: w.account_age_days,
            position_concentration_pct: w.position_concentration_pct,
            markets_traded: w.markets_traded as i32,
            flags: serde_json::to_value(w.flags).unwrap_or(serde_json::Value::Null),
            confidence_score: w.confidence.score,
            confidence_level: match w.confidence.level {
                ConfidenceLevel::High => "high".into(),
                ConfidenceLevel::Medium => "medium".into(),
                ConfidenceLevel::Low => "low".into(),
                ConfidenceLevel::None => "none".into(),
            },
            computed_at: w.computed_at,
        }
    }
}

impl TryFrom<WalletRow> for WalletFingerprint {
    type Error = sentinel_core::CoreError;

    fn try_from(r: WalletRow) -> Result<Self, Self::Error> {
        let flags: WalletFlags = serde_json::from_value(r.flags).unwrap_or_default();
        let level = match r.confidence_level.as_str() {
            "high" => ConfidenceLevel::High,
            "medium" => ConfidenceLevel::Medium,
            "low" => ConfidenceLevel::Low,
            _ => ConfidenceLevel::None,
        };
        Ok(WalletFingerprint {
            address: Address::parse(&r.address)?,
            path: if r.path == "indexer" {
                ForensicsPath::Indexer
            } else {
                ForensicsPath::OnChain
            },
            lifetime_trade_count: r.lifetime_trade_count.max(0) as u64,
            lifetime_usd_volume: Usd::new(r.lifetime_usd_volume),
            account_age_days: r.account_age_days,
            position_concentration_pct: r.position_concentration_pct,
            markets_traded: r.markets_traded.max(0) as u32,
            flags,
            confidence: ConfidenceEnvelope {
                data_completeness: 0.0,
                cross_source_consistency: 0.0,
                freshness_minutes: 0.0,
                reliability: 0.0,
                score: r.confidence_score,
                level,
            },
            computed_at: r.computed_at,
        })
    }
}

pub async fn upsert_wallet(pool: &PgPool, fingerprint: &WalletFingerprint) -> PersistenceResult<()> {
    let row = WalletRow::from(fingerprint);
    sqlx::query(
        r#"
        INSERT INTO wallets (
            address, path, lifetime_trade_count, lifetime_usd_volume,
            account_age_days, position_concentration_pct, markets_traded,
            flags, confidence_score, confidence_level, computed_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (address) DO UPDATE SET
            path = EXCLUDED.path,
            lifetime_trade_count = EXCLUDED.lifetime_trade_count,
            lifetime_usd_volume = EXCLUDED.lifetime_usd_volume,
            account_age_days = EXCLUDED.account_age_days,
            position_concentration_pct = EXCLUDED.position_concentration_pct,
            markets_traded = EXCLUDED.markets_traded,
            flags = EXCLUDED.flags,
            confidence_score = EXCLUDED.confidence_score,
            confidence_level = EXCLUDED.confidence_level,
            computed_at = EXCLUDED.computed_at
        "#,
    )
    .bind(row.address)
    .bind(row.path)
    .bind(row.lifetime_trade_count)
    .bind(row.lifetime_usd_volume)
    .bind(row.account_age_days)
    .bind(row.position_concentration_pct)
    .bind(row.markets_traded)
    .bind(row.flags)
    .bind(row.confidence_score)
    .bind(row.confidence_level)
    .bind(row.computed_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_wallet(pool: &PgPool, address: &Address) -> PersistenceResult<Option<WalletFingerprint>> {
    let row: Option<WalletRow> = sqlx::query_as("SELECT * FROM wallets WHERE address = $1")
        .bind(address.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|r| WalletFingerprint::try_from(r).ok()))
}
