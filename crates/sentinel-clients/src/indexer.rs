//! Indexer (GraphQL) client: user activity, positions, CLOB trades, and
//! proxy-signer identity resolution (§4.E, §4.J).
//!
//! Query shapes are fixed JSON POST bodies; there is no compile-time schema
//! available to codegen against, so requests go over plain `reqwest` JSON
//! rather than a GraphQL-client crate.

use crate::error::{ClientError, Result};
use crate::retry::{call_with_resilience, ensure_success, RetryPolicy};
use reqwest::Client;
use rust_decimal::Decimal;
use sentinel_core::Address;
use sentinel_resilience::{CircuitBreaker, RateLimiter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Split,
    Merge,
    Redeem,
}

#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub kind: ActivityKind,
    pub condition_id: String,
    pub usd_amount: Decimal,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone)]
pub struct UserPosition {
    pub condition_id: String,
    pub net_deposits_usd: Decimal,
    pub net_withdrawals_usd: Decimal,
    pub realized_pnl_usd: Decimal,
    pub unrealized_pnl_usd: Decimal,
}

#[derive(Debug, Clone)]
pub struct ClobTrade {
    pub event_id: String,
    pub condition_id: String,
    pub token_id: String,
    pub usd_size: Decimal,
    pub timestamp_ms: i64,
    pub as_maker: bool,
}

/// Merge maker+taker query results deduplicated by event id (§4.E).
pub fn merge_clob_trades(maker: Vec<ClobTrade>, taker: Vec<ClobTrade>) -> Vec<ClobTrade> {
    let mut seen = std::collections::HashSet::new();
    maker
        .into_iter()
        .chain(taker)
        .filter(|t| seen.insert(t.event_id.clone()))
        .collect()
}

#[async_trait::async_trait]
pub trait IndexerClient: Send + Sync {
    async fn user_activity(&self, address: &Address) -> Result<Vec<ActivityRecord>>;
    async fn user_positions(&self, address: &Address) -> Result<Vec<UserPosition>>;
    async fn clob_trades_as_maker(&self, address: &Address) -> Result<Vec<ClobTrade>>;
    async fn clob_trades_as_taker(&self, address: &Address) -> Result<Vec<ClobTrade>>;
    /// Resolve a proxy contract address to its signer EOA. `None` when the
    /// indexer has no mapping for this address (a plain 404, per §4.J).
    async fn resolve_signer(&self, proxy: &Address) -> Result<Option<Address>>;
    /// Recent CLOB trades across the given token ids within the window.
    async fn recent_trades(
        &self,
        token_ids: &[String],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ClobTrade>>;
}

pub struct GraphQlIndexerClient {
    http: Client,
    endpoint: String,
    rate_limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl GraphQlIndexerClient {
    pub fn new(
        endpoint: impl Into<String>,
        http: Client,
        rate_limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            rate_limiter,
            breaker,
            policy: RetryPolicy::default(),
        }
    }

    async fn query<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        #[derive(Deserialize)]
        struct GraphQlEnvelope<T> {
            data: T,
        }
        let body = json!({ "query": query, "variables": variables });
        let endpoint = self.endpoint.clone();
        call_with_resilience(&self.rate_limiter, &self.breaker, self.policy, || {
            let endpoint = endpoint.clone();
            let http = self.http.clone();
            let body = body.clone();
            async move {
                let response = http.post(&endpoint).json(&body).send().await?;
                let response = ensure_success(response).await?;
                let envelope: GraphQlEnvelope<T> = response
                    .json()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                Ok(envelope.data)
            }
        })
        .await
    }
}

#[async_trait::async_trait]
impl IndexerClient for GraphQlIndexerClient {
    async fn user_activity(&self, address: &Address) -> Result<Vec<ActivityRecord>> {
        #[derive(Deserialize)]
        struct RawActivity {
            kind: ActivityKind,
            condition_id: String,
            usd_amount: Decimal,
            timestamp_ms: i64,
        }
        #[derive(Deserialize)]
        struct Resp {
            activity: Vec<RawActivity>,
        }
        let resp: Resp = self
            .query(
                "query Activity($address: String!) { activity(address: $address) { kind conditionId usdAmount timestampMs } }",
                json!({ "address": address.to_string() }),
            )
            .await?;
        Ok(resp
            .activity
            .into_iter()
            .map(|a| ActivityRecord {
                kind: a.kind,
                condition_id: a.condition_id,
                usd_amount: a.usd_amount,
                timestamp_ms: a.timestamp_ms,
            })
            .collect())
    }

    async fn user_positions(&self, address: &Address) -> Result<Vec<UserPosition>> {
        #[derive(Deserialize)]
        struct RawPosition {
            condition_id: String,
            net_deposits_usd: Decimal,
            net_withdrawals_usd: Decimal,
            realized_pnl_usd: Decimal,
            unrealized_pnl_usd: Decimal,
        }
        #[derive(Deserialize)]
        struct Resp {
            positions: Vec<RawPosition>,
        }
        let resp: Resp = self
            .query(
                "query Positions($address: String!) { positions(address: $address) { conditionId netDepositsUsd netWithdrawalsUsd realizedPnlUsd unrealizedPnlUsd } }",
                json!({ "address": address.to_string() }),
            )
            .await?;
        Ok(resp
            .positions
            .into_iter()
            .map(|p| UserPosition {
                condition_id: p.condition_id,
                net_deposits_usd: p.net_deposits_usd,
                net_withdrawals_usd: p.net_withdrawals_usd,
                realized_pnl_usd: p.realized_pnl_usd,
                unrealized_pnl_usd: p.unrealized_pnl_usd,
            })
            .collect())
    }

    async fn clob_trades_as_maker(&self, address: &Address) -> Result<Vec<ClobTrade>> {
        self.clob_trades(address, true).await
    }

    async fn clob_trades_as_taker(&self, address: &Address) -> Result<Vec<ClobTrade>> {
        self.clob_trades(address, false).await
    }

    async fn resolve_signer(&self, proxy: &Address) -> Result<Option<Address>> {
        #[derive(Deserialize)]
        struct Resp {
            signer: Option<String>,
        }
        let result: std::result::Result<Resp, ClientError> = self
            .query(
                "query Signer($proxy: String!) { signer(proxy: $proxy) }",
                json!({ "proxy": proxy.to_string() }),
            )
            .await;
        match result {
            Ok(resp) => Ok(resp.signer.as_deref().map(Address::parse).transpose()?),
            Err(ClientError::HttpStatus { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn recent_trades(
        &self,
        token_ids: &[String],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ClobTrade>> {
        #[derive(Deserialize)]
        struct RawTrade {
            event_id: String,
            condition_id: String,
            token_id: String,
            usd_size: Decimal,
            timestamp_ms: i64,
            as_maker: bool,
        }
        #[derive(Deserialize)]
        struct Resp {
            trades: Vec<RawTrade>,
        }
        let resp: Resp = self
            .query(
                "query Recent($tokenIds: [String!]!, $from: Int!, $to: Int!) { trades(tokenIds: $tokenIds, fromBlock: $from, toBlock: $to) { eventId conditionId tokenId usdSize timestampMs asMaker } }",
                json!({ "tokenIds": token_ids, "from": from_block, "to": to_block }),
            )
            .await?;
        Ok(resp
            .trades
            .into_iter()
            .map(|t| ClobTrade {
                event_id: t.event_id,
                condition_id: t.condition_id,
                token_id: t.token_id,
                usd_size: t.usd_size,
                timestamp_ms: t.timestamp_ms,
                as_maker: t.as_maker,
            })
            .collect())
    }
}

impl GraphQlIndexerClient {
    async fn clob_trades(&self, address: &Address, as_maker: bool) -> Result<Vec<ClobTrade>> {
        #[derive(Deserialize)]
        struct RawTrade {
            event_id: String,
            condition_id: String,
            token_id: String,
            usd_size: Decimal,
            timestamp_ms: i64,
        }
        #[derive(Deserialize)]
        struct Resp {
            trades: Vec<RawTrade>,
        }
        let field = if as_maker { "makerTrades" } else { "takerTrades" };
        let resp: Resp = self
            .query(
                &format!(
                    "query Clob($address: String!) {{ trades: {field}(address: $address) {{ eventId conditionId tokenId usdSize timestampMs }} }}"
                ),
                json!({ "address": address.to_string() }),
            )
            .await?;
        Ok(resp
            .trades
            .into_iter()
            .map(|t| ClobTrade {
                event_id: t.event_id,
                condition_id: t.condition_id,
                token_id: t.token_id,
                usd_size: t.usd_size,
                timestamp_ms: t.timestamp_ms,
                as_maker,
            })
            .collect())
    }
}

/// `HashMap` is used only as the return shape for batch proxy lookups;
/// kept here so forensics callers don't need to depend on serde_json.
pub type ProxySignerMap = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(event_id: &str, as_maker: bool) -> ClobTrade {
        ClobTrade {
            event_id: event_id.into(),
            condition_id: "c1".into(),
            token_id: "t1".into(),
            usd_size: Decimal::new(100, 0),
            timestamp_ms: 0,
            as_maker,
        }
    }

    #[test]
    fn merge_dedups_by_event_id() {
        let maker = vec![trade("e1", true), trade("e2", true)];
        let taker = vec![trade("e2", false), trade("e3", false)];
        let merged = merge_clob_trades(maker, taker);
        assert_eq!(merged.len(), 3);
    }
}
