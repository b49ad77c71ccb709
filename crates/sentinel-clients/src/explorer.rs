//! Explorer client: alternative source of first-transfer timestamp and
//! normal-transaction history, keyed by method id (§4.E).

use crate::error::{ClientError, Result};
use crate::retry::{call_with_resilience, ensure_success, RetryPolicy};
use reqwest::Client;
use sentinel_core::Address;
use sentinel_resilience::{CircuitBreaker, RateLimiter};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NormalTransaction {
    pub hash: String,
    pub method_id: String,
    pub to: Option<Address>,
    pub timestamp_ms: i64,
}

#[async_trait::async_trait]
pub trait ExplorerClient: Send + Sync {
    async fn first_transfer_timestamp(&self, address: &Address) -> Result<Option<i64>>;
    async fn normal_transactions(
        &self,
        address: &Address,
        method_id: Option<&str>,
    ) -> Result<Vec<NormalTransaction>>;
}

pub struct HttpExplorerClient {
    http: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl HttpExplorerClient {
    pub fn new(
        base_url: impl Into<String>,
        http: Client,
        rate_limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            rate_limiter,
            breaker,
            policy: RetryPolicy::default(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        call_with_resilience(&self.rate_limiter, &self.breaker, self.policy, || {
            let url = url.clone();
            let http = self.http.clone();
            async move {
                let response = http.get(&url).send().await?;
                let response = ensure_success(response).await?;
                response
                    .json::<T>()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))
            }
        })
        .await
    }
}

#[async_trait::async_trait]
impl ExplorerClient for HttpExplorerClient {
    async fn first_transfer_timestamp(&self, address: &Address) -> Result<Option<i64>> {
        #[derive(Deserialize)]
        struct Resp {
            first_transfer_ms: Option<i64>,
        }
        let resp: Resp = self
            .get_json(&format!("/api/address/{address}/first-transfer"))
            .await?;
        Ok(resp.first_transfer_ms)
    }

    async fn normal_transactions(
        &self,
        address: &Address,
        method_id: Option<&str>,
    ) -> Result<Vec<NormalTransaction>> {
        #[derive(Deserialize)]
        struct RawTx {
            hash: String,
            method_id: String,
            to: Option<String>,
            timestamp_ms: i64,
        }
        let path = match method_id {
            Some(m) => format!("/api/address/{address}/txlist?methodId={m}"),
            None => format!("/api/address/{address}/txlist"),
        };
        let raw: Vec<RawTx> = self.get_json(&path).await?;
        raw.into_iter()
            .map(|r| {
                Ok(NormalTransaction {
                    hash: r.hash,
                    method_id: r.method_id,
                    to: r.to.as_deref().map(Address::parse).transpose()?,
                    timestamp_ms: r.timestamp_ms,
                })
            })
            .collect()
    }
}
