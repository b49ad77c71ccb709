//! Chain RPC client: tx history, transfers, block metadata, receipts
//! (§4.E).

use crate::error::{ClientError, Result};
use crate::retry::{call_with_resilience, ensure_success, RetryPolicy};
use reqwest::Client;
use sentinel_core::{Address, TokenAmount, TxHash};
use sentinel_resilience::{CircuitBreaker, RateLimiter};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub direction: TransferDirection,
    pub counterparty: Address,
    pub category: String,
    pub amount: TokenAmount,
    pub block_number: u64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<String>,
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub status: bool,
    pub logs: Vec<LogEntry>,
}

/// Extract the taker address from a match-engine receipt.
///
/// Convention: the last indexed topic of the match/fill log is the taker
/// (initiator) address, left-padded to 32 bytes; only the final 20 bytes
/// are the address.
pub fn extract_taker_from_receipt(receipt: &TransactionReceipt) -> Option<Address> {
    let log = receipt.logs.iter().rev().find(|l| l.topics.len() >= 2)?;
    let topic = log.topics.last()?;
    let hex_only = topic.strip_prefix("0x").unwrap_or(topic);
    if hex_only.len() < 40 {
        return None;
    }
    let tail = &hex_only[hex_only.len() - 40..];
    Address::parse(tail).ok()
}

#[async_trait::async_trait]
pub trait ChainRpcClient: Send + Sync {
    async fn transaction_count(&self, address: &Address) -> Result<u64>;
    async fn first_transfer_timestamp(&self, address: &Address) -> Result<Option<i64>>;
    async fn asset_transfers(
        &self,
        address: &Address,
        direction: TransferDirection,
        category: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferRecord>>;
    async fn current_block_number(&self) -> Result<u64>;
    async fn block_timestamp(&self, block_number: u64) -> Result<i64>;
    async fn transaction_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt>;
}

pub struct HttpChainRpcClient {
    http: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl HttpChainRpcClient {
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

#[derive(Debug, Deserialize)]
struct TxCountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct BlockNumberResponse {
    block_number: u64,
}

#[derive(Debug, Deserialize)]
struct BlockTimestampResponse {
    timestamp_ms: i64,
}

#[async_trait::async_trait]
impl ChainRpcClient for HttpChainRpcClient {
    async fn transaction_count(&self, address: &Address) -> Result<u64> {
        let resp: TxCountResponse = self
            .get_json(&format!("/address/{address}/tx-count"))
            .await?;
        Ok(resp.count)
    }

    async fn first_transfer_timestamp(&self, address: &Address) -> Result<Option<i64>> {
        #[derive(Deserialize)]
        struct Resp {
            first_transfer_ms: Option<i64>,
        }
        let resp: Resp = self
            .get_json(&format!("/address/{address}/first-transfer"))
            .await?;
        Ok(resp.first_transfer_ms)
    }

    async fn asset_transfers(
        &self,
        address: &Address,
        direction: TransferDirection,
        category: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferRecord>> {
        #[derive(Deserialize)]
        struct RawTransfer {
            counterparty: String,
            amount: rust_decimal::Decimal,
            block_number: u64,
            timestamp_ms: i64,
        }
        let dir = match direction {
            TransferDirection::Inbound => "in",
            TransferDirection::Outbound => "out",
        };
        let raw: Vec<RawTransfer> = self
            .get_json(&format!(
                "/address/{address}/transfers?direction={dir}&category={category}&from={from_block}&to={to_block}"
            ))
            .await?;

        raw.into_iter()
            .map(|r| {
                Ok(TransferRecord {
                    direction,
                    counterparty: Address::parse(&r.counterparty)?,
                    category: category.to_string(),
                    amount: TokenAmount::new(r.amount),
                    block_number: r.block_number,
                    timestamp_ms: r.timestamp_ms,
                })
            })
            .collect()
    }

    async fn current_block_number(&self) -> Result<u64> {
        let resp: BlockNumberResponse = self.get_json("/block/latest").await?;
        Ok(resp.block_number)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<i64> {
        let resp: BlockTimestampResponse =
            self.get_json(&format!("/block/{block_number}/timestamp")).await?;
        Ok(resp.timestamp_ms)
    }

    async fn transaction_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt> {
        #[derive(Deserialize)]
        struct RawLog {
            address: String,
            topics: Vec<String>,
            data: String,
        }
        #[derive(Deserialize)]
        struct RawReceipt {
            block_number: u64,
            status: bool,
            logs: Vec<RawLog>,
        }
        let raw: RawReceipt = self
            .get_json(&format!("/tx/{}/receipt", tx_hash.as_str()))
            .await?;
        let logs = raw
            .logs
            .into_iter()
            .map(|l| {
                Ok(LogEntry {
                    address: Address::parse(&l.address)?,
                    topics: l.topics,
                    data: l.data,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TransactionReceipt {
            tx_hash: tx_hash.clone(),
            block_number: raw.block_number,
            status: raw.status,
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    #[test]
    fn extracts_taker_from_last_topic() {
        let receipt = TransactionReceipt {
            tx_hash: TxHash::parse("0xabc"),
            block_number: 1,
            status: true,
            logs: vec![LogEntry {
                address: addr(1),
                topics: vec![
                    "0x0000000000000000000000000000000000000000000000000000000000000001".into(),
                    format!("0x{:064x}", 0xdeadu64),
                ],
                data: String::new(),
            }],
        };
        let taker = extract_taker_from_receipt(&receipt);
        assert_eq!(
            taker,
            Some(Address::parse(&format!("0x{:040x}", 0xdeadu64)).unwrap())
        );
    }

    #[test]
    fn returns_none_when_no_multi_topic_log() {
        let receipt = TransactionReceipt {
            tx_hash: TxHash::parse("0xabc"),
            block_number: 1,
            status: true,
            logs: vec![LogEntry {
                address: addr(1),
                topics: vec!["0x01".into()],
                data: String::new(),
            }],
        };
        assert!(extract_taker_from_receipt(&receipt).is_none());
    }
}
