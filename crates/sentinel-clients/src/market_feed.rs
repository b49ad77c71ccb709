//! Market-data WebSocket client: subscribes to per-token order book and
//! trade feeds, reconnects with exponential backoff, and resubscribes the
//! full token set on every reconnect (§4.E).

use crate::error::{ClientError, Result};
use crate::heartbeat::HeartbeatManager;
use dashmap::DashSet;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    /// 0 means retry forever.
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 60_000,
            heartbeat_interval_ms: crate::heartbeat::DEFAULT_PING_INTERVAL_MS,
            heartbeat_timeout_ms: crate::heartbeat::DEFAULT_PONG_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct SubscribeRequest<'a> {
    assets_ids: &'a [String],
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MarketFeedEvent {
    Book(BookEvent),
    PriceChange(PriceChangeEvent),
    Trade(TradeEvent),
    TickSizeChange(TickSizeChangeEvent),
    LastTradePrice(LastTradePriceEvent),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookEvent {
    pub asset_id: String,
    pub bids: Vec<(rust_decimal::Decimal, rust_decimal::Decimal)>,
    pub asks: Vec<(rust_decimal::Decimal, rust_decimal::Decimal)>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceChangeEvent {
    pub asset_id: String,
    pub price: rust_decimal::Decimal,
    pub side: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeEvent {
    pub asset_id: String,
    pub trade_id: String,
    pub price: rust_decimal::Decimal,
    pub size: rust_decimal::Decimal,
    pub side: String,
    pub timestamp_ms: i64,
    /// Taker wallet address, when the venue's feed includes it. Most
    /// match-engine trade broadcasts omit identity entirely; ingestion
    /// treats its absence as "no resolvable taker" rather than an error.
    #[serde(default)]
    pub taker: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickSizeChangeEvent {
    pub asset_id: String,
    pub new_tick_size: rust_decimal::Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastTradePriceEvent {
    pub asset_id: String,
    pub price: rust_decimal::Decimal,
}

/// Reconnecting market-data feed client. Generalizes the resilient
/// subscribe/reconnect pattern to a dynamic set of token ids rather than a
/// fixed list of coin symbols: callers add/remove subscriptions at runtime
/// (driven by the market registry's tier changes) and every reconnect
/// resubscribes the current full set.
pub struct MarketFeedClient {
    config: FeedConfig,
    state: Arc<RwLock<ConnectionState>>,
    subscribed: Arc<DashSet<String>>,
    heartbeat: Arc<HeartbeatManager>,
    event_tx: mpsc::Sender<MarketFeedEvent>,
    reconnect_count: Arc<RwLock<u32>>,
}

impl MarketFeedClient {
    pub fn new(config: FeedConfig, event_tx: mpsc::Sender<MarketFeedEvent>) -> Self {
        let heartbeat = Arc::new(HeartbeatManager::new(
            config.heartbeat_interval_ms,
            config.heartbeat_timeout_ms,
        ));
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            subscribed: Arc::new(DashSet::new()),
            heartbeat,
            event_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Add a token to the live subscription set. Takes effect immediately if
    /// connected; otherwise applied on next connect.
    pub fn subscribe(&self, token_id: impl Into<String>) {
        self.subscribed.insert(token_id.into());
    }

    pub fn unsubscribe(&self, token_id: &str) {
        self.subscribed.remove(token_id);
    }

    pub fn subscribed_count(&self) -> usize {
        self.subscribed.len()
    }

    /// Connect and run the message loop, reconnecting with exponential
    /// backoff until `max_reconnect_attempts` is hit (0 = forever).
    pub async fn run(&self) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            *self.state.write() = ConnectionState::Connecting;

            match self.try_connect().await {
                Ok(()) => info!("market feed connection closed"),
                Err(e) => error!(error = %e, "market feed connection error"),
            }

            attempt += 1;
            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "max reconnection attempts reached");
                return Err(ClientError::MaxReconnectsReached);
            }

            *self.state.write() = ConnectionState::Reconnecting;
            let delay = self.backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis(), "reconnecting to market feed");
            tokio::time::sleep(delay).await;
        }
    }

    async fn try_connect(&self) -> Result<()> {
        info!(url = %self.config.url, "connecting to market feed");
        let (ws_stream, _response) = connect_async(&self.config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = ConnectionState::Connected;
        *self.reconnect_count.write() = 0;
        info!("market feed connected");

        self.send_subscribe_all(&mut write).await?;
        self.heartbeat.reset();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.heartbeat.record_pong();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "normal close".to_string()));
                            warn!(code, %reason, "market feed closed by server");
                            return Err(ClientError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            warn!("market feed stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                _ = self.heartbeat.wait_for_check() => {
                    if self.heartbeat.is_timed_out() {
                        error!("market feed heartbeat timeout");
                        return Err(ClientError::HeartbeatTimeout);
                    }
                    if self.heartbeat.should_send_heartbeat() {
                        write.send(Message::Ping(Vec::new())).await?;
                        self.heartbeat.record_ping();
                        debug!("sent market feed ping");
                    }
                }
            }
        }
    }

    async fn handle_text(&self, text: &str) {
        self.heartbeat.record_message();
        match serde_json::from_str::<MarketFeedEvent>(text) {
            Ok(event) => {
                if self.event_tx.send(event).await.is_err() {
                    warn!("market feed event receiver dropped");
                }
            }
            Err(e) => debug!(error = %e, "unrecognized market feed message"),
        }
    }

    async fn send_subscribe_all<W>(&self, write: &mut W) -> Result<()>
    where
        W: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let ids: Vec<String> = self.subscribed.iter().map(|r| r.clone()).collect();
        if ids.is_empty() {
            return Ok(());
        }
        let req = SubscribeRequest { assets_ids: &ids, kind: "market" };
        let msg = serde_json::to_string(&req).map_err(|e| ClientError::Decode(e.to_string()))?;
        write.send(Message::Text(msg)).await?;
        info!(count = ids.len(), "sent full subscription set to market feed");
        Ok(())
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent).min(max);
        Duration::from_millis(delay + jitter_ms())
    }
}

fn jitter_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_infinite_reconnects_and_spec_heartbeat() {
        let config = FeedConfig::default();
        assert_eq!(config.max_reconnect_attempts, 0);
        assert_eq!(config.heartbeat_interval_ms, 30_000);
        assert_eq!(config.heartbeat_timeout_ms, 5_000);
    }

    #[test]
    fn subscribe_and_unsubscribe_mutate_the_set() {
        let (tx, _rx) = mpsc::channel(8);
        let client = MarketFeedClient::new(FeedConfig::default(), tx);
        client.subscribe("token-1");
        client.subscribe("token-2");
        assert_eq!(client.subscribed_count(), 2);
        client.unsubscribe("token-1");
        assert_eq!(client.subscribed_count(), 1);
    }

    #[test]
    fn backoff_delay_caps_at_configured_max() {
        let (tx, _rx) = mpsc::channel(8);
        let client = MarketFeedClient::new(FeedConfig::default(), tx);
        let delay = client.backoff_delay(20);
        assert!(delay.as_millis() as u64 <= client.config.reconnect_max_delay_ms + 1000);
    }
}
