//! Typed, resilient clients for every upstream the surveillance pipeline
//! talks to: chain RPC, block explorer, subgraph-style indexer, REST
//! market-data, and the market-data WebSocket feed.
//!
//! Every HTTP client shares the same shape: rate limiter, circuit breaker,
//! and retry policy composed through [`retry::call_with_resilience`].

pub mod chain_rpc;
pub mod error;
pub mod explorer;
pub mod heartbeat;
pub mod indexer;
pub mod market_data;
pub mod market_feed;
pub mod retry;

pub use chain_rpc::{
    extract_taker_from_receipt, ChainRpcClient, HttpChainRpcClient, LogEntry, TransactionReceipt,
    TransferDirection, TransferRecord,
};
pub use error::{ClientError, Result};
pub use explorer::{ExplorerClient, HttpExplorerClient, NormalTransaction};
pub use heartbeat::{HeartbeatManager, HeartbeatStats};
pub use indexer::{
    merge_clob_trades, ActivityKind, ActivityRecord, ClobTrade, GraphQlIndexerClient,
    IndexerClient, ProxySignerMap, UserPosition,
};
pub use market_data::{
    ExchangeTrade, HttpMarketDataClient, MarketDataClient, OrderbookSnapshot, PriceLevel,
    UserActivitySummary,
};
pub use market_feed::{
    BookEvent, ConnectionState, FeedConfig, LastTradePriceEvent, MarketFeedClient,
    MarketFeedEvent, PriceChangeEvent, TickSizeChangeEvent, TradeEvent,
};
pub use retry::RetryPolicy;
