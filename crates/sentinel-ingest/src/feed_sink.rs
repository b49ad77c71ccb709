//! Adapts [`sentinel_clients::MarketFeedClient`] to the registry's
//! [`sentinel_registry::SubscriptionSink`] seam, so the registry can drive
//! WebSocket subscriptions without depending on `sentinel-clients` directly.

use sentinel_clients::MarketFeedClient;
use sentinel_registry::SubscriptionSink;
use std::sync::Arc;

pub struct FeedSubscriptionSink {
    client: Arc<MarketFeedClient>,
}

impl FeedSubscriptionSink {
    pub fn new(client: Arc<MarketFeedClient>) -> Self {
        Self { client }
    }
}

impl SubscriptionSink for FeedSubscriptionSink {
    fn subscribe(&self, token_id: &str) {
        self.client.subscribe(token_id);
    }

    fn unsubscribe(&self, token_id: &str) {
        self.client.unsubscribe(token_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn forwards_subscribe_and_unsubscribe_to_the_underlying_client() {
        let (tx, _rx) = mpsc::channel(8);
        let client = Arc::new(MarketFeedClient::new(Default::default(), tx));
        let sink = FeedSubscriptionSink::new(client.clone());
        sink.subscribe("tok-1");
        assert_eq!(client.subscribed_count(), 1);
        sink.unsubscribe("tok-1");
        assert_eq!(client.subscribed_count(), 0);
    }
}
