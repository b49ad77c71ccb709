//! Outbound notification delivery.
//!
//! Pretty-printed formatting and the chat-ops bot itself are external
//! collaborators; this crate only owns the structured payload and a
//! best-effort delivery of it to a configured webhook, falling back to a
//! log line when none is configured (§6 "Notification payload").

use async_trait::async_trait;
use reqwest::Client;
use sentinel_alerts::{AlertNotification, Notifier};
use tracing::{info, warn};

pub struct WebhookNotifier {
    http: Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(http: Client, webhook_url: Option<String>) -> Self {
        Self { http, webhook_url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: AlertNotification) {
        let Some(url) = &self.webhook_url else {
            info!(
                market = %notification.market_slug,
                classification = ?notification.classification,
                score = notification.score,
                wallet = %notification.wallet_truncated,
                usd_value = %notification.usd_value,
                "alert notification (no webhook configured, logging only)"
            );
            return;
        };

        if let Err(e) = self.http.post(url).json(&notification_body(&notification)).send().await {
            warn!(error = %e, "failed to deliver alert notification");
        }
    }
}

fn notification_body(n: &AlertNotification) -> serde_json::Value {
    serde_json::json!({
        "market_slug": n.market_slug,
        "market_question": n.market_question,
        "classification": format!("{:?}", n.classification),
        "score": n.score,
        "wallet": n.wallet_truncated,
        "usd_value": n.usd_value,
    })
}
