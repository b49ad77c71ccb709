//! Outbound notification seam (§4.K, §6): delivery is fire-and-forget,
//! so persistence never rolls back on a delivery failure.

use async_trait::async_trait;
use sentinel_core::Classification;

/// Everything a chat notification needs that the alert row itself doesn't
/// carry (market metadata, human-readable wallet display).
#[derive(Debug, Clone)]
pub struct AlertNotification {
    pub market_slug: String,
    pub market_question: String,
    pub classification: Classification,
    pub score: i32,
    pub wallet_truncated: String,
    pub usd_value: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification. Implementations log their own failures;
    /// the caller never inspects a return value because delivery failure
    /// must never roll back the already-committed alert.
    async fn notify(&self, notification: AlertNotification);
}

/// Truncates a `0x…` address display to `0xabcd…wxyz` for notification
/// payloads, matching how operators reference wallets in chat.
pub fn truncate_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_addresses() {
        assert_eq!(
            truncate_address("0x1111111111111111111111111111111111111111"),
            "0x1111…1111"
        );
    }

    #[test]
    fn leaves_short_strings_untouched() {
        assert_eq!(truncate_address("0xabc"), "0xabc");
    }
}
