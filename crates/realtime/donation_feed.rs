use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use mockall::automock;
use serde::Serialize;
use tracing::debug;

pub const DONATION_RECEIVED: &str = "donation_received";

/// Payload pushed to live dashboards after a ledger commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: BigDecimal,
    pub timestamp: DateTime<Utc>,
}

impl DonationEvent {
    pub fn received(amount: BigDecimal) -> Self {
        Self {
            kind: DONATION_RECEIVED.to_string(),
            amount,
            timestamp: Utc::now(),
        }
    }
}

/// Fire-and-forget broadcast. Implementations must not block and never fail
/// the caller.
#[automock]
pub trait DonationFeed: Send + Sync {
    fn publish(&self, event: DonationEvent);
}

/// Used when no realtime endpoint is configured.
pub struct NoopDonationFeed;

impl DonationFeed for NoopDonationFeed {
    fn publish(&self, event: DonationEvent) {
        debug!(amount = %event.amount, "realtime: feed disabled, event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = DonationEvent {
            kind: DONATION_RECEIVED.to_string(),
            amount: BigDecimal::from(500),
            timestamp: DateTime::parse_from_rfc3339("2026-01-10T09:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("donation_received"));
        assert_eq!(value["amount"], json!("500"));
        assert_eq!(value["timestamp"], json!("2026-01-10T09:00:00Z"));
    }
}
