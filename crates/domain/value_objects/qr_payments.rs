use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::enums::payment_statuses::PaymentStatus;

pub const QR_EXPIRY_MINUTES: i64 = 15;
pub const QR_POLL_INTERVAL_SECS: u64 = 3;

pub fn qr_expires_at(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::minutes(QR_EXPIRY_MINUTES)
}

/// A QR is expired strictly after its deadline.
pub fn is_qr_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQrPaymentModel {
    pub amount: BigDecimal,
    pub project_id: Option<i64>,
}

/// QR code minted by the gateway for one pending payment.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayQrCode {
    pub reference: String,
    pub qr_image: String,
    pub promptpay_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrPaymentDto {
    pub reference: String,
    pub qr_image: String,
    pub promptpay_id: String,
    pub amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub poll_interval_secs: u64,
}

/// What a polling client is told about its QR payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QrPollStatus {
    Pending,
    Success,
    Fail,
    Expired,
    Cancelled,
}

impl QrPollStatus {
    pub fn from_attempt_status(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => QrPollStatus::Pending,
            PaymentStatus::Completed => QrPollStatus::Success,
            PaymentStatus::Failed => QrPollStatus::Fail,
            PaymentStatus::Cancelled => QrPollStatus::Cancelled,
        }
    }

    /// Whether the client should keep polling.
    pub fn is_final(&self) -> bool {
        !matches!(self, QrPollStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QrPaymentStatusDto {
    pub reference: String,
    pub status: QrPollStatus,
    pub expires_at: DateTime<Utc>,
}
