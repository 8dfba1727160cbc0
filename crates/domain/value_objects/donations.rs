use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::payment_records::PaymentRecordEntity;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecordDto {
    pub id: Uuid,
    pub reference: String,
    pub rail: String,
    pub status: String,
    pub status_label: String,
    pub amount: BigDecimal,
    pub project_id: Option<i64>,
    pub payment_date: DateTime<Utc>,
}

impl From<PaymentRecordEntity> for PaymentRecordDto {
    fn from(value: PaymentRecordEntity) -> Self {
        Self {
            id: value.id,
            reference: value.reference,
            rail: value.rail,
            status: value.status,
            status_label: value.status_label,
            amount: value.amount,
            project_id: value.project_id,
            payment_date: value.payment_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DonationSummaryDto {
    pub balance: BigDecimal,
    pub recent_payments: Vec<PaymentRecordDto>,
}

/// Result of an accepted slip upload.
#[derive(Debug, Clone, Serialize)]
pub struct SlipDepositDto {
    pub reference: String,
    pub amount: BigDecimal,
    /// False for anonymous uploads: the slip was checked but nothing was credited.
    pub credited: bool,
    pub payment_id: Option<Uuid>,
}
