use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;
use crate::infra::db::postgres::schema::payment_attempts;

/// A QR payment between minting and settlement.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_attempts)]
pub struct PaymentAttemptEntity {
    pub id: Uuid,
    pub reference: String,
    pub rail: String,
    pub amount: BigDecimal,
    pub user_id: Uuid,
    pub project_id: Option<i64>,
    pub status: String,
    pub status_label: String,
    pub qr_image: String,
    pub promptpay_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAttemptEntity {
    /// Unknown stored text is read as pending so it is never treated as settled.
    pub fn payment_status(&self) -> PaymentStatus {
        PaymentStatus::from_str(&self.status).unwrap_or(PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_attempts)]
pub struct InsertPaymentAttemptEntity {
    pub reference: String,
    pub rail: String,
    pub amount: BigDecimal,
    pub user_id: Uuid,
    pub project_id: Option<i64>,
    pub status: String,
    pub status_label: String,
    pub qr_image: String,
    pub promptpay_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
