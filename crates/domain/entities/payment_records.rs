use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::payment_statuses::PaymentStatus, verified_payments::LedgerEntry,
};
use crate::infra::db::postgres::schema::payment_records;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_records)]
pub struct PaymentRecordEntity {
    pub id: Uuid,
    pub status: String,
    pub status_label: String,
    pub amount: BigDecimal,
    pub total: BigDecimal,
    pub reference: String,
    pub rail: String,
    pub payer_identifier: Option<String>,
    pub user_id: Option<Uuid>,
    pub project_id: Option<i64>,
    pub raw_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_records)]
pub struct InsertPaymentRecordEntity {
    pub status: String,
    pub status_label: String,
    pub amount: BigDecimal,
    pub total: BigDecimal,
    pub reference: String,
    pub rail: String,
    pub payer_identifier: Option<String>,
    pub user_id: Option<Uuid>,
    pub project_id: Option<i64>,
    pub raw_payload: serde_json::Value,
    pub payment_date: DateTime<Utc>,
}

impl From<&LedgerEntry> for InsertPaymentRecordEntity {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            status: PaymentStatus::Completed.to_string(),
            status_label: entry.status_label.clone(),
            amount: entry.amount.clone(),
            total: entry.total.clone(),
            reference: entry.reference.clone(),
            rail: entry.rail.to_string(),
            payer_identifier: entry.payer_identifier.clone(),
            user_id: Some(entry.user_id),
            project_id: entry.project_id,
            raw_payload: entry.raw_payload.clone(),
            payment_date: entry.payment_date,
        }
    }
}
