use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{payment_records::PaymentRecordEntity, user_balances::UserBalanceEntity},
    value_objects::verified_payments::LedgerEntry,
};

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerWriteOutcome {
    Committed(PaymentRecordEntity),
    /// The reference already has a payment record; nothing was written.
    DuplicateReference,
}

#[automock]
#[async_trait]
pub trait LedgerRepository {
    async fn is_reference_used(&self, reference: &str) -> Result<bool>;

    /// Inserts the payment record, credits the balance, advances the earmarked
    /// project and settles a pending QR attempt with the same reference, all in
    /// one transaction. Any `Err` means the transaction was rolled back.
    async fn record_payment(&self, entry: LedgerEntry) -> Result<LedgerWriteOutcome>;

    async fn project_exists(&self, project_id: i64) -> Result<bool>;

    async fn find_balance(&self, user_id: Uuid) -> Result<Option<UserBalanceEntity>>;

    async fn list_recent_payments(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PaymentRecordEntity>>;
}
