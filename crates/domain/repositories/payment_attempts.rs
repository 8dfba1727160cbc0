use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payment_attempts::{InsertPaymentAttemptEntity, PaymentAttemptEntity},
    value_objects::enums::payment_statuses::PaymentStatus,
};

#[automock]
#[async_trait]
pub trait PaymentAttemptRepository {
    async fn create_attempt(&self, attempt: InsertPaymentAttemptEntity) -> Result<Uuid>;

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentAttemptEntity>>;

    /// Moves a pending attempt to `status`. Returns false when the attempt was
    /// not pending any more (or does not exist); nothing is written then.
    async fn transition_pending(
        &self,
        reference: &str,
        status: PaymentStatus,
        status_label: &str,
    ) -> Result<bool>;

    /// Fails every pending attempt whose deadline is before `cutoff`.
    async fn expire_pending_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
