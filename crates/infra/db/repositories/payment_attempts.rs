use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPool, schema::payment_attempts},
};
use domain::{
    entities::payment_attempts::{InsertPaymentAttemptEntity, PaymentAttemptEntity},
    repositories::payment_attempts::PaymentAttemptRepository,
    value_objects::enums::payment_statuses::PaymentStatus,
};

pub struct PaymentAttemptPostgres {
    db_pool: Arc<PgPool>,
}

impl PaymentAttemptPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentAttemptRepository for PaymentAttemptPostgres {
    async fn create_attempt(&self, attempt: InsertPaymentAttemptEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let attempt_id = insert_into(payment_attempts::table)
            .values(&attempt)
            .returning(payment_attempts::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(attempt_id)
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentAttemptEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let attempt = payment_attempts::table
            .filter(payment_attempts::reference.eq(reference))
            .select(PaymentAttemptEntity::as_select())
            .first::<PaymentAttemptEntity>(&mut conn)
            .optional()?;

        Ok(attempt)
    }

    async fn transition_pending(
        &self,
        reference: &str,
        status: PaymentStatus,
        status_label: &str,
    ) -> Result<bool> {
        if !PaymentStatus::Pending.can_transition_to(status) {
            return Ok(false);
        }

        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The status filter makes the transition a compare-and-set; a second
        // caller finds nothing to update.
        let updated = update(
            payment_attempts::table
                .filter(payment_attempts::reference.eq(reference))
                .filter(payment_attempts::status.eq(PaymentStatus::Pending.as_str())),
        )
        .set((
            payment_attempts::status.eq(status.as_str()),
            payment_attempts::status_label.eq(status_label),
            payment_attempts::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(updated == 1)
    }

    async fn expire_pending_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let expired = update(
            payment_attempts::table
                .filter(payment_attempts::status.eq(PaymentStatus::Pending.as_str()))
                .filter(payment_attempts::expires_at.lt(cutoff)),
        )
        .set((
            payment_attempts::status.eq(PaymentStatus::Failed.as_str()),
            payment_attempts::status_label.eq("expired"),
            payment_attempts::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(expired)
    }
}
