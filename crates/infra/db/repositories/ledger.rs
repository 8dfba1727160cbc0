use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::{
    dsl::exists,
    insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    select, update,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPool,
        schema::{fundraising_projects, payment_attempts, payment_records, user_balances},
    },
};
use domain::{
    entities::{
        payment_records::{InsertPaymentRecordEntity, PaymentRecordEntity},
        user_balances::UserBalanceEntity,
    },
    repositories::ledger::{LedgerRepository, LedgerWriteOutcome},
    value_objects::{
        enums::payment_statuses::PaymentStatus, project_progress::apply_credit,
        verified_payments::LedgerEntry,
    },
};

const REFERENCE_UNIQUE_CONSTRAINT: &str = "payment_records_reference_key";

pub struct LedgerPostgres {
    db_pool: Arc<PgPool>,
}

impl LedgerPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl LedgerRepository for LedgerPostgres {
    async fn is_reference_used(&self, reference: &str) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let used = select(exists(
            payment_records::table.filter(payment_records::reference.eq(reference)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(used)
    }

    async fn record_payment(&self, entry: LedgerEntry) -> Result<LedgerWriteOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let new_record = InsertPaymentRecordEntity::from(&entry);

        let result = conn.transaction::<PaymentRecordEntity, anyhow::Error, _>(|tx| {
            let record = insert_into(payment_records::table)
                .values(&new_record)
                .returning(PaymentRecordEntity::as_select())
                .get_result::<PaymentRecordEntity>(tx)?;

            // UPDATE holds the row lock until commit, so concurrent credits
            // to the same user queue up instead of losing an increment.
            let credited = update(user_balances::table.find(entry.user_id))
                .set((
                    user_balances::balance.eq(user_balances::balance + entry.amount.clone()),
                    user_balances::updated_at.eq(Utc::now()),
                ))
                .execute(tx)?;
            if credited == 0 {
                return Err(anyhow!("no balance row for user {}", entry.user_id));
            }

            if let Some(project_id) = entry.project_id {
                let (current_amount, target_amount) = fundraising_projects::table
                    .find(project_id)
                    .select((
                        fundraising_projects::current_amount,
                        fundraising_projects::target_amount,
                    ))
                    .for_update()
                    .first::<(BigDecimal, BigDecimal)>(tx)
                    .optional()?
                    .ok_or_else(|| anyhow!("fundraising project {} not found", project_id))?;

                let progress = apply_credit(&current_amount, &target_amount, &entry.amount);

                update(fundraising_projects::table.find(project_id))
                    .set((
                        fundraising_projects::current_amount.eq(progress.current_amount),
                        fundraising_projects::progress_percentage
                            .eq(progress.progress_percentage),
                        fundraising_projects::updated_at.eq(Utc::now()),
                    ))
                    .execute(tx)?;
            }

            // Whichever rail records the reference first settles the QR
            // attempt carrying it; bank and card references match nothing.
            update(
                payment_attempts::table
                    .filter(payment_attempts::reference.eq(&entry.reference))
                    .filter(payment_attempts::status.eq(PaymentStatus::Pending.as_str())),
            )
            .set((
                payment_attempts::status.eq(PaymentStatus::Completed.as_str()),
                payment_attempts::status_label.eq(&entry.status_label),
                payment_attempts::updated_at.eq(Utc::now()),
            ))
            .execute(tx)?;

            Ok(record)
        });

        match result {
            Ok(record) => Ok(LedgerWriteOutcome::Committed(record)),
            Err(err) if is_duplicate_reference(&err) => {
                warn!(
                    reference = %entry.reference,
                    "ledger: reference already recorded, transaction rolled back"
                );
                Ok(LedgerWriteOutcome::DuplicateReference)
            }
            Err(err) => Err(err),
        }
    }

    async fn project_exists(&self, project_id: i64) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let found = select(exists(fundraising_projects::table.find(project_id)))
            .get_result::<bool>(&mut conn)?;

        Ok(found)
    }

    async fn find_balance(&self, user_id: Uuid) -> Result<Option<UserBalanceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let balance = user_balances::table
            .find(user_id)
            .select(UserBalanceEntity::as_select())
            .first::<UserBalanceEntity>(&mut conn)
            .optional()?;

        Ok(balance)
    }

    async fn list_recent_payments(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PaymentRecordEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let records = payment_records::table
            .filter(payment_records::user_id.eq(user_id))
            .order(payment_records::created_at.desc())
            .limit(limit)
            .select(PaymentRecordEntity::as_select())
            .load::<PaymentRecordEntity>(&mut conn)?;

        Ok(records)
    }
}

fn is_duplicate_reference(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<DieselError>(),
        Some(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
            if info.constraint_name() == Some(REFERENCE_UNIQUE_CONSTRAINT)
    )
}
