use std::sync::Arc;

use bigdecimal::BigDecimal;
use crates::domain::{
    repositories::ledger::LedgerRepository,
    value_objects::donations::{DonationSummaryDto, PaymentRecordDto},
};
use tracing::{error, info};
use uuid::Uuid;

use super::ledger::{PaymentError, PaymentResult};

const RECENT_PAYMENTS_LIMIT: i64 = 20;

pub struct DonationUseCase<L>
where
    L: LedgerRepository + Send + Sync + 'static,
{
    ledger_repo: Arc<L>,
}

impl<L> DonationUseCase<L>
where
    L: LedgerRepository + Send + Sync + 'static,
{
    pub fn new(ledger_repo: Arc<L>) -> Self {
        Self { ledger_repo }
    }

    pub async fn summary(&self, user_id: Uuid) -> PaymentResult<DonationSummaryDto> {
        info!(%user_id, "donations: loading summary");

        let balance = self
            .ledger_repo
            .find_balance(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "donations: failed to load balance");
                PaymentError::TransactionFailure(err)
            })?
            .map(|row| row.balance)
            .unwrap_or_else(|| BigDecimal::from(0));

        let recent_payments = self
            .ledger_repo
            .list_recent_payments(user_id, RECENT_PAYMENTS_LIMIT)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "donations: failed to list payments");
                PaymentError::TransactionFailure(err)
            })?
            .into_iter()
            .map(PaymentRecordDto::from)
            .collect();

        Ok(DonationSummaryDto {
            balance,
            recent_payments,
        })
    }
}
