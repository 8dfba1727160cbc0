use std::sync::Arc;

use axum::http::StatusCode;
use bigdecimal::{BigDecimal, Zero};
use crates::{
    domain::{
        entities::payment_records::PaymentRecordEntity,
        repositories::ledger::{LedgerRepository, LedgerWriteOutcome},
        value_objects::verified_payments::LedgerEntry,
    },
    realtime::donation_feed::{DonationEvent, DonationFeed},
};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    InvalidPayload(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("slip could not be read")]
    InvalidSlip,
    #[error("wrong receiver account")]
    InvalidReceiver,
    #[error("payment could not be verified with the gateway")]
    VerificationFailed,
    #[error("slip already used")]
    AlreadyUsed,
    #[error("payer email is not registered")]
    UnknownPayer,
    #[error("payment not found")]
    AttemptNotFound,
    #[error("QR code expired")]
    QrExpired,
    #[error("payment provider returned incomplete data: {0}")]
    InsufficientUpstreamData(String),
    #[error("ledger transaction failed: {0}")]
    TransactionFailure(anyhow::Error),
    #[error("payment provider unavailable: {0}")]
    Upstream(anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            PaymentError::Unauthorized => StatusCode::UNAUTHORIZED,
            PaymentError::InvalidSlip
            | PaymentError::InvalidReceiver
            | PaymentError::VerificationFailed
            | PaymentError::UnknownPayer => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::AlreadyUsed => StatusCode::CONFLICT,
            PaymentError::AttemptNotFound => StatusCode::NOT_FOUND,
            PaymentError::QrExpired => StatusCode::GONE,
            PaymentError::InsufficientUpstreamData(_) | PaymentError::Upstream(_) => {
                StatusCode::BAD_GATEWAY
            }
            PaymentError::TransactionFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show the payer. Never carries database or vendor detail.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::InvalidPayload(msg) => msg.clone(),
            PaymentError::InsufficientUpstreamData(_) => {
                "payment provider returned incomplete data".to_string()
            }
            PaymentError::TransactionFailure(_) => "internal server error".to_string(),
            PaymentError::Upstream(_) => "payment provider unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

pub type PaymentResult<T> = std::result::Result<T, PaymentError>;

/// The single write path into the ledger, shared by every rail.
pub struct LedgerWriter<L>
where
    L: LedgerRepository + Send + Sync + 'static,
{
    ledger_repo: Arc<L>,
    feed: Arc<dyn DonationFeed>,
}

impl<L> LedgerWriter<L>
where
    L: LedgerRepository + Send + Sync + 'static,
{
    pub fn new(ledger_repo: Arc<L>, feed: Arc<dyn DonationFeed>) -> Self {
        Self { ledger_repo, feed }
    }

    /// Advisory lookup; the unique constraint behind [`Self::commit`] is what
    /// actually prevents a second credit.
    pub async fn is_already_used(&self, reference: &str) -> PaymentResult<bool> {
        self.ledger_repo
            .is_reference_used(reference)
            .await
            .map_err(|err| {
                error!(
                    reference,
                    db_error = ?err,
                    "ledger: reference lookup failed"
                );
                PaymentError::TransactionFailure(err)
            })
    }

    pub async fn ensure_unused(&self, reference: &str) -> PaymentResult<()> {
        if self.is_already_used(reference).await? {
            info!(reference, "ledger: reference already recorded");
            return Err(PaymentError::AlreadyUsed);
        }
        Ok(())
    }

    async fn project_exists(&self, project_id: i64) -> PaymentResult<bool> {
        self.ledger_repo
            .project_exists(project_id)
            .await
            .map_err(|err| {
                error!(project_id, db_error = ?err, "ledger: project lookup failed");
                PaymentError::TransactionFailure(err)
            })
    }

    /// For earmarks guessed from free text: an id naming no project falls back
    /// to the general fund instead of failing a payment that already happened.
    pub async fn resolve_earmark(
        &self,
        reference: &str,
        project_id: Option<i64>,
    ) -> PaymentResult<Option<i64>> {
        let Some(project_id) = project_id else {
            return Ok(None);
        };
        if self.project_exists(project_id).await? {
            return Ok(Some(project_id));
        }
        warn!(
            reference,
            project_id,
            "ledger: earmark names no fundraising project, crediting general fund"
        );
        Ok(None)
    }

    /// For a `project_id` the donor chose explicitly.
    pub async fn ensure_project(&self, project_id: i64) -> PaymentResult<()> {
        if project_id <= 0 || !self.project_exists(project_id).await? {
            info!(project_id, "ledger: unknown fundraising project requested");
            return Err(PaymentError::InvalidPayload(
                "project_id is invalid".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn commit(&self, entry: LedgerEntry) -> PaymentResult<PaymentRecordEntity> {
        if entry.amount <= BigDecimal::zero() {
            warn!(
                reference = %entry.reference,
                amount = %entry.amount,
                "ledger: refusing non-positive amount"
            );
            return Err(PaymentError::InvalidPayload(
                "amount must be greater than zero".to_string(),
            ));
        }

        let reference = entry.reference.clone();
        let amount = entry.amount.clone();
        let user_id = entry.user_id;
        let project_id = entry.project_id;
        let rail = entry.rail;
        let raw_payload = entry.raw_payload.clone();

        match self.ledger_repo.record_payment(entry).await {
            Ok(LedgerWriteOutcome::Committed(record)) => {
                info!(
                    reference = %reference,
                    amount = %amount,
                    %user_id,
                    project_id = ?project_id,
                    rail = %rail,
                    payment_id = %record.id,
                    "ledger: payment committed"
                );
                self.feed.publish(DonationEvent::received(amount));
                Ok(record)
            }
            Ok(LedgerWriteOutcome::DuplicateReference) => {
                warn!(
                    reference = %reference,
                    %user_id,
                    "ledger: concurrent write lost the race for this reference"
                );
                Err(PaymentError::AlreadyUsed)
            }
            Err(err) => {
                error!(
                    reference = %reference,
                    amount = %amount,
                    %user_id,
                    project_id = ?project_id,
                    rail = %rail,
                    raw_payload = %raw_payload,
                    db_error = ?err,
                    "ledger: transaction rolled back"
                );
                Err(PaymentError::TransactionFailure(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::testing::{InMemoryLedger, ledger_entry};
    use bigdecimal::BigDecimal;
    use crates::{
        domain::repositories::ledger::MockLedgerRepository,
        realtime::donation_feed::{MockDonationFeed, NoopDonationFeed},
    };
    use uuid::Uuid;

    fn silent_feed() -> Arc<MockDonationFeed> {
        let mut feed = MockDonationFeed::new();
        feed.expect_publish().never();
        Arc::new(feed)
    }

    #[test]
    fn errors_map_to_http_statuses_and_safe_messages() {
        let cases = [
            (PaymentError::InvalidPayload("bad".into()), 400, "bad"),
            (PaymentError::Unauthorized, 401, "unauthorized"),
            (PaymentError::InvalidSlip, 422, "slip could not be read"),
            (PaymentError::InvalidReceiver, 422, "wrong receiver account"),
            (PaymentError::AlreadyUsed, 409, "slip already used"),
            (PaymentError::AttemptNotFound, 404, "payment not found"),
            (PaymentError::QrExpired, 410, "QR code expired"),
            (
                PaymentError::TransactionFailure(anyhow::anyhow!("deadlock on user_balances")),
                500,
                "internal server error",
            ),
            (
                PaymentError::Upstream(anyhow::anyhow!("connect timeout 10.0.0.3")),
                502,
                "payment provider unavailable",
            ),
            (
                PaymentError::InsufficientUpstreamData("no amount".into()),
                502,
                "payment provider returned incomplete data",
            ),
        ];

        for (err, status, message) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{err:?}");
            assert_eq!(err.user_message(), message);
        }
    }

    #[tokio::test]
    async fn commit_publishes_after_success() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));

        let mut feed = MockDonationFeed::new();
        feed.expect_publish()
            .withf(|event| event.amount == BigDecimal::from(500))
            .times(1)
            .return_const(());

        let writer = LedgerWriter::new(Arc::clone(&ledger), Arc::new(feed));
        let record = writer.commit(ledger_entry("TXN1", 500, user_id)).await.unwrap();

        assert_eq!(record.reference, "TXN1");
        assert_eq!(ledger.balance_of(user_id), BigDecimal::from(500));
    }

    #[tokio::test]
    async fn duplicate_reference_is_already_used_and_not_published() {
        let user_id = Uuid::new_v4();
        let mut repo = MockLedgerRepository::new();
        repo.expect_record_payment()
            .times(1)
            .returning(|_| Ok(LedgerWriteOutcome::DuplicateReference));

        let writer = LedgerWriter::new(Arc::new(repo), silent_feed());
        let result = writer.commit(ledger_entry("TXN1", 500, user_id)).await;

        assert!(matches!(result, Err(PaymentError::AlreadyUsed)));
    }

    #[tokio::test]
    async fn repository_failure_is_transaction_failure() {
        let mut repo = MockLedgerRepository::new();
        repo.expect_record_payment()
            .returning(|_| Err(anyhow::anyhow!("no balance row")));

        let writer = LedgerWriter::new(Arc::new(repo), silent_feed());
        let result = writer
            .commit(ledger_entry("TXN1", 500, Uuid::new_v4()))
            .await;

        assert!(matches!(result, Err(PaymentError::TransactionFailure(_))));
    }

    #[tokio::test]
    async fn non_positive_amount_never_reaches_the_repository() {
        let mut repo = MockLedgerRepository::new();
        repo.expect_record_payment().never();

        let writer = LedgerWriter::new(Arc::new(repo), silent_feed());
        let result = writer.commit(ledger_entry("TXN0", 0, Uuid::new_v4())).await;

        assert!(matches!(result, Err(PaymentError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn guard_reports_recorded_reference() {
        let mut repo = MockLedgerRepository::new();
        repo.expect_is_reference_used()
            .withf(|reference| reference == "TXN1")
            .returning(|_| Ok(true));

        let writer = LedgerWriter::new(Arc::new(repo), silent_feed());

        assert!(matches!(
            writer.ensure_unused("TXN1").await,
            Err(PaymentError::AlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn unknown_earmark_falls_back_to_general_fund() {
        let ledger = Arc::new(InMemoryLedger::default());
        ledger.add_project(7, 0, 1000);
        let writer = LedgerWriter::new(Arc::clone(&ledger), silent_feed());

        assert_eq!(writer.resolve_earmark("TXN1", Some(7)).await.unwrap(), Some(7));
        assert_eq!(writer.resolve_earmark("TXN1", Some(500)).await.unwrap(), None);
        assert_eq!(writer.resolve_earmark("TXN1", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn explicit_unknown_project_is_invalid_payload() {
        let ledger = Arc::new(InMemoryLedger::default());
        ledger.add_project(7, 0, 1000);
        let writer = LedgerWriter::new(Arc::clone(&ledger), silent_feed());

        assert!(writer.ensure_project(7).await.is_ok());
        assert!(matches!(
            writer.ensure_project(8).await,
            Err(PaymentError::InvalidPayload(_))
        ));
        assert!(matches!(
            writer.ensure_project(0).await,
            Err(PaymentError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn sequential_resubmission_credits_once() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 100));
        let writer = LedgerWriter::new(Arc::clone(&ledger), Arc::new(NoopDonationFeed));

        writer.commit(ledger_entry("TXN1", 500, user_id)).await.unwrap();
        let second = writer.commit(ledger_entry("TXN1", 500, user_id)).await;

        assert!(matches!(second, Err(PaymentError::AlreadyUsed)));
        assert_eq!(ledger.record_count(), 1);
        assert_eq!(ledger.balance_of(user_id), BigDecimal::from(600));
    }

    #[tokio::test]
    async fn concurrent_submissions_of_one_reference_credit_once() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));
        let writer = Arc::new(LedgerWriter::new(Arc::clone(&ledger), Arc::new(NoopDonationFeed)));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let writer = Arc::clone(&writer);
                tokio::spawn(async move { writer.commit(ledger_entry("TXN1", 500, user_id)).await })
            })
            .collect();

        let mut committed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(PaymentError::AlreadyUsed) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(committed, 1);
        assert_eq!(rejected, 15);
        assert_eq!(ledger.balance_of(user_id), BigDecimal::from(500));
    }

    #[tokio::test]
    async fn failed_write_leaves_no_record_and_no_credit() {
        let user_id = Uuid::new_v4();
        // No balance row: the write aborts after the insert would have happened.
        let ledger = Arc::new(InMemoryLedger::default());
        let writer = LedgerWriter::new(Arc::clone(&ledger), silent_feed());

        let result = writer.commit(ledger_entry("TXN1", 500, user_id)).await;

        assert!(matches!(result, Err(PaymentError::TransactionFailure(_))));
        assert_eq!(ledger.record_count(), 0);
        assert!(!writer.is_already_used("TXN1").await.unwrap());
    }
}
