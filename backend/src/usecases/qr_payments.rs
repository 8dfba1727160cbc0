use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use crates::domain::{
    entities::payment_attempts::{InsertPaymentAttemptEntity, PaymentAttemptEntity},
    repositories::{ledger::LedgerRepository, payment_attempts::PaymentAttemptRepository},
    value_objects::{
        enums::{
            gateway_statuses::GatewayStatus, payment_rails::PaymentRail,
            payment_statuses::PaymentStatus,
        },
        qr_payments::{
            CreateQrPaymentModel, QR_POLL_INTERVAL_SECS, QrPaymentDto, QrPaymentStatusDto,
            QrPollStatus, is_qr_expired, qr_expires_at,
        },
        verified_payments::LedgerEntry,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    gateway_verification::{GatewayVerifier, PaymentGateway},
    ledger::{LedgerWriter, PaymentError, PaymentResult},
};

pub struct QrPaymentUseCase<L, A, G>
where
    L: LedgerRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    ledger: Arc<LedgerWriter<L>>,
    attempt_repo: Arc<A>,
    verifier: Arc<GatewayVerifier<G>>,
}

impl<L, A, G> QrPaymentUseCase<L, A, G>
where
    L: LedgerRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(
        ledger: Arc<LedgerWriter<L>>,
        attempt_repo: Arc<A>,
        verifier: Arc<GatewayVerifier<G>>,
    ) -> Self {
        Self {
            ledger,
            attempt_repo,
            verifier,
        }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        model: CreateQrPaymentModel,
    ) -> PaymentResult<QrPaymentDto> {
        if model.amount <= BigDecimal::zero() {
            return Err(PaymentError::InvalidPayload(
                "amount must be greater than zero".to_string(),
            ));
        }
        if let Some(project_id) = model.project_id {
            self.ledger.ensure_project(project_id).await?;
        }

        let amount = model.amount.round(2);
        let order_no = Uuid::new_v4().simple().to_string();
        // The gateway echoes this back as product_detail on its webhook.
        let description = match model.project_id {
            Some(project_id) => format!("donation project_id={project_id}"),
            None => "donation".to_string(),
        };

        let qr = self
            .verifier
            .gateway()
            .create_qr(&amount, &order_no, &description)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    amount = %amount,
                    gateway_error = ?err,
                    "qr payments: gateway could not mint a QR"
                );
                PaymentError::Upstream(err)
            })?;

        let created_at = Utc::now();
        let expires_at = qr_expires_at(created_at);

        self.attempt_repo
            .create_attempt(InsertPaymentAttemptEntity {
                reference: qr.reference.clone(),
                rail: PaymentRail::Qr.to_string(),
                amount: amount.clone(),
                user_id,
                project_id: model.project_id,
                status: PaymentStatus::Pending.to_string(),
                status_label: "awaiting payment".to_string(),
                qr_image: qr.qr_image.clone(),
                promptpay_id: qr.promptpay_id.clone(),
                created_at,
                expires_at,
            })
            .await
            .map_err(|err| {
                error!(
                    reference = %qr.reference,
                    amount = %amount,
                    %user_id,
                    db_error = ?err,
                    "qr payments: failed to store pending attempt"
                );
                PaymentError::TransactionFailure(err)
            })?;

        info!(
            reference = %qr.reference,
            amount = %amount,
            %user_id,
            %expires_at,
            "qr payments: QR minted"
        );

        Ok(QrPaymentDto {
            reference: qr.reference,
            qr_image: qr.qr_image,
            promptpay_id: qr.promptpay_id,
            amount,
            created_at,
            expires_at,
            poll_interval_secs: QR_POLL_INTERVAL_SECS,
        })
    }

    pub async fn status(&self, user_id: Uuid, reference: &str) -> PaymentResult<QrPaymentStatusDto> {
        self.status_at(user_id, reference, Utc::now()).await
    }

    pub(crate) async fn status_at(
        &self,
        user_id: Uuid,
        reference: &str,
        now: DateTime<Utc>,
    ) -> PaymentResult<QrPaymentStatusDto> {
        let attempt = self.find_owned_attempt(user_id, reference).await?;
        let respond = |status| QrPaymentStatusDto {
            reference: attempt.reference.clone(),
            status,
            expires_at: attempt.expires_at,
        };

        let current = attempt.payment_status();
        // The webhook may still credit an attempt closed here; the ledger decides.
        if matches!(current, PaymentStatus::Cancelled | PaymentStatus::Failed)
            && self.ledger.is_already_used(reference).await?
        {
            info!(
                reference,
                status = %current,
                "qr payments: closed attempt was paid and credited"
            );
            return Ok(respond(QrPollStatus::Success));
        }
        if current.is_terminal() {
            return Ok(respond(QrPollStatus::from_attempt_status(current)));
        }

        // Past the deadline the client stops; the attempt stays pending for the sweep.
        if is_qr_expired(attempt.expires_at, now) {
            return Ok(respond(QrPollStatus::Expired));
        }

        let order = match self.verifier.query_status(reference).await {
            Ok(order) => order,
            Err(_) => return Ok(respond(QrPollStatus::Pending)),
        };

        match order.status() {
            GatewayStatus::Pending => Ok(respond(QrPollStatus::Pending)),
            GatewayStatus::Failure => {
                self.transition(reference, PaymentStatus::Failed, "payment failed")
                    .await?;
                Ok(respond(QrPollStatus::Fail))
            }
            GatewayStatus::Success => {
                let payment = self
                    .verifier
                    .verified_payment(order, Some(&attempt.amount), None)?;
                let entry = LedgerEntry::from_verified(
                    payment,
                    PaymentRail::Qr,
                    attempt.user_id,
                    attempt.project_id,
                );

                match self.ledger.commit(entry).await {
                    Ok(_) | Err(PaymentError::AlreadyUsed) => Ok(respond(QrPollStatus::Success)),
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// Idempotent: only a pending attempt changes, anything else is left alone.
    pub async fn cancel(&self, user_id: Uuid, reference: &str) -> PaymentResult<()> {
        self.cancel_at(user_id, reference, Utc::now()).await
    }

    pub(crate) async fn cancel_at(
        &self,
        user_id: Uuid,
        reference: &str,
        now: DateTime<Utc>,
    ) -> PaymentResult<()> {
        let attempt = self.find_owned_attempt(user_id, reference).await?;

        if attempt.payment_status() != PaymentStatus::Pending {
            info!(
                reference,
                status = %attempt.status,
                "qr payments: cancel ignored, attempt already settled"
            );
            return Ok(());
        }

        // Left pending for the sweep, like an expired poll.
        if is_qr_expired(attempt.expires_at, now) {
            info!(reference, %user_id, "qr payments: cancel refused, QR already expired");
            return Err(PaymentError::QrExpired);
        }

        if !self
            .transition(reference, PaymentStatus::Cancelled, "cancelled by donor")
            .await?
        {
            return Ok(());
        }

        if let Err(err) = self.verifier.gateway().cancel_qr(reference).await {
            warn!(
                reference,
                gateway_error = ?err,
                "qr payments: gateway cancel failed, local attempt already cancelled"
            );
        }

        info!(reference, %user_id, "qr payments: attempt cancelled");
        Ok(())
    }

    pub async fn expire_stale(&self, now: DateTime<Utc>) -> PaymentResult<usize> {
        expire_stale_attempts(self.attempt_repo.as_ref(), now).await
    }

    async fn find_owned_attempt(
        &self,
        user_id: Uuid,
        reference: &str,
    ) -> PaymentResult<PaymentAttemptEntity> {
        let attempt = self
            .attempt_repo
            .find_by_reference(reference)
            .await
            .map_err(|err| {
                error!(reference, db_error = ?err, "qr payments: attempt lookup failed");
                PaymentError::TransactionFailure(err)
            })?
            .ok_or(PaymentError::AttemptNotFound)?;

        // Someone else's reference looks exactly like an unknown one.
        if attempt.user_id != user_id {
            warn!(reference, %user_id, "qr payments: attempt belongs to another user");
            return Err(PaymentError::AttemptNotFound);
        }

        Ok(attempt)
    }

    async fn transition(
        &self,
        reference: &str,
        status: PaymentStatus,
        label: &str,
    ) -> PaymentResult<bool> {
        let moved = self
            .attempt_repo
            .transition_pending(reference, status, label)
            .await
            .map_err(|err| {
                error!(
                    reference,
                    status = %status,
                    db_error = ?err,
                    "qr payments: attempt transition failed"
                );
                PaymentError::TransactionFailure(err)
            })?;

        if !moved {
            info!(reference, status = %status, "qr payments: attempt no longer pending");
        }
        Ok(moved)
    }
}

/// Fails every pending attempt past its deadline. Shared with the background sweep.
pub async fn expire_stale_attempts<A>(attempt_repo: &A, now: DateTime<Utc>) -> PaymentResult<usize>
where
    A: PaymentAttemptRepository + Send + Sync,
{
    let expired = attempt_repo
        .expire_pending_before(now)
        .await
        .map_err(|err| {
            error!(db_error = ?err, "qr payments: expiry sweep failed");
            PaymentError::TransactionFailure(err)
        })?;

    if expired > 0 {
        info!(expired, "qr payments: stale attempts expired");
    }
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::{
        gateway_verification::{MockPaymentGateway, tests::order},
        testing::{InMemoryLedger, ledger_entry},
    };
    use chrono::Duration;
    use crates::{
        domain::{
            repositories::payment_attempts::MockPaymentAttemptRepository,
            value_objects::qr_payments::GatewayQrCode,
        },
        realtime::donation_feed::NoopDonationFeed,
    };

    fn attempt(user_id: Uuid, status: PaymentStatus, created_at: DateTime<Utc>) -> PaymentAttemptEntity {
        PaymentAttemptEntity {
            id: Uuid::new_v4(),
            reference: "QR-1".to_string(),
            rail: "qr".to_string(),
            amount: BigDecimal::from(250),
            user_id,
            project_id: None,
            status: status.to_string(),
            status_label: "awaiting payment".to_string(),
            qr_image: "data:image/png;base64,AAAA".to_string(),
            promptpay_id: "0994000123456".to_string(),
            created_at,
            expires_at: qr_expires_at(created_at),
            updated_at: created_at,
        }
    }

    fn attempts_returning(found: PaymentAttemptEntity) -> MockPaymentAttemptRepository {
        let mut repo = MockPaymentAttemptRepository::new();
        repo.expect_find_by_reference()
            .returning(move |_| Ok(Some(found.clone())));
        repo
    }

    fn usecase(
        ledger: &Arc<InMemoryLedger>,
        attempts: MockPaymentAttemptRepository,
        gateway: MockPaymentGateway,
    ) -> QrPaymentUseCase<InMemoryLedger, MockPaymentAttemptRepository, MockPaymentGateway> {
        let writer = LedgerWriter::new(Arc::clone(ledger), Arc::new(NoopDonationFeed));
        let verifier = GatewayVerifier::new(Arc::new(gateway), "hook-secret".to_string());
        QrPaymentUseCase::new(Arc::new(writer), Arc::new(attempts), Arc::new(verifier))
    }

    #[tokio::test]
    async fn create_stores_pending_attempt_with_fifteen_minute_deadline() {
        let user_id = Uuid::new_v4();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_qr()
            .withf(|amount, _, description| {
                *amount == BigDecimal::from(250) && description.contains("project_id=7")
            })
            .returning(|_, _, _| {
                Ok(GatewayQrCode {
                    reference: "QR-1".to_string(),
                    qr_image: "data:image/png;base64,AAAA".to_string(),
                    promptpay_id: "0994000123456".to_string(),
                })
            });

        let mut attempts = MockPaymentAttemptRepository::new();
        attempts
            .expect_create_attempt()
            .withf(move |attempt| {
                attempt.reference == "QR-1"
                    && attempt.status == "pending"
                    && attempt.user_id == user_id
                    && attempt.project_id == Some(7)
                    && attempt.expires_at - attempt.created_at == Duration::minutes(15)
            })
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));

        let ledger = Arc::new(InMemoryLedger::default());
        ledger.add_project(7, 0, 1000);
        let dto = usecase(&ledger, attempts, gateway)
            .create(
                user_id,
                CreateQrPaymentModel {
                    amount: BigDecimal::from(250),
                    project_id: Some(7),
                },
            )
            .await
            .unwrap();

        assert_eq!(dto.reference, "QR-1");
        assert_eq!(dto.poll_interval_secs, 3);
        assert_eq!(dto.expires_at - dto.created_at, Duration::minutes(15));
    }

    #[tokio::test]
    async fn create_rejects_non_positive_amount_before_calling_gateway() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_qr().never();

        let ledger = Arc::new(InMemoryLedger::default());
        let result = usecase(&ledger, MockPaymentAttemptRepository::new(), gateway)
            .create(
                Uuid::new_v4(),
                CreateQrPaymentModel {
                    amount: BigDecimal::from(0),
                    project_id: None,
                },
            )
            .await;

        assert!(matches!(result, Err(PaymentError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn paid_qr_is_credited_once_and_reported_success() {
        let user_id = Uuid::new_v4();
        let created_at = Utc::now();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_order_status()
            .returning(|reference| Ok(order(reference, "CP", "Paid", Some(250))));

        let usecase = usecase(
            &ledger,
            attempts_returning(attempt(user_id, PaymentStatus::Pending, created_at)),
            gateway,
        );

        let first = usecase
            .status_at(user_id, "QR-1", created_at + Duration::minutes(1))
            .await
            .unwrap();
        // A second poll before the stored row is re-read must not credit again.
        let second = usecase
            .status_at(user_id, "QR-1", created_at + Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(first.status, QrPollStatus::Success);
        assert_eq!(second.status, QrPollStatus::Success);
        assert_eq!(ledger.record_count(), 1);
        assert_eq!(ledger.balance_of(user_id), BigDecimal::from(250));
        assert_eq!(ledger.record("QR-1").unwrap().rail, "qr");
    }

    #[tokio::test]
    async fn expired_qr_stays_pending_and_is_never_completed() {
        let user_id = Uuid::new_v4();
        let created_at = Utc::now();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_order_status().never();

        let mut attempts = attempts_returning(attempt(user_id, PaymentStatus::Pending, created_at));
        attempts.expect_transition_pending().never();

        let status = usecase(&ledger, attempts, gateway)
            .status_at(
                user_id,
                "QR-1",
                created_at + Duration::minutes(15) + Duration::seconds(1),
            )
            .await
            .unwrap();

        assert_eq!(status.status, QrPollStatus::Expired);
        assert_eq!(ledger.record_count(), 0);
    }

    #[tokio::test]
    async fn failed_gateway_order_marks_attempt_failed() {
        let user_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_order_status()
            .returning(|reference| Ok(order(reference, "N", "FAILED", None)));

        let mut attempts = attempts_returning(attempt(user_id, PaymentStatus::Pending, created_at));
        attempts
            .expect_transition_pending()
            .withf(|reference, status, _| reference == "QR-1" && *status == PaymentStatus::Failed)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let ledger = Arc::new(InMemoryLedger::default());
        let status = usecase(&ledger, attempts, gateway)
            .status_at(user_id, "QR-1", created_at + Duration::minutes(2))
            .await
            .unwrap();

        assert_eq!(status.status, QrPollStatus::Fail);
    }

    #[tokio::test]
    async fn terminal_attempts_answer_without_calling_gateway() {
        let user_id = Uuid::new_v4();
        let created_at = Utc::now();

        for (stored, expected) in [
            (PaymentStatus::Completed, QrPollStatus::Success),
            (PaymentStatus::Cancelled, QrPollStatus::Cancelled),
            (PaymentStatus::Failed, QrPollStatus::Fail),
        ] {
            let mut gateway = MockPaymentGateway::new();
            gateway.expect_order_status().never();

            let ledger = Arc::new(InMemoryLedger::default());
            let status = usecase(&ledger, attempts_returning(attempt(user_id, stored, created_at)), gateway)
                .status_at(user_id, "QR-1", created_at + Duration::hours(1))
                .await
                .unwrap();

            assert_eq!(status.status, expected);
        }
    }

    #[tokio::test]
    async fn closed_attempt_credited_by_webhook_polls_as_success() {
        let user_id = Uuid::new_v4();
        let created_at = Utc::now();

        for stored in [PaymentStatus::Cancelled, PaymentStatus::Failed] {
            let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));
            LedgerWriter::new(Arc::clone(&ledger), Arc::new(NoopDonationFeed))
                .commit(ledger_entry("QR-1", 250, user_id))
                .await
                .unwrap();

            let mut gateway = MockPaymentGateway::new();
            gateway.expect_order_status().never();

            let status = usecase(&ledger, attempts_returning(attempt(user_id, stored, created_at)), gateway)
                .status_at(user_id, "QR-1", created_at + Duration::minutes(20))
                .await
                .unwrap();

            assert_eq!(status.status, QrPollStatus::Success, "{stored}");
        }
    }

    #[tokio::test]
    async fn gateway_hiccup_while_polling_reads_as_pending() {
        let user_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_order_status()
            .returning(|_| Err(anyhow::anyhow!("timeout")));

        let ledger = Arc::new(InMemoryLedger::default());
        let status = usecase(
            &ledger,
            attempts_returning(attempt(user_id, PaymentStatus::Pending, created_at)),
            gateway,
        )
        .status_at(user_id, "QR-1", created_at + Duration::minutes(1))
        .await
        .unwrap();

        assert_eq!(status.status, QrPollStatus::Pending);
    }

    #[tokio::test]
    async fn other_users_reference_is_not_found() {
        let owner = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::default());

        let result = usecase(
            &ledger,
            attempts_returning(attempt(owner, PaymentStatus::Pending, Utc::now())),
            MockPaymentGateway::new(),
        )
        .status(Uuid::new_v4(), "QR-1")
        .await;

        assert!(matches!(result, Err(PaymentError::AttemptNotFound)));
    }

    #[tokio::test]
    async fn cancel_moves_pending_attempt_and_tells_gateway() {
        let user_id = Uuid::new_v4();

        let mut attempts = attempts_returning(attempt(user_id, PaymentStatus::Pending, Utc::now()));
        attempts
            .expect_transition_pending()
            .withf(|_, status, _| *status == PaymentStatus::Cancelled)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_cancel_qr()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("gateway says already closed")));

        let ledger = Arc::new(InMemoryLedger::default());
        usecase(&ledger, attempts, gateway)
            .cancel(user_id, "QR-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_is_a_no_op_once_settled_or_raced() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::default());

        let mut completed = attempts_returning(attempt(user_id, PaymentStatus::Completed, Utc::now()));
        completed.expect_transition_pending().never();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_cancel_qr().never();
        usecase(&ledger, completed, gateway)
            .cancel(user_id, "QR-1")
            .await
            .unwrap();

        // Pending when read, settled by a concurrent writer before the update.
        let mut raced = attempts_returning(attempt(user_id, PaymentStatus::Pending, Utc::now()));
        raced
            .expect_transition_pending()
            .times(1)
            .returning(|_, _, _| Ok(false));
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_cancel_qr().never();
        usecase(&ledger, raced, gateway)
            .cancel(user_id, "QR-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_after_deadline_reports_expired_and_keeps_attempt_pending() {
        let user_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut attempts = attempts_returning(attempt(user_id, PaymentStatus::Pending, created_at));
        attempts.expect_transition_pending().never();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_cancel_qr().never();

        let ledger = Arc::new(InMemoryLedger::default());
        let result = usecase(&ledger, attempts, gateway)
            .cancel_at(
                user_id,
                "QR-1",
                created_at + Duration::minutes(15) + Duration::seconds(1),
            )
            .await;

        assert!(matches!(result, Err(PaymentError::QrExpired)));
    }

    #[tokio::test]
    async fn sweep_expires_attempts_past_deadline() {
        let now = Utc::now();
        let mut attempts = MockPaymentAttemptRepository::new();
        attempts
            .expect_expire_pending_before()
            .withf(move |cutoff| *cutoff == now)
            .returning(|_| Ok(2));

        assert_eq!(expire_stale_attempts(&attempts, now).await.unwrap(), 2);
    }
}
