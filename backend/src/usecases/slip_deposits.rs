use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use crates::{
    domain::{
        repositories::ledger::LedgerRepository,
        value_objects::{
            donations::SlipDepositDto,
            enums::payment_rails::PaymentRail,
            receiver_identity::VerifiedReceiverIdentity,
            slip_verifications::{SlipParseError, parse_slip_response},
            verified_payments::{LedgerEntry, VerifiedPayment},
        },
    },
    payments::slip_client::SlipVerificationClient,
};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::ledger::{LedgerWriter, PaymentError, PaymentResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlipVerifierGateway: Send + Sync {
    async fn verify_slip(&self, image: &[u8]) -> AnyResult<Value>;
}

#[async_trait]
impl SlipVerifierGateway for SlipVerificationClient {
    async fn verify_slip(&self, image: &[u8]) -> AnyResult<Value> {
        self.verify_slip(image).await
    }
}

pub struct BankSlipUseCase<L, V>
where
    L: LedgerRepository + Send + Sync + 'static,
    V: SlipVerifierGateway + 'static,
{
    ledger: Arc<LedgerWriter<L>>,
    verifier: Arc<V>,
    receiver: Arc<VerifiedReceiverIdentity>,
}

impl<L, V> BankSlipUseCase<L, V>
where
    L: LedgerRepository + Send + Sync + 'static,
    V: SlipVerifierGateway + 'static,
{
    pub fn new(
        ledger: Arc<LedgerWriter<L>>,
        verifier: Arc<V>,
        receiver: Arc<VerifiedReceiverIdentity>,
    ) -> Self {
        Self {
            ledger,
            verifier,
            receiver,
        }
    }

    /// Reads the slip through the vendor and checks it was paid to us.
    pub async fn verify(&self, image: &[u8]) -> PaymentResult<VerifiedPayment> {
        if image.is_empty() {
            return Err(PaymentError::InvalidPayload("slip image is empty".to_string()));
        }

        let raw = self.verifier.verify_slip(image).await.map_err(|err| {
            error!(vendor_error = ?err, "slip deposits: verifier call failed");
            PaymentError::Upstream(err)
        })?;

        let slip = match parse_slip_response(&raw) {
            Ok(slip) => slip,
            Err(SlipParseError::Malformed(reason)) => {
                warn!(reason = %reason, "slip deposits: vendor could not read slip");
                return Err(PaymentError::InvalidSlip);
            }
            Err(err @ SlipParseError::MissingField(_)) => {
                error!(
                    raw_payload = %raw,
                    reason = %err,
                    "slip deposits: vendor response incomplete"
                );
                return Err(PaymentError::InsufficientUpstreamData(err.to_string()));
            }
        };

        if !self.receiver.matches(&slip.receiver) {
            warn!(
                reference = %slip.reference,
                receiver_name_th = ?slip.receiver.name_th,
                receiver_name_en = ?slip.receiver.name_en,
                receiver_account = ?slip.receiver.account_number,
                receiver_account_type = ?slip.receiver.account_type,
                "slip deposits: slip paid to another receiver"
            );
            return Err(PaymentError::InvalidReceiver);
        }

        if slip.amount <= BigDecimal::zero() {
            warn!(
                reference = %slip.reference,
                amount = %slip.amount,
                "slip deposits: non-positive slip amount"
            );
            return Err(PaymentError::InvalidSlip);
        }

        Ok(VerifiedPayment::from(slip))
    }

    /// Verify, guard, then credit. Anonymous uploads stop after the guard.
    pub async fn deposit(
        &self,
        user_id: Option<Uuid>,
        image: &[u8],
        project_id: Option<i64>,
    ) -> PaymentResult<SlipDepositDto> {
        if let Some(project_id) = project_id {
            self.ledger.ensure_project(project_id).await?;
        }

        let payment = self.verify(image).await?;
        self.ledger.ensure_unused(&payment.reference).await?;

        let Some(user_id) = user_id else {
            info!(
                reference = %payment.reference,
                amount = %payment.amount,
                "slip deposits: anonymous slip verified, not credited"
            );
            return Ok(SlipDepositDto {
                reference: payment.reference,
                amount: payment.amount,
                credited: false,
                payment_id: None,
            });
        };

        let entry = LedgerEntry::from_verified(payment, PaymentRail::Bank, user_id, project_id);
        let record = self.ledger.commit(entry).await?;

        Ok(SlipDepositDto {
            reference: record.reference,
            amount: record.amount,
            credited: true,
            payment_id: Some(record.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::testing::InMemoryLedger;
    use crates::realtime::donation_feed::NoopDonationFeed;
    use serde_json::json;

    const FOUNDATION_TH: &str = "มูลนิธิเพื่อผู้พิการไทย";

    fn identity() -> Arc<VerifiedReceiverIdentity> {
        Arc::new(VerifiedReceiverIdentity {
            names: vec![FOUNDATION_TH.to_string(), "THAI DISABLED FOUNDATION".to_string()],
            partial_names: vec!["เพื่อผู้พิการ".to_string()],
            account_numbers: vec!["162-8-11965-8".to_string()],
            account_fragments: vec!["11965".to_string(), "1965".to_string()],
            account_type: "BANKAC".to_string(),
        })
    }

    fn slip_body(reference: &str, amount: i64, name_th: &str, account: &str) -> Value {
        json!({
            "success": true,
            "data": {
                "transactionReference": reference,
                "amount": amount,
                "receiver": {
                    "name": { "th": name_th },
                    "account": { "number": account, "type": "BANKAC" }
                },
                "sender": { "account": { "number": "xxx-x-x4321-x" } }
            }
        })
    }

    fn verifier_returning(body: Value) -> Arc<MockSlipVerifierGateway> {
        let mut verifier = MockSlipVerifierGateway::new();
        verifier
            .expect_verify_slip()
            .returning(move |_| Ok(body.clone()));
        Arc::new(verifier)
    }

    fn usecase(
        ledger: &Arc<InMemoryLedger>,
        verifier: Arc<MockSlipVerifierGateway>,
    ) -> BankSlipUseCase<InMemoryLedger, MockSlipVerifierGateway> {
        let writer = LedgerWriter::new(Arc::clone(ledger), Arc::new(NoopDonationFeed));
        BankSlipUseCase::new(Arc::new(writer), verifier, identity())
    }

    #[tokio::test]
    async fn happy_path_slip_credits_the_user() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));
        let verifier = verifier_returning(slip_body("TXN1", 500, FOUNDATION_TH, "162-8-11965-8"));

        let dto = usecase(&ledger, verifier)
            .deposit(Some(user_id), b"slip-image", None)
            .await
            .unwrap();

        assert!(dto.credited);
        assert_eq!(dto.reference, "TXN1");
        assert_eq!(ledger.balance_of(user_id), BigDecimal::from(500));

        let record = ledger.record("TXN1").unwrap();
        assert_eq!(record.rail, "bank");
        assert_eq!(record.status, "completed");
        assert_eq!(record.payer_identifier.as_deref(), Some("xxx-x-x4321-x"));
    }

    #[tokio::test]
    async fn duplicate_slip_is_rejected_without_second_credit() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));
        let verifier = verifier_returning(slip_body("TXN1", 500, FOUNDATION_TH, "162-8-11965-8"));
        let usecase = usecase(&ledger, verifier);

        usecase.deposit(Some(user_id), b"slip", None).await.unwrap();
        let second = usecase.deposit(Some(user_id), b"slip", None).await;

        assert!(matches!(second, Err(PaymentError::AlreadyUsed)));
        assert_eq!(ledger.record_count(), 1);
        assert_eq!(ledger.balance_of(user_id), BigDecimal::from(500));
    }

    #[tokio::test]
    async fn wrong_receiver_is_rejected() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));
        let verifier = verifier_returning(slip_body("TXN2", 500, "บริษัท อื่น จำกัด", "999-9-99999-9"));

        let result = usecase(&ledger, verifier)
            .deposit(Some(user_id), b"slip", None)
            .await;

        assert!(matches!(result, Err(PaymentError::InvalidReceiver)));
        assert_eq!(ledger.record_count(), 0);
        assert_eq!(ledger.balance_of(user_id), BigDecimal::from(0));
    }

    #[tokio::test]
    async fn garbled_name_still_passes_on_account_match() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));
        let verifier = verifier_returning(slip_body("TXN3", 200, "ม??นิธิ", "xxx-x-x1965-x"));

        let dto = usecase(&ledger, verifier)
            .deposit(Some(user_id), b"slip", None)
            .await
            .unwrap();

        assert!(dto.credited);
    }

    #[tokio::test]
    async fn anonymous_slip_is_verified_but_not_credited() {
        let ledger = Arc::new(InMemoryLedger::default());
        let verifier = verifier_returning(slip_body("TXN4", 300, FOUNDATION_TH, "162-8-11965-8"));

        let dto = usecase(&ledger, verifier)
            .deposit(None, b"slip", None)
            .await
            .unwrap();

        assert!(!dto.credited);
        assert_eq!(dto.payment_id, None);
        assert_eq!(dto.amount, BigDecimal::from(300));
        assert_eq!(ledger.record_count(), 0);
    }

    #[tokio::test]
    async fn earmarked_slip_advances_project_progress() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));
        ledger.add_project(7, 400, 1000);
        let verifier = verifier_returning(slip_body("TXN5", 100, FOUNDATION_TH, "162-8-11965-8"));

        usecase(&ledger, verifier)
            .deposit(Some(user_id), b"slip", Some(7))
            .await
            .unwrap();

        let project = ledger.project(7).unwrap();
        assert_eq!(project.current_amount, BigDecimal::from(500));
        assert_eq!(project.progress_percentage, BigDecimal::from(50));
    }

    #[tokio::test]
    async fn unknown_project_is_rejected_before_the_vendor_is_called() {
        let user_id = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::with_balance(user_id, 0));

        let mut verifier = MockSlipVerifierGateway::new();
        verifier.expect_verify_slip().never();

        let result = usecase(&ledger, Arc::new(verifier))
            .deposit(Some(user_id), b"slip", Some(500))
            .await;

        assert!(matches!(result, Err(PaymentError::InvalidPayload(_))));
        assert_eq!(ledger.record_count(), 0);
    }

    #[tokio::test]
    async fn unreadable_slip_and_incomplete_vendor_data_are_distinguished() {
        let ledger = Arc::new(InMemoryLedger::default());

        let rejected = verifier_returning(json!({ "success": false, "message": "not a slip" }));
        let result = usecase(&ledger, rejected).verify(b"cat.jpg").await;
        assert!(matches!(result, Err(PaymentError::InvalidSlip)));

        let partial = verifier_returning(json!({
            "transactionReference": "TXN6",
            "receiver": { "name": { "th": FOUNDATION_TH } }
        }));
        let result = usecase(&ledger, partial).verify(b"slip").await;
        assert!(matches!(result, Err(PaymentError::InsufficientUpstreamData(_))));
    }

    #[tokio::test]
    async fn vendor_outage_is_upstream_and_empty_upload_never_calls_vendor() {
        let ledger = Arc::new(InMemoryLedger::default());

        let mut down = MockSlipVerifierGateway::new();
        down.expect_verify_slip()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("503 from vendor")));
        let result = usecase(&ledger, Arc::new(down)).verify(b"slip").await;
        assert!(matches!(result, Err(PaymentError::Upstream(_))));

        let mut untouched = MockSlipVerifierGateway::new();
        untouched.expect_verify_slip().never();
        let result = usecase(&ledger, Arc::new(untouched)).verify(b"").await;
        assert!(matches!(result, Err(PaymentError::InvalidPayload(_))));
    }
}
