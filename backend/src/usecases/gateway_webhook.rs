use std::sync::Arc;

use crates::domain::{
    repositories::{
        app_users::AppUserRepository, ledger::LedgerRepository,
        payment_attempts::PaymentAttemptRepository,
    },
    value_objects::{
        earmarks::parse_project_earmark,
        enums::payment_rails::PaymentRail,
        gateway_callbacks::{GatewayCallback, GatewayCallbackError, GatewayWebhookForm},
        verified_payments::LedgerEntry,
    },
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    gateway_verification::{GatewayVerifier, PaymentGateway},
    ledger::{LedgerWriter, PaymentError, PaymentResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Recorded,
    /// Replay of a reference the ledger already holds.
    AlreadyRecorded,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
    pub reference: String,
    pub outcome: WebhookOutcome,
}

/// Who gets the credit, and where it goes.
struct Beneficiary {
    user_id: Uuid,
    project_id: Option<i64>,
    rail: PaymentRail,
}

pub struct GatewayWebhookUseCase<L, U, A, G>
where
    L: LedgerRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    ledger: Arc<LedgerWriter<L>>,
    app_user_repo: Arc<U>,
    attempt_repo: Arc<A>,
    verifier: Arc<GatewayVerifier<G>>,
}

impl<L, U, A, G> GatewayWebhookUseCase<L, U, A, G>
where
    L: LedgerRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(
        ledger: Arc<LedgerWriter<L>>,
        app_user_repo: Arc<U>,
        attempt_repo: Arc<A>,
        verifier: Arc<GatewayVerifier<G>>,
    ) -> Self {
        Self {
            ledger,
            app_user_repo,
            attempt_repo,
            verifier,
        }
    }

    pub async fn handle(&self, form: GatewayWebhookForm) -> PaymentResult<WebhookAck> {
        self.verifier.check_secret(form.secret.as_deref())?;

        let callback = form.validate().map_err(|err| {
            warn!(reason = %err, "gateway webhook: malformed callback");
            PaymentError::InvalidPayload(err.to_string())
        })?;
        info!(
            reference = %callback.reference,
            total = %callback.total,
            card_type = ?callback.card_type,
            "gateway webhook: callback received"
        );

        let mut payment = self
            .verifier
            .verify_order(
                &callback.reference,
                Some(&callback.total),
                callback.customer_email.clone(),
            )
            .await?;

        let beneficiary = self.resolve_beneficiary(&callback).await?;
        let project_id = self
            .ledger
            .resolve_earmark(&callback.reference, beneficiary.project_id)
            .await?;

        let ack = |outcome| WebhookAck {
            ok: true,
            reference: callback.reference.clone(),
            outcome,
        };

        match self.ledger.ensure_unused(&callback.reference).await {
            Ok(()) => {}
            Err(PaymentError::AlreadyUsed) => return Ok(ack(WebhookOutcome::AlreadyRecorded)),
            Err(err) => return Err(err),
        }

        payment.raw_payload = json!({
            "callback": form.audit_payload(),
            "order_status": payment.raw_payload,
        });

        let rail = beneficiary.rail;
        let label = match callback.card_type.as_deref() {
            Some(card_type) if rail == PaymentRail::Card => format!("Card payment ({card_type})"),
            _ => rail.default_status_label().to_string(),
        };
        let entry = LedgerEntry::from_verified(payment, rail, beneficiary.user_id, project_id)
            .with_status_label(label);

        match self.ledger.commit(entry).await {
            Ok(_) => Ok(ack(WebhookOutcome::Recorded)),
            Err(PaymentError::AlreadyUsed) => Ok(ack(WebhookOutcome::AlreadyRecorded)),
            Err(err) => Err(err),
        }
    }

    /// A QR attempt we minted already names its owner and project; only
    /// references we never minted (card payments) fall back to the payer email
    /// and the free-text earmark.
    async fn resolve_beneficiary(&self, callback: &GatewayCallback) -> PaymentResult<Beneficiary> {
        let attempt = self
            .attempt_repo
            .find_by_reference(&callback.reference)
            .await
            .map_err(|err| {
                error!(
                    reference = %callback.reference,
                    db_error = ?err,
                    "gateway webhook: attempt lookup failed"
                );
                PaymentError::TransactionFailure(err)
            })?;

        if let Some(attempt) = attempt {
            info!(
                reference = %callback.reference,
                user_id = %attempt.user_id,
                project_id = ?attempt.project_id,
                "gateway webhook: settling QR attempt for its owner"
            );
            return Ok(Beneficiary {
                user_id: attempt.user_id,
                project_id: attempt.project_id,
                rail: PaymentRail::Qr,
            });
        }

        Ok(Beneficiary {
            user_id: self.resolve_payer(callback).await?,
            project_id: callback
                .product_detail
                .as_deref()
                .and_then(parse_project_earmark),
            rail: rail_for(callback.card_type.as_deref()),
        })
    }

    async fn resolve_payer(&self, callback: &GatewayCallback) -> PaymentResult<Uuid> {
        let Some(email) = callback.customer_email.as_deref() else {
            warn!(
                reference = %callback.reference,
                amount = %callback.total,
                "gateway webhook: paid order with no attempt and no payer email"
            );
            return Err(PaymentError::InvalidPayload(
                GatewayCallbackError::Missing("customer_email").to_string(),
            ));
        };

        self.app_user_repo
            .find_id_by_email(email)
            .await
            .map_err(|err| {
                error!(
                    reference = %callback.reference,
                    db_error = ?err,
                    "gateway webhook: payer lookup failed"
                );
                PaymentError::TransactionFailure(err)
            })?
            .ok_or_else(|| {
                error!(
                    reference = %callback.reference,
                    amount = %callback.total,
                    "gateway webhook: paid order from an unregistered email"
                );
                PaymentError::UnknownPayer
            })
    }
}

/// The gateway posts QR and card settlements to the same webhook.
fn rail_for(card_type: Option<&str>) -> PaymentRail {
    match card_type.map(|value| value.trim().to_ascii_lowercase()) {
        Some(value) if value.contains("qr") || value.contains("promptpay") => PaymentRail::Qr,
        _ => PaymentRail::Card,
    }
}
