use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use crates::{
    domain::value_objects::{
        enums::gateway_statuses::GatewayStatus,
        gateway_callbacks::{GatewayOrderStatus, webhook_secret_matches},
        qr_payments::GatewayQrCode,
        verified_payments::VerifiedPayment,
    },
    payments::gateway_client::PaymentGatewayClient,
};
use tracing::{error, warn};

use super::ledger::{PaymentError, PaymentResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn order_status(&self, reference: &str) -> AnyResult<GatewayOrderStatus>;

    async fn create_qr(
        &self,
        amount: &BigDecimal,
        order_no: &str,
        description: &str,
    ) -> AnyResult<GatewayQrCode>;

    async fn cancel_qr(&self, reference: &str) -> AnyResult<()>;
}

#[async_trait]
impl PaymentGateway for PaymentGatewayClient {
    async fn order_status(&self, reference: &str) -> AnyResult<GatewayOrderStatus> {
        self.order_status(reference).await
    }

    async fn create_qr(
        &self,
        amount: &BigDecimal,
        order_no: &str,
        description: &str,
    ) -> AnyResult<GatewayQrCode> {
        self.create_qr(amount, order_no, description).await
    }

    async fn cancel_qr(&self, reference: &str) -> AnyResult<()> {
        self.cancel_qr(reference).await
    }
}

/// Server-to-server proof for the QR and card rails: the webhook secret, then
/// the gateway's own view of the order.
pub struct GatewayVerifier<G>
where
    G: PaymentGateway + 'static,
{
    gateway: Arc<G>,
    webhook_secret: String,
}

impl<G> GatewayVerifier<G>
where
    G: PaymentGateway + 'static,
{
    pub fn new(gateway: Arc<G>, webhook_secret: String) -> Self {
        Self {
            gateway,
            webhook_secret,
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn check_secret(&self, provided: Option<&str>) -> PaymentResult<()> {
        match provided {
            Some(secret) if webhook_secret_matches(&self.webhook_secret, secret) => Ok(()),
            Some(_) => {
                warn!("gateway verification: webhook secret mismatch");
                Err(PaymentError::Unauthorized)
            }
            None => {
                warn!("gateway verification: webhook secret missing");
                Err(PaymentError::Unauthorized)
            }
        }
    }

    pub async fn query_status(&self, reference: &str) -> PaymentResult<GatewayOrderStatus> {
        self.gateway.order_status(reference).await.map_err(|err| {
            error!(
                reference,
                gateway_error = ?err,
                "gateway verification: order status query failed"
            );
            PaymentError::Upstream(err)
        })
    }

    /// Turns a successful order into a [`VerifiedPayment`]. The gateway's
    /// amount wins; `claimed_amount` only fills in when the gateway omits it.
    pub fn verified_payment(
        &self,
        order: GatewayOrderStatus,
        claimed_amount: Option<&BigDecimal>,
        payer_identifier: Option<String>,
    ) -> PaymentResult<VerifiedPayment> {
        let status = order.status();
        if status != GatewayStatus::Success {
            warn!(
                reference = %order.reference,
                status = %status.as_str(),
                status_code = ?order.status_code,
                status_name = ?order.status_name,
                "gateway verification: order not paid"
            );
            return Err(PaymentError::VerificationFailed);
        }

        let Some(amount) = order
            .amount
            .clone()
            .or_else(|| order.total.clone())
            .or_else(|| claimed_amount.cloned())
        else {
            error!(
                reference = %order.reference,
                raw_payload = %order.raw_payload,
                "gateway verification: paid order carries no amount"
            );
            return Err(PaymentError::InsufficientUpstreamData(
                "order status has no amount".to_string(),
            ));
        };

        if amount <= BigDecimal::zero() {
            warn!(
                reference = %order.reference,
                amount = %amount,
                "gateway verification: non-positive order amount"
            );
            return Err(PaymentError::VerificationFailed);
        }

        Ok(VerifiedPayment {
            reference: order.reference,
            total: order.total.unwrap_or_else(|| amount.clone()),
            amount,
            payer_identifier,
            raw_payload: order.raw_payload,
        })
    }

    pub async fn verify_order(
        &self,
        reference: &str,
        claimed_amount: Option<&BigDecimal>,
        payer_identifier: Option<String>,
    ) -> PaymentResult<VerifiedPayment> {
        let order = self.query_status(reference).await?;
        self.verified_payment(order, claimed_amount, payer_identifier)
    }
}
