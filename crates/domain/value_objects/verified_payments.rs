use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{enums::payment_rails::PaymentRail, slip_verifications::SlipVerificationResult};

/// Rail-agnostic output of every verifier.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
    pub reference: String,
    pub amount: BigDecimal,
    /// Gross value reported upstream; kept alongside `amount` for audit.
    pub total: BigDecimal,
    pub payer_identifier: Option<String>,
    pub raw_payload: Value,
}

impl From<SlipVerificationResult> for VerifiedPayment {
    fn from(slip: SlipVerificationResult) -> Self {
        let payer_identifier = slip
            .sender
            .account_number
            .clone()
            .or_else(|| slip.sender.name_en.clone())
            .or_else(|| slip.sender.name_th.clone());

        Self {
            reference: slip.reference,
            total: slip.amount.clone(),
            amount: slip.amount,
            payer_identifier,
            raw_payload: slip.raw_payload,
        }
    }
}

/// Everything the ledger writer needs for one atomic credit.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub reference: String,
    pub amount: BigDecimal,
    pub total: BigDecimal,
    pub rail: PaymentRail,
    pub status_label: String,
    pub user_id: Uuid,
    pub project_id: Option<i64>,
    pub payer_identifier: Option<String>,
    pub raw_payload: Value,
    pub payment_date: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn from_verified(
        payment: VerifiedPayment,
        rail: PaymentRail,
        user_id: Uuid,
        project_id: Option<i64>,
    ) -> Self {
        Self {
            reference: payment.reference,
            amount: payment.amount,
            total: payment.total,
            rail,
            status_label: rail.default_status_label().to_string(),
            user_id,
            project_id,
            payer_identifier: payment.payer_identifier,
            raw_payload: payment.raw_payload,
            payment_date: Utc::now(),
        }
    }

    pub fn with_status_label(mut self, label: impl Into<String>) -> Self {
        self.status_label = label.into();
        self
    }
}
