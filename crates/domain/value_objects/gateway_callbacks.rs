use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::{enums::gateway_statuses::GatewayStatus, slip_verifications::decimal_from_json};

/// Form-encoded body the card/QR gateway posts to our webhook. Every field is
/// optional on the wire; [`GatewayWebhookForm::validate`] decides what is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayWebhookForm {
    pub secret: Option<String>,
    #[serde(alias = "cardtype")]
    pub card_type: Option<String>,
    #[serde(alias = "customeremail")]
    pub customer_email: Option<String>,
    #[serde(alias = "merchantid")]
    pub merchant_id: Option<String>,
    #[serde(alias = "orderno")]
    pub order_no: Option<String>,
    #[serde(alias = "refno")]
    pub ref_no: Option<String>,
    #[serde(alias = "productdetail")]
    pub product_detail: Option<String>,
    pub total: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCallback {
    pub card_type: Option<String>,
    /// Lower-cased. QR settlements may arrive without one.
    pub customer_email: Option<String>,
    pub merchant_id: Option<String>,
    pub order_no: Option<String>,
    pub reference: String,
    pub product_detail: Option<String>,
    pub total: BigDecimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayCallbackError {
    #[error("webhook field `{0}` is missing")]
    Missing(&'static str),
    #[error("webhook field `{0}` is invalid")]
    Invalid(&'static str),
}

impl GatewayWebhookForm {
    /// Secret checking is not done here; the caller does it before anything else.
    pub fn validate(&self) -> Result<GatewayCallback, GatewayCallbackError> {
        let reference = required(&self.ref_no, "ref_no")?;
        let raw_total = required(&self.total, "total")?;
        let total = decimal_from_json(&Value::String(raw_total))
            .filter(|value| *value > BigDecimal::zero())
            .ok_or(GatewayCallbackError::Invalid("total"))?;

        Ok(GatewayCallback {
            card_type: optional(&self.card_type),
            customer_email: optional(&self.customer_email).map(|email| email.to_lowercase()),
            merchant_id: optional(&self.merchant_id),
            order_no: optional(&self.order_no),
            reference,
            product_detail: optional(&self.product_detail),
            total,
        })
    }

    /// Payload persisted with the payment record. The secret never leaves this struct.
    pub fn audit_payload(&self) -> Value {
        json!({
            "card_type": self.card_type,
            "customer_email": self.customer_email,
            "merchant_id": self.merchant_id,
            "order_no": self.order_no,
            "ref_no": self.ref_no,
            "product_detail": self.product_detail,
            "total": self.total,
        })
    }
}

/// Authoritative order state from the gateway's status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOrderStatus {
    pub reference: String,
    pub status_code: Option<String>,
    pub status_name: Option<String>,
    pub amount: Option<BigDecimal>,
    pub total: Option<BigDecimal>,
    pub raw_payload: Value,
}

impl GatewayOrderStatus {
    pub fn status(&self) -> GatewayStatus {
        GatewayStatus::resolve(self.status_code.as_deref(), self.status_name.as_deref())
    }
}

/// Compares the posted webhook secret with the configured one. Both sides are
/// hashed first so the comparison always walks 32 bytes.
pub fn webhook_secret_matches(expected: &str, provided: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let expected = Sha256::digest(expected.as_bytes());
    let provided = Sha256::digest(provided.as_bytes());
    expected
        .iter()
        .zip(provided.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, GatewayCallbackError> {
    optional(value).ok_or(GatewayCallbackError::Missing(field))
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn form() -> GatewayWebhookForm {
        GatewayWebhookForm {
            secret: Some("s3cret".to_string()),
            card_type: Some("VISA".to_string()),
            customer_email: Some("Donor@Example.com ".to_string()),
            merchant_id: Some("M-1".to_string()),
            order_no: Some("ORD-9".to_string()),
            ref_no: Some("REF-9".to_string()),
            product_detail: Some("project_id=3".to_string()),
            total: Some("1,000.00".to_string()),
        }
    }

    #[test]
    fn valid_form_is_normalized() {
        let callback = form().validate().unwrap();
        assert_eq!(callback.reference, "REF-9");
        assert_eq!(callback.customer_email.as_deref(), Some("donor@example.com"));
        assert_eq!(callback.total, BigDecimal::from_str("1000").unwrap());
    }

    #[test]
    fn reference_and_total_are_required_email_is_not() {
        let mut missing = form();
        missing.ref_no = Some("  ".to_string());
        assert_eq!(missing.validate(), Err(GatewayCallbackError::Missing("ref_no")));

        let mut no_email = form();
        no_email.customer_email = None;
        assert_eq!(no_email.validate().unwrap().customer_email, None);

        let mut bad_total = form();
        bad_total.total = Some("-5".to_string());
        assert_eq!(bad_total.validate(), Err(GatewayCallbackError::Invalid("total")));
    }

    #[test]
    fn audit_payload_omits_secret() {
        let payload = form().audit_payload();
        assert!(payload.get("secret").is_none());
        assert_eq!(payload["ref_no"], "REF-9");
    }

    #[test]
    fn webhook_secret_comparison() {
        assert!(webhook_secret_matches("s3cret", "s3cret"));
        assert!(!webhook_secret_matches("s3cret", "s3cret "));
        assert!(!webhook_secret_matches("s3cret", ""));
        assert!(!webhook_secret_matches("", ""));
    }
}
