use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use tracing::error;

use crate::domain::value_objects::{
    gateway_callbacks::GatewayOrderStatus, qr_payments::GatewayQrCode,
    slip_verifications::decimal_from_json,
};

/// Minimal card/PromptPay gateway client built on reqwest.
pub struct PaymentGatewayClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    merchant_id: String,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorEnvelope {
    #[serde(alias = "error_code")]
    code: Option<Value>,
    #[serde(alias = "error_message", alias = "error")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOrderStatus {
    #[serde(alias = "refno", alias = "ref_no", alias = "txn_id")]
    reference: Option<String>,
    #[serde(alias = "status", alias = "statusCode")]
    status_code: Option<String>,
    #[serde(alias = "statusname", alias = "statusName")]
    status_name: Option<String>,
    amount: Option<Value>,
    total: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawQrCode {
    #[serde(alias = "txn_id", alias = "refno")]
    reference: String,
    #[serde(alias = "qr_code", alias = "image")]
    qr_image: String,
    #[serde(alias = "promptpay", alias = "promptpay_account")]
    promptpay_id: String,
}

impl PaymentGatewayClient {
    pub fn new(api_url: String, api_key: String, merchant_id: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("failed to build gateway http client")?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            merchant_id,
        })
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (gateway_error_code, gateway_error_message) =
            match serde_json::from_str::<GatewayErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.code, envelope.message),
                Err(_) => (None, None),
            };

        error!(
            status = %status,
            gateway_error_code = ?gateway_error_code,
            gateway_error_message = ?gateway_error_message,
            response_body = %body,
            context = %context,
            "payment gateway request failed"
        );

        anyhow::bail!("payment gateway request failed: {} (status {})", context, status);
    }

    /// Asks the gateway for the authoritative state of an order.
    pub async fn order_status(&self, reference: &str) -> Result<GatewayOrderStatus> {
        let body = [
            ("merchant_id", self.merchant_id.clone()),
            ("reference", reference.to_string()),
        ];

        let resp = self
            .http
            .post(format!("{}/v1/orders/status", self.api_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "order status").await?;

        let raw_payload: Value = resp.json().await?;
        let order = unwrap_data(&raw_payload);
        let parsed: RawOrderStatus = serde_json::from_value(order.clone())
            .context("order status response has an unexpected shape")?;

        Ok(GatewayOrderStatus {
            reference: parsed.reference.unwrap_or_else(|| reference.to_string()),
            status_code: parsed.status_code,
            status_name: parsed.status_name,
            amount: parsed.amount.as_ref().and_then(decimal_from_json),
            total: parsed.total.as_ref().and_then(decimal_from_json),
            raw_payload,
        })
    }

    /// Mints a PromptPay QR for `amount`. `order_no` is our own correlation id;
    /// the gateway answers with the transaction reference it will report back.
    pub async fn create_qr(
        &self,
        amount: &BigDecimal,
        order_no: &str,
        description: &str,
    ) -> Result<GatewayQrCode> {
        let body = [
            ("merchant_id", self.merchant_id.clone()),
            ("order_no", order_no.to_string()),
            ("amount", amount.round(2).to_string()),
            ("product_detail", description.to_string()),
        ];

        let resp = self
            .http
            .post(format!("{}/v1/promptpay/qr", self.api_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create promptpay qr").await?;

        let raw_payload: Value = resp.json().await?;
        let parsed: RawQrCode = serde_json::from_value(unwrap_data(&raw_payload).clone())
            .context("promptpay qr response is missing reference, image or promptpay id")?;

        Ok(GatewayQrCode {
            reference: parsed.reference,
            qr_image: parsed.qr_image,
            promptpay_id: parsed.promptpay_id,
        })
    }

    pub async fn cancel_qr(&self, reference: &str) -> Result<()> {
        let body = [
            ("merchant_id", self.merchant_id.clone()),
            ("reference", reference.to_string()),
        ];

        let resp = self
            .http
            .post(format!("{}/v1/promptpay/cancel", self.api_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        Self::ensure_success(resp, "cancel promptpay qr").await?;

        Ok(())
    }
}

fn unwrap_data(payload: &Value) -> &Value {
    match payload.get("data") {
        Some(Value::Array(items)) => items.first().unwrap_or(payload),
        Some(data) if data.is_object() => data,
        _ => payload,
    }
}
