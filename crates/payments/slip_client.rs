use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};
use tracing::{error, warn};

/// Slip-recognition vendor client. Sends the slip image, hands back the raw
/// JSON for the domain parser.
pub struct SlipVerificationClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl SlipVerificationClient {
    pub fn new(api_url: String, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .context("failed to build slip verifier http client")?;

        Ok(Self {
            http,
            api_url,
            api_key,
        })
    }

    /// Submits one slip image.
    ///
    /// A 4xx answer means the vendor could not read the image; its JSON body is
    /// returned as-is so the parser rejects it as an unreadable slip. 5xx and
    /// transport failures are errors.
    pub async fn verify_slip(&self, image: &[u8]) -> Result<Value> {
        let body = json!({ "image": STANDARD.encode(image) });

        let resp = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .context("slip verifier request failed")?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if status.is_server_error() {
            error!(
                status = %status,
                response_body = %text,
                "slip verifier: vendor unavailable"
            );
            anyhow::bail!("slip verifier returned status {}", status);
        }

        if status.is_client_error() {
            warn!(
                status = %status,
                response_body = %text,
                "slip verifier: vendor rejected the image"
            );
            let rejected = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| json!({ "success": false, "message": text }));
            return Ok(match rejected {
                Value::Object(_) => rejected,
                _ => json!({ "success": false, "message": status.to_string() }),
            });
        }

        serde_json::from_str(&text).context("slip verifier response is not JSON")
    }
}
