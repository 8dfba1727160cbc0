use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use super::donation_feed::{DonationEvent, DonationFeed};

const QUEUE_CAPACITY: usize = 128;

#[derive(Serialize)]
struct PublishBody<'a> {
    channel: &'a str,
    #[serde(flatten)]
    event: &'a DonationEvent,
}

/// Publishes donation events to a realtime HTTP endpoint from a background task.
pub struct HttpDonationFeed {
    tx: mpsc::Sender<DonationEvent>,
}

impl HttpDonationFeed {
    /// Spawns the sender task; call from inside the tokio runtime.
    pub fn spawn(publish_url: String, api_key: String, channel: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .context("failed to build realtime http client")?;

        let (tx, mut rx) = mpsc::channel::<DonationEvent>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let body = PublishBody {
                    channel: &channel,
                    event: &event,
                };

                let sent = http
                    .post(&publish_url)
                    .header("x-api-key", &api_key)
                    .header(CONTENT_TYPE, "application/json")
                    .json(&body)
                    .send()
                    .await;

                match sent {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => warn!(
                        status = %resp.status(),
                        amount = %event.amount,
                        "realtime: publish rejected"
                    ),
                    Err(err) => warn!(
                        error = %err.without_url(),
                        amount = %event.amount,
                        "realtime: publish failed"
                    ),
                }
            }
        });

        Ok(Self { tx })
    }
}

impl DonationFeed for HttpDonationFeed {
    fn publish(&self, event: DonationEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("realtime: queue full, dropping donation event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("realtime: queue closed, dropping donation event");
            }
        }
    }
}
