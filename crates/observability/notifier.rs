use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, warn};

/// Field names that identify a payment; promoted to the alert headline.
pub(crate) const RECONCILIATION_KEYS: [&str; 4] = ["reference", "amount", "user_id", "project_id"];

#[derive(Clone, Debug)]
pub(crate) struct AlertEvent {
    pub(crate) level: Level,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
    pub(crate) target: String,
    pub(crate) message: Option<String>,
    /// Subset of `fields` keyed by [`RECONCILIATION_KEYS`], in that order.
    pub(crate) payment: Vec<(String, String)>,
    pub(crate) fields: BTreeMap<String, String>,
    /// Fields collected from enclosing spans (request path and the like).
    pub(crate) context: BTreeMap<String, String>,
}

impl AlertEvent {
    pub(crate) fn split_payment_fields(
        mut fields: BTreeMap<String, String>,
    ) -> (Vec<(String, String)>, BTreeMap<String, String>) {
        let payment = RECONCILIATION_KEYS
            .iter()
            .filter_map(|key| fields.remove(*key).map(|value| (key.to_string(), value)))
            .collect();
        (payment, fields)
    }
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    async fn send(&self, event: &AlertEvent) -> Result<()>;
    fn sink_name(&self) -> &'static str;
}

/// Bounded queue in front of the sinks so logging never waits on the network.
#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    tx: mpsc::Sender<AlertEvent>,
}

impl AlertDispatcher {
    pub(crate) fn new(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertEvent>(256);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for sink in &sinks {
                    if let Err(error) = sink.send(&event).await {
                        warn!(
                            sink = sink.sink_name(),
                            error = %error,
                            "alerts: sink failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }

    pub(crate) fn try_dispatch(&self, event: AlertEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("alerts: queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("alerts: queue closed, dropping event");
            }
        }
    }
}
