mod config;
mod layer;
mod notifier;
mod webhook;

use anyhow::Result;
use config::ObservabilityConfig;
use layer::ReconciliationAlertLayer;
use notifier::AlertDispatcher;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use webhook::AlertWebhookSink;

/// Installs the global subscriber. Must run inside a tokio runtime when alerts
/// are configured, since the dispatcher spawns its sender task.
pub fn init_observability(component: &str) -> Result<()> {
    let mut config = ObservabilityConfig::from_env(component);

    let alert_layer = match config.alerts.as_ref() {
        Some(alerts) => match AlertWebhookSink::new(alerts.webhook_url.clone()) {
            Ok(sink) => {
                let dispatcher = AlertDispatcher::new(vec![Arc::new(sink)]);
                Some(
                    ReconciliationAlertLayer::new(
                        dispatcher,
                        config.service_context.clone(),
                        alerts.min_level,
                    )
                    .with_filter(LevelFilter::from_level(alerts.min_level)),
                )
            }
            Err(err) => {
                config
                    .warnings
                    .push(format!("reconciliation alerts disabled: {err}"));
                None
            }
        },
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local time so `TZ=Asia/Bangkok` logs show +07:00.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    let alerts_enabled = alert_layer.is_some();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    let ctx = &config.service_context;
    for warning in &config.warnings {
        warn!(
            service = %ctx.service_name,
            environment = %ctx.environment,
            component = %ctx.component,
            warning = %warning,
            "observability: config warning"
        );
    }

    info!(
        service = %ctx.service_name,
        environment = %ctx.environment,
        component = %ctx.component,
        alerts_enabled,
        "observability: initialised"
    );

    Ok(())
}
