use anyhow::{Context, Result};
use crates::domain::value_objects::receiver_identity::VerifiedReceiverIdentity;
use std::str::FromStr;

use super::config_model::{
    BackendServer, Database, DotEnvyConfig, PaymentGateway, QrExpirySweep, Realtime,
    SlipVerifier, Supabase,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: parsed("SERVER_PORT_BACKEND")?,
        body_limit: parsed("SERVER_BODY_LIMIT")?,
        timeout: parsed("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let supabase = Supabase {
        jwt_secret: required("SUPABASE_JWT_SECRET")?,
    };

    let slip_verifier = SlipVerifier {
        api_url: required("SLIP_VERIFIER_API_URL")?,
        api_key: required("SLIP_VERIFIER_API_KEY")?,
    };

    let payment_gateway = PaymentGateway {
        api_url: required("PAYMENT_GATEWAY_API_URL")?,
        api_key: required("PAYMENT_GATEWAY_API_KEY")?,
        merchant_id: required("PAYMENT_GATEWAY_MERCHANT_ID")?,
        webhook_secret: required("PAYMENT_GATEWAY_WEBHOOK_SECRET")?,
    };

    let receiver_identity = VerifiedReceiverIdentity {
        names: list("RECEIVER_NAMES"),
        partial_names: list("RECEIVER_PARTIAL_NAMES"),
        account_numbers: list("RECEIVER_ACCOUNT_NUMBERS"),
        account_fragments: list("RECEIVER_ACCOUNT_FRAGMENTS"),
        account_type: optional("RECEIVER_ACCOUNT_TYPE").unwrap_or_else(|| "BANKAC".to_string()),
    };
    if receiver_identity.names.is_empty()
        && receiver_identity.partial_names.is_empty()
        && receiver_identity.account_numbers.is_empty()
        && receiver_identity.account_fragments.is_empty()
    {
        anyhow::bail!(
            "receiver identity is empty: set RECEIVER_NAMES or RECEIVER_ACCOUNT_NUMBERS"
        );
    }

    // All three or nothing; the feed is optional.
    let realtime = match optional("REALTIME_PUBLISH_URL") {
        Some(publish_url) => Some(Realtime {
            publish_url,
            api_key: required("REALTIME_API_KEY")?,
            channel: optional("REALTIME_CHANNEL").unwrap_or_else(|| "donations".to_string()),
        }),
        None => None,
    };

    let qr_expiry_sweep = QrExpirySweep {
        interval_secs: parsed_or("QR_EXPIRY_SWEEP_INTERVAL_SECS", 60)?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        supabase,
        slip_verifier,
        payment_gateway,
        receiver_identity,
        realtime,
        qr_expiry_sweep,
    })
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} is missing"))
}

fn parsed<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(key)?
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}

/// Comma-separated; Thai names never contain commas.
fn list(key: &str) -> Vec<String> {
    optional(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
