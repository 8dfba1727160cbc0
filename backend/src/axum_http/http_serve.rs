use crate::{
    auth::AuthKeys,
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
    services::qr_expiry_sweep::run_qr_expiry_sweep,
    usecases::{gateway_verification::GatewayVerifier, ledger::LedgerWriter},
};
use anyhow::Result;
use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    infra::db::{
        postgres::postgres_connection::PgPool,
        repositories::{ledger::LedgerPostgres, payment_attempts::PaymentAttemptPostgres},
    },
    payments::{gateway_client::PaymentGatewayClient, slip_client::SlipVerificationClient},
    realtime::{
        donation_feed::{DonationFeed, NoopDonationFeed},
        http_feed::HttpDonationFeed,
    },
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPool>) -> Result<()> {
    let donation_feed: Arc<dyn DonationFeed> = match &config.realtime {
        Some(realtime) => {
            info!(channel = %realtime.channel, "realtime donation feed enabled");
            Arc::new(HttpDonationFeed::spawn(
                realtime.publish_url.clone(),
                realtime.api_key.clone(),
                realtime.channel.clone(),
            )?)
        }
        None => {
            info!("realtime donation feed disabled");
            Arc::new(NoopDonationFeed)
        }
    };

    let ledger_repository = Arc::new(LedgerPostgres::new(Arc::clone(&db_pool)));
    let ledger_writer = Arc::new(LedgerWriter::new(
        Arc::clone(&ledger_repository),
        donation_feed,
    ));

    let gateway_client = PaymentGatewayClient::new(
        config.payment_gateway.api_url.clone(),
        config.payment_gateway.api_key.clone(),
        config.payment_gateway.merchant_id.clone(),
    )?;
    let gateway_verifier = Arc::new(GatewayVerifier::new(
        Arc::new(gateway_client),
        config.payment_gateway.webhook_secret.clone(),
    ));

    let slip_client = SlipVerificationClient::new(
        config.slip_verifier.api_url.clone(),
        config.slip_verifier.api_key.clone(),
    )?;

    if config.qr_expiry_sweep.interval_secs > 0 {
        tokio::spawn(run_qr_expiry_sweep(
            Arc::new(PaymentAttemptPostgres::new(Arc::clone(&db_pool))),
            Duration::from_secs(config.qr_expiry_sweep.interval_secs),
        ));
    }

    let body_limit: usize = (config.backend_server.body_limit * 1024 * 1024).try_into()?;

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/deposits/slip",
            routers::slip_deposits::routes(
                Arc::clone(&ledger_writer),
                Arc::new(slip_client),
                Arc::new(config.receiver_identity.clone()),
            ),
        )
        .nest(
            "/api/v1/deposits/qr",
            routers::qr_payments::routes(
                Arc::clone(&db_pool),
                Arc::clone(&ledger_writer),
                Arc::clone(&gateway_verifier),
            ),
        )
        .nest(
            "/api/v1/webhooks/gateway",
            routers::gateway_webhook::routes(
                Arc::clone(&db_pool),
                Arc::clone(&ledger_writer),
                Arc::clone(&gateway_verifier),
            ),
        )
        .nest(
            "/api/v1/donations",
            routers::donations::routes(Arc::clone(&ledger_repository)),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(Extension(Arc::new(AuthKeys::from_secret(
            &config.supabase.jwt_secret,
        ))))
        // Multipart uploads otherwise stop at axum's 2 MB default.
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
