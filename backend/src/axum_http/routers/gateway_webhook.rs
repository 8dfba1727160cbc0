use crate::usecases::{
    gateway_verification::{GatewayVerifier, PaymentGateway},
    gateway_webhook::GatewayWebhookUseCase,
    ledger::LedgerWriter,
};
use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::{
        repositories::{
            app_users::AppUserRepository, ledger::LedgerRepository,
            payment_attempts::PaymentAttemptRepository,
        },
        value_objects::gateway_callbacks::GatewayWebhookForm,
    },
    infra::db::{
        postgres::postgres_connection::PgPool,
        repositories::{
            app_users::AppUserPostgres, ledger::LedgerPostgres,
            payment_attempts::PaymentAttemptPostgres,
        },
    },
    payments::gateway_client::PaymentGatewayClient,
};
use std::sync::Arc;

pub fn routes(
    db_pool: Arc<PgPool>,
    ledger_writer: Arc<LedgerWriter<LedgerPostgres>>,
    verifier: Arc<GatewayVerifier<PaymentGatewayClient>>,
) -> Router {
    let app_user_repository = AppUserPostgres::new(Arc::clone(&db_pool));
    let attempt_repository = PaymentAttemptPostgres::new(Arc::clone(&db_pool));
    let usecase = GatewayWebhookUseCase::new(
        ledger_writer,
        Arc::new(app_user_repository),
        Arc::new(attempt_repository),
        verifier,
    );

    Router::new()
        .route(
            "/",
            post(
                gateway_webhook::<
                    LedgerPostgres,
                    AppUserPostgres,
                    PaymentAttemptPostgres,
                    PaymentGatewayClient,
                >,
            ),
        )
        .with_state(Arc::new(usecase))
}

/// Replays of recorded references answer 200 so the gateway stops retrying;
/// every other error keeps its status and the gateway may retry.
pub async fn gateway_webhook<L, U, A, G>(
    State(usecase): State<Arc<GatewayWebhookUseCase<L, U, A, G>>>,
    Form(form): Form<GatewayWebhookForm>,
) -> impl IntoResponse
where
    L: LedgerRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    match usecase.handle(form).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(err) => err.into_response(),
    }
}
