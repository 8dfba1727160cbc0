use crate::{
    auth::AuthUser,
    usecases::{
        gateway_verification::{GatewayVerifier, PaymentGateway},
        ledger::LedgerWriter,
        qr_payments::QrPaymentUseCase,
    },
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{ledger::LedgerRepository, payment_attempts::PaymentAttemptRepository},
        value_objects::qr_payments::CreateQrPaymentModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPool,
        repositories::{ledger::LedgerPostgres, payment_attempts::PaymentAttemptPostgres},
    },
    payments::gateway_client::PaymentGatewayClient,
};
use serde_json::json;
use std::sync::Arc;

pub fn routes(
    db_pool: Arc<PgPool>,
    ledger_writer: Arc<LedgerWriter<LedgerPostgres>>,
    verifier: Arc<GatewayVerifier<PaymentGatewayClient>>,
) -> Router {
    let attempt_repository = PaymentAttemptPostgres::new(Arc::clone(&db_pool));
    let usecase = QrPaymentUseCase::new(ledger_writer, Arc::new(attempt_repository), verifier);

    Router::new()
        .route("/", post(create_qr_payment::<LedgerPostgres, PaymentAttemptPostgres, PaymentGatewayClient>))
        .route("/:reference/status", get(qr_payment_status::<LedgerPostgres, PaymentAttemptPostgres, PaymentGatewayClient>))
        .route("/:reference/cancel", post(cancel_qr_payment::<LedgerPostgres, PaymentAttemptPostgres, PaymentGatewayClient>))
        .with_state(Arc::new(usecase))
}

pub async fn create_qr_payment<L, A, G>(
    State(usecase): State<Arc<QrPaymentUseCase<L, A, G>>>,
    auth: AuthUser,
    Json(model): Json<CreateQrPaymentModel>,
) -> impl IntoResponse
where
    L: LedgerRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    match usecase.create(auth.user_id, model).await {
        Ok(dto) => (StatusCode::CREATED, Json(dto)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn qr_payment_status<L, A, G>(
    State(usecase): State<Arc<QrPaymentUseCase<L, A, G>>>,
    auth: AuthUser,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    L: LedgerRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    match usecase.status(auth.user_id, &reference).await {
        Ok(dto) => (StatusCode::OK, Json(dto)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cancel_qr_payment<L, A, G>(
    State(usecase): State<Arc<QrPaymentUseCase<L, A, G>>>,
    auth: AuthUser,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    L: LedgerRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    match usecase.cancel(auth.user_id, &reference).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(err) => err.into_response(),
    }
}
