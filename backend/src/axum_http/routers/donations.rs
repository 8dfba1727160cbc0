use crate::{auth::AuthUser, usecases::donations::DonationUseCase};
use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use crates::{
    domain::repositories::ledger::LedgerRepository,
    infra::db::repositories::ledger::LedgerPostgres,
};
use std::sync::Arc;

pub fn routes(ledger_repository: Arc<LedgerPostgres>) -> Router {
    let usecase = DonationUseCase::new(ledger_repository);

    Router::new()
        .route("/me", get(my_donations::<LedgerPostgres>))
        .with_state(Arc::new(usecase))
}

pub async fn my_donations<L>(
    State(usecase): State<Arc<DonationUseCase<L>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    L: LedgerRepository + Send + Sync + 'static,
{
    match usecase.summary(auth.user_id).await {
        Ok(dto) => (StatusCode::OK, Json(dto)).into_response(),
        Err(err) => err.into_response(),
    }
}
