use crate::{
    auth::AuthUser,
    usecases::{
        ledger::{LedgerWriter, PaymentError},
        slip_deposits::{BankSlipUseCase, SlipVerifierGateway},
    },
};
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::{
        repositories::ledger::LedgerRepository,
        value_objects::receiver_identity::VerifiedReceiverIdentity,
    },
    infra::db::repositories::ledger::LedgerPostgres,
    payments::slip_client::SlipVerificationClient,
};
use std::sync::Arc;

pub fn routes(
    ledger_writer: Arc<LedgerWriter<LedgerPostgres>>,
    slip_client: Arc<SlipVerificationClient>,
    receiver_identity: Arc<VerifiedReceiverIdentity>,
) -> Router {
    let usecase = BankSlipUseCase::new(ledger_writer, slip_client, receiver_identity);

    Router::new()
        .route("/", post(upload_slip::<LedgerPostgres, SlipVerificationClient>))
        .with_state(Arc::new(usecase))
}

pub async fn upload_slip<L, V>(
    State(usecase): State<Arc<BankSlipUseCase<L, V>>>,
    auth: Option<AuthUser>,
    multipart: Multipart,
) -> impl IntoResponse
where
    L: LedgerRepository + Send + Sync + 'static,
    V: SlipVerifierGateway + 'static,
{
    let (image, project_id) = match read_slip_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    match usecase
        .deposit(auth.map(|a| a.user_id), &image, project_id)
        .await
    {
        Ok(dto) => {
            let status = if dto.credited {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(dto)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn read_slip_form(mut multipart: Multipart) -> Result<(Vec<u8>, Option<i64>), PaymentError> {
    let mut image = None;
    let mut project_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| PaymentError::InvalidPayload(format!("invalid multipart body: {err}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("slip") => {
                let bytes = field.bytes().await.map_err(|err| {
                    PaymentError::InvalidPayload(format!("could not read slip file: {err}"))
                })?;
                image = Some(bytes.to_vec());
            }
            Some("project_id") => {
                let text = field.text().await.map_err(|err| {
                    PaymentError::InvalidPayload(format!("could not read project_id: {err}"))
                })?;
                let text = text.trim();
                if !text.is_empty() {
                    let id = text
                        .parse::<i64>()
                        .ok()
                        .filter(|id| *id > 0)
                        .ok_or_else(|| PaymentError::InvalidPayload("project_id is invalid".to_string()))?;
                    project_id = Some(id);
                }
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| PaymentError::InvalidPayload("slip file is required".to_string()))?;
    Ok((image, project_id))
}
