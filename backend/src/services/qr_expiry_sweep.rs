use chrono::Utc;
use crates::domain::repositories::payment_attempts::PaymentAttemptRepository;
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

use crate::usecases::qr_payments::expire_stale_attempts;

/// Fails QR attempts left pending past their deadline, forever, every `interval`.
pub async fn run_qr_expiry_sweep<A>(attempt_repo: Arc<A>, interval: Duration)
where
    A: PaymentAttemptRepository + Send + Sync + 'static,
{
    info!(
        interval_secs = interval.as_secs(),
        "qr expiry sweep: started"
    );

    loop {
        tokio::time::sleep(interval).await;

        if let Err(err) = expire_stale_attempts(attempt_repo.as_ref(), Utc::now()).await {
            error!(error = %err, "qr expiry sweep: pass failed");
        }
    }
}
