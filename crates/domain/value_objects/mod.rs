pub mod donations;
pub mod earmarks;
pub mod enums;
pub mod gateway_callbacks;
pub mod project_progress;
pub mod qr_payments;
pub mod receiver_identity;
pub mod slip_verifications;
pub mod verified_payments;
