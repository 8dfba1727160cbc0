pub mod donations;
pub mod gateway_webhook;
pub mod qr_payments;
pub mod slip_deposits;
