pub mod donations;
pub mod gateway_verification;
pub mod gateway_webhook;
pub mod ledger;
pub mod qr_payments;
pub mod slip_deposits;

#[cfg(test)]
pub(crate) mod testing;
