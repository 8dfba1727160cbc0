pub mod gateway_statuses;
pub mod payment_rails;
pub mod payment_statuses;
