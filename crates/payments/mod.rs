pub mod gateway_client;
pub mod slip_client;
