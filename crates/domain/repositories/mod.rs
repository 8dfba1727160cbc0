pub mod app_users;
pub mod ledger;
pub mod payment_attempts;
