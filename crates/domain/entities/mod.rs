pub mod app_users;
pub mod fundraising_projects;
pub mod payment_attempts;
pub mod payment_records;
pub mod user_balances;
