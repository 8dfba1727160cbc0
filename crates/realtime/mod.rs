pub mod donation_feed;
pub mod http_feed;
