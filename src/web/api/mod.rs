pub mod chat;
pub mod error;
pub mod fetch;
pub mod geocode;
