pub mod auth;
pub mod datetime;
pub mod embed;
pub mod error;
pub mod pagination;
