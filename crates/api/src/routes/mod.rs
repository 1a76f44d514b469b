pub mod auth;
pub mod lead;
pub mod notification;
pub mod user;
