//! Request handlers organized by resource.

pub mod admin;
pub mod health;
pub mod license;
