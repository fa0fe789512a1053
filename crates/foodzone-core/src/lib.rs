//! Food Zone Core
//!
//! Core domain types, traits, and error handling for the Food Zone license
//! service. This crate has minimal dependencies and defines the shared
//! vocabulary used by the store, the service, the HTTP surface and the
//! device client.

pub mod api;
pub mod error;
pub mod keys;
pub mod license;
pub mod ports;

pub use error::{Error, Result};
pub use keys::{LicenseKey, expiry_from_months};
pub use license::*;
