//! # foodzone-service
//!
//! License protocol services. `LicenseService` implements the public
//! activate / verify / check operations used by devices, and
//! `AdminLicenseService` the operator surface (minting, deactivation and
//! audit queries).
//!
//! Services are stateless; all state lives in the injected
//! [`LicenseStore`](foodzone_core::ports::LicenseStore).

pub mod license;

pub use license::{
    AdminLicenseService, DEFAULT_ATTEMPT_LIMIT, LicenseService, MAX_GENERATE_BATCH,
    SUSPICIOUS_ATTEMPT_THRESHOLD,
};
