//! Device binding client for Food Zone licenses.
//!
//! Runs on the device. Activates a key against the license service, caches
//! the result locally and re-verifies at startup, tolerating a bounded
//! offline period.

pub mod client;
pub mod device;
pub mod guard;
pub mod storage;
pub mod types;

pub use client::{HttpLicenseApi, LicenseApi};
pub use device::DeviceIdentity;
pub use guard::{GuardConfig, LicenseGuard};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::{DenialReason, DeviceProfile, LicenseVerdict, LocalLicenseAssertion, VerdictSource};
