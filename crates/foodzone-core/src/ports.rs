//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the license protocol and its
//! persistence adapter.

use crate::Result;
use crate::keys::LicenseKey;
use crate::license::{
    ActivationAttempt, DeviceBinding, LicenseRecord, NewActivationAttempt, SuspiciousActivity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable system of record for licenses and their audit trail.
///
/// Every write must be persisted before the call returns.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Create a pending license. Fails with `Error::DuplicateKey` on collision.
    async fn create(&self, key: &LicenseKey, expires_at: Option<DateTime<Utc>>) -> Result<i64>;

    /// Get a license by key.
    async fn get_by_key(&self, key: &str) -> Result<Option<LicenseRecord>>;

    /// Atomically move a pending license to active and bind the device.
    ///
    /// Returns false when the license was not pending at write time, which
    /// means a concurrent activation won the race.
    async fn bind_device(&self, key: &str, binding: &DeviceBinding) -> Result<bool>;

    /// Refresh `last_verified_at`.
    async fn touch_verified(&self, key: &str) -> Result<()>;

    /// Reset a license to pending and clear its device. Returns false if
    /// the key does not exist.
    async fn reset_binding(&self, key: &str) -> Result<bool>;

    /// All licenses, newest first.
    async fn list_all(&self) -> Result<Vec<LicenseRecord>>;

    /// Append an activation audit entry.
    async fn append_activation_attempt(&self, attempt: &NewActivationAttempt) -> Result<()>;

    /// Append a verification audit entry.
    async fn append_verification_log(&self, key: &str, device_id: &str) -> Result<()>;

    /// Most recent activation attempts, newest first.
    async fn list_activation_attempts(&self, limit: u32) -> Result<Vec<ActivationAttempt>>;

    /// (key, device) pairs whose failed-attempt count exceeds `threshold`,
    /// highest count first.
    async fn find_suspicious(&self, threshold: u32) -> Result<Vec<SuspiciousActivity>>;
}
