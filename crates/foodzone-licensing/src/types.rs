//! Client-side license types.

use chrono::{DateTime, Duration, Utc};
use foodzone_core::license::{DeviceInfo, InvalidReason};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the device remembers about its activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalLicenseAssertion {
    pub license_key: String,
    pub business_name: String,
    pub device_id: String,
    pub activated_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// When the service last confirmed this license. Anchors the offline
    /// grace period. Older caches without it fall back to `activated_at`.
    #[serde(default)]
    pub last_verified_at: Option<DateTime<Utc>>,
}

impl LocalLicenseAssertion {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    pub fn verified_anchor(&self) -> DateTime<Utc> {
        self.last_verified_at.unwrap_or(self.activated_at)
    }
}

/// How a valid verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Online,
    /// Service unreachable; the cached assertion is trusted for `remaining`
    /// more time.
    OfflineGrace { remaining: Duration },
}

/// Why the device is not licensed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    NoLicense,
    DeviceMismatch,
    Expired,
    /// The service explicitly refused the license.
    Revoked(InvalidReason),
    /// Offline for longer than the grace period. The assertion is kept so a
    /// later online check can recover.
    GraceExhausted,
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::NoLicense => f.write_str("No license activated"),
            DenialReason::DeviceMismatch => f.write_str("Device mismatch"),
            DenialReason::Expired => f.write_str("License expired"),
            DenialReason::Revoked(reason) => write!(f, "License revoked: {}", reason),
            DenialReason::GraceExhausted => {
                f.write_str("Offline grace period exhausted; connect to verify")
            }
        }
    }
}

/// Outcome of a startup check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseVerdict {
    Valid {
        assertion: LocalLicenseAssertion,
        source: VerdictSource,
    },
    Invalid(DenialReason),
}

impl LicenseVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, LicenseVerdict::Valid { .. })
    }
}

/// Hardware description sent with an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub model: String,
    pub os: String,
    pub os_version: String,
}

impl DeviceProfile {
    /// Describe the current machine. The hostname stands in for the model
    /// and the CPU architecture for the OS version.
    pub fn current() -> Self {
        let model = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            model,
            os: std::env::consts::OS.to_string(),
            os_version: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            model: Some(self.model.clone()),
            os: Some(self.os.clone()),
            os_version: Some(self.os_version.clone()),
            extra: BTreeMap::new(),
        }
    }
}
