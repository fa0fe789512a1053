//! License records, audit entries and protocol outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// License status.
///
/// A deactivated license goes back to `Pending` with its device cleared;
/// there is no separate terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Pending,
    Active,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Pending => "pending",
            LicenseStatus::Active => "active",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LicenseStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(LicenseStatus::Pending),
            "active" => Ok(LicenseStatus::Active),
            other => Err(crate::Error::Serialization(format!(
                "Unknown license status: {}",
                other
            ))),
        }
    }
}

/// Device metadata captured at activation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    /// Any other keys the client sent, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The unit of entitlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    pub id: i64,
    pub license_key: String,
    pub business_name: Option<String>,
    pub device_id: Option<String>,
    pub device_info: Option<DeviceInfo>,
    pub status: LicenseStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub last_verified_at: Option<DateTime<Utc>>,
}

impl LicenseRecord {
    /// Whether the license had expired at `now`. Perpetual licenses never do.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    pub fn is_active(&self) -> bool {
        self.status == LicenseStatus::Active
    }

    pub fn is_bound_to(&self, device_id: &str) -> bool {
        self.device_id.as_deref() == Some(device_id)
    }
}

/// Fields written when a pending license binds to a device.
#[derive(Debug, Clone)]
pub struct DeviceBinding {
    pub device_id: String,
    pub device_info: DeviceInfo,
    pub business_name: String,
}

/// An activation call as received from a client.
///
/// Required fields are optional here so that "missing" can be reported as a
/// validation failure rather than a decoding failure.
#[derive(Debug, Clone, Default)]
pub struct ActivationRequest {
    pub license_key: Option<String>,
    pub device_id: Option<String>,
    pub device_info: DeviceInfo,
    pub business_name: Option<String>,
    /// Caller address, when the transport knows it.
    pub ip_address: Option<String>,
}

/// Audit entry to append for an activation call.
#[derive(Debug, Clone)]
pub struct NewActivationAttempt {
    pub license_key: String,
    pub device_id: String,
    pub device_info: Option<DeviceInfo>,
    pub business_name: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub ip_address: Option<String>,
}

/// Append-only record of an activation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationAttempt {
    pub id: i64,
    pub license_key: String,
    pub device_id: String,
    pub device_info: Option<DeviceInfo>,
    pub business_name: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub ip_address: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

/// Append-only record of a successful verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationLog {
    pub id: i64,
    pub license_key: String,
    pub device_id: String,
    pub verified_at: DateTime<Utc>,
}

/// A (key, device) pair with repeated failed activations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousActivity {
    pub license_key: String,
    pub device_id: String,
    pub attempt_count: i64,
}

/// Aggregate license counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStats {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    /// Records whose expiry is in the past, regardless of status.
    pub expired: usize,
}

impl LicenseStats {
    pub fn from_records(records: &[LicenseRecord], now: DateTime<Utc>) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            stats.total += 1;
            match record.status {
                LicenseStatus::Active => stats.active += 1,
                LicenseStatus::Pending => stats.pending += 1,
            }
            if record.is_expired_at(now) {
                stats.expired += 1;
            }
            stats
        })
    }
}

/// Read-only view returned by the existence lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSummary {
    pub status: LicenseStatus,
    pub business_name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&LicenseRecord> for LicenseSummary {
    fn from(record: &LicenseRecord) -> Self {
        Self {
            status: record.status,
            business_name: record.business_name.clone(),
            expires_at: record.expires_at,
        }
    }
}

/// Why a verification was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    NotFound,
    NotActivated,
    DeviceMismatch,
    Expired,
    /// A refusal whose message this build does not know. Clients still treat
    /// it as a refusal; the server never produces it.
    Other,
}

impl InvalidReason {
    pub fn message(&self) -> &'static str {
        match self {
            InvalidReason::NotFound => "License not found",
            InvalidReason::NotActivated => "License not activated",
            InvalidReason::DeviceMismatch => "Device mismatch",
            InvalidReason::Expired => "License expired",
            InvalidReason::Other => "License invalid",
        }
    }

    /// Map a wire message back to a known reason.
    pub fn from_message(message: &str) -> Option<Self> {
        [
            InvalidReason::NotFound,
            InvalidReason::NotActivated,
            InvalidReason::DeviceMismatch,
            InvalidReason::Expired,
        ]
        .into_iter()
        .find(|reason| reason.message() == message)
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid {
        business_name: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    },
    Invalid(InvalidReason),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid { .. })
    }
}

/// Outcome of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub message: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// False when the device was already bound and the call was a no-op.
    pub newly_bound: bool,
}

/// A key minted by the admin batch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLicense {
    pub id: i64,
    pub license_key: String,
    pub expires_at: Option<DateTime<Utc>>,
}
