//! JSON bodies exchanged over the license HTTP surface.
//!
//! Shared by the server handlers and the HTTP clients so both sides agree on
//! field names. Required request fields are `Option` so a missing field is
//! reported by the service as a validation failure, not a decoding error.

use crate::license::{
    ActivationAttempt, DeviceInfo, GeneratedLicense, LicenseRecord, LicenseStats, LicenseStatus,
    LicenseSummary, SuspiciousActivity, Verification,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
    #[serde(default)]
    pub business_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// `{valid:true, businessName, expiresAt}` or `{valid:false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Verification> for VerifyResponse {
    fn from(verification: Verification) -> Self {
        match verification {
            Verification::Valid {
                business_name,
                expires_at,
            } => Self {
                valid: true,
                business_name,
                expires_at,
                error: None,
            },
            Verification::Invalid(reason) => Self {
                valid: false,
                business_name: None,
                expires_at: None,
                error: Some(reason.message().to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    #[serde(default)]
    pub license_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LicenseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Option<LicenseSummary>> for CheckResponse {
    fn from(summary: Option<LicenseSummary>) -> Self {
        match summary {
            Some(summary) => Self {
                exists: true,
                status: Some(summary.status),
                business_name: summary.business_name,
                expires_at: summary.expires_at,
                message: None,
            },
            None => Self {
                exists: false,
                status: None,
                business_name: None,
                expires_at: None,
                message: Some("License not found".to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub subscription_months: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub count: usize,
    pub licenses: Vec<GeneratedLicense>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseListResponse {
    pub success: bool,
    pub count: usize,
    pub licenses: Vec<LicenseRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptsResponse {
    pub success: bool,
    pub attempts: Vec<ActivationAttempt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousResponse {
    pub success: bool,
    pub suspicious: Vec<SuspiciousActivity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateRequest {
    #[serde(default)]
    pub license_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: LicenseStats,
}

/// Failure body. The leading flag depends on the endpoint (`success`,
/// `valid` or `exists`) and is always false; admin auth failures carry only
/// `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::InvalidReason;
    use serde_json::json;

    #[test]
    fn test_verify_response_shapes() {
        let valid = VerifyResponse::from(Verification::Valid {
            business_name: Some("Cafe X".into()),
            expires_at: None,
        });
        assert_eq!(
            serde_json::to_value(&valid).unwrap(),
            json!({"valid": true, "businessName": "Cafe X"})
        );

        let invalid = VerifyResponse::from(Verification::Invalid(InvalidReason::DeviceMismatch));
        assert_eq!(
            serde_json::to_value(&invalid).unwrap(),
            json!({"valid": false, "error": "Device mismatch"})
        );
    }

    #[test]
    fn test_check_response_for_unknown_key() {
        let body = serde_json::to_value(CheckResponse::from(None)).unwrap();
        assert_eq!(body, json!({"exists": false, "message": "License not found"}));
    }

    #[test]
    fn test_activate_request_tolerates_missing_fields() {
        let req: ActivateRequest = serde_json::from_value(json!({"licenseKey": "FOOD-1"})).unwrap();
        assert_eq!(req.license_key.as_deref(), Some("FOOD-1"));
        assert!(req.device_id.is_none());
        assert!(req.device_info.is_none());
    }
}
