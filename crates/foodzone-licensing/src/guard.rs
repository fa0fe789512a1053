//! Startup license check and activation flow for a device.

use chrono::{Duration, Utc};
use foodzone_core::api::ActivateRequest;
use foodzone_core::license::Verification;
use foodzone_core::{Error, LicenseKey, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::LicenseApi;
use crate::device::DeviceIdentity;
use crate::storage::KeyValueStore;
use crate::types::{DenialReason, DeviceProfile, LicenseVerdict, LocalLicenseAssertion, VerdictSource};

pub const LICENSE_STORAGE_KEY: &str = "app_license";

/// How far the last verification may sit ahead of the local clock before
/// the clock is treated as rolled back.
const CLOCK_SKEW_TOLERANCE_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// How long a previously verified license stays usable without reaching
    /// the service.
    pub offline_grace: Duration,
    /// Upper bound on a single call to the service.
    pub verify_timeout: std::time::Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            offline_grace: Duration::days(7),
            verify_timeout: std::time::Duration::from_secs(10),
        }
    }
}

/// Decides whether this device may run, and binds it to a license.
pub struct LicenseGuard {
    api: Arc<dyn LicenseApi>,
    store: Arc<dyn KeyValueStore>,
    profile: DeviceProfile,
    config: GuardConfig,
}

impl LicenseGuard {
    pub fn new(
        api: Arc<dyn LicenseApi>,
        store: Arc<dyn KeyValueStore>,
        profile: DeviceProfile,
        config: GuardConfig,
    ) -> Self {
        Self {
            api,
            store,
            profile,
            config,
        }
    }

    pub async fn device_identity(&self) -> Result<DeviceIdentity> {
        DeviceIdentity::load_or_create(self.store.as_ref(), &self.profile).await
    }

    /// The cached assertion, if any. An unreadable cache counts as none.
    pub async fn current(&self) -> Result<Option<LocalLicenseAssertion>> {
        let Some(raw) = self.store.get(LICENSE_STORAGE_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(assertion) => Ok(Some(assertion)),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable license cache");
                self.store.remove(LICENSE_STORAGE_KEY).await?;
                Ok(None)
            }
        }
    }

    /// Run at application start.
    pub async fn startup_check(&self) -> Result<LicenseVerdict> {
        let Some(mut assertion) = self.current().await? else {
            return Ok(LicenseVerdict::Invalid(DenialReason::NoLicense));
        };

        let identity = self.device_identity().await?;
        if assertion.device_id != identity.as_str() {
            warn!(
                cached = %assertion.device_id,
                current = %identity,
                "Device mismatch, clearing license"
            );
            self.deactivate().await?;
            return Ok(LicenseVerdict::Invalid(DenialReason::DeviceMismatch));
        }

        let now = Utc::now();
        if assertion.is_expired_at(now) {
            warn!(license_key = %assertion.license_key, "Cached license expired");
            self.deactivate().await?;
            return Ok(LicenseVerdict::Invalid(DenialReason::Expired));
        }

        let verified = tokio::time::timeout(
            self.config.verify_timeout,
            self.api.verify(&assertion.license_key, identity.as_str()),
        )
        .await
        .unwrap_or_else(|_| Err(Error::Network("License verification timed out".to_string())));

        match verified {
            Ok(Verification::Valid {
                business_name,
                expires_at,
            }) => {
                if let Some(name) = business_name {
                    assertion.business_name = name;
                }
                assertion.expires_at = expires_at;
                assertion.is_active = true;
                assertion.last_verified_at = Some(now);
                self.persist(&assertion).await?;
                debug!(license_key = %assertion.license_key, "License verified online");
                Ok(LicenseVerdict::Valid {
                    assertion,
                    source: VerdictSource::Online,
                })
            }
            Ok(Verification::Invalid(reason)) => {
                warn!(license_key = %assertion.license_key, reason = %reason, "License refused by service");
                self.deactivate().await?;
                Ok(LicenseVerdict::Invalid(DenialReason::Revoked(reason)))
            }
            Err(Error::Network(e)) => {
                warn!(error = %e, "License service unreachable, checking offline grace");
                Ok(self.offline_verdict(assertion, now))
            }
            Err(e) => Err(e),
        }
    }

    fn offline_verdict(
        &self,
        assertion: LocalLicenseAssertion,
        now: chrono::DateTime<Utc>,
    ) -> LicenseVerdict {
        let anchor = assertion.verified_anchor();
        if anchor > now + Duration::minutes(CLOCK_SKEW_TOLERANCE_MINUTES) {
            warn!(
                license_key = %assertion.license_key,
                anchor = %anchor,
                "Last verification is in the future, device clock moved back"
            );
            return LicenseVerdict::Invalid(DenialReason::GraceExhausted);
        }
        let elapsed = (now - anchor).max(Duration::zero());
        if elapsed > self.config.offline_grace {
            warn!(
                license_key = %assertion.license_key,
                offline_hours = elapsed.num_hours(),
                "Offline grace exhausted"
            );
            return LicenseVerdict::Invalid(DenialReason::GraceExhausted);
        }
        LicenseVerdict::Valid {
            assertion,
            source: VerdictSource::OfflineGrace {
                remaining: self.config.offline_grace - elapsed,
            },
        }
    }

    /// Bind this device to `license_key` and cache the result.
    pub async fn activate(
        &self,
        license_key: &str,
        business_name: &str,
    ) -> Result<LocalLicenseAssertion> {
        let license_key = LicenseKey::parse(&license_key.trim().to_uppercase())?;
        let business_name = business_name.trim();
        if business_name.is_empty() {
            return Err(Error::Validation("Business name required".to_string()));
        }

        let identity = self.device_identity().await?;
        let request = ActivateRequest {
            license_key: Some(license_key.to_string()),
            device_id: Some(identity.to_string()),
            device_info: Some(self.profile.device_info()),
            business_name: Some(business_name.to_string()),
        };

        let response = tokio::time::timeout(self.config.verify_timeout, self.api.activate(&request))
            .await
            .unwrap_or_else(|_| Err(Error::Network("License activation timed out".to_string())))?;

        let now = Utc::now();
        let assertion = LocalLicenseAssertion {
            license_key: license_key.into(),
            business_name: business_name.to_string(),
            device_id: identity.to_string(),
            activated_at: now,
            expires_at: response.expires_at,
            is_active: true,
            last_verified_at: Some(now),
        };
        self.persist(&assertion).await?;

        info!(
            license_key = %assertion.license_key,
            device_id = %assertion.device_id,
            message = %response.message,
            "License activated on this device"
        );
        Ok(assertion)
    }

    /// Forget the local license. The server-side binding is untouched.
    pub async fn deactivate(&self) -> Result<()> {
        self.store.remove(LICENSE_STORAGE_KEY).await
    }

    async fn persist(&self, assertion: &LocalLicenseAssertion) -> Result<()> {
        let raw = serde_json::to_string(assertion)?;
        self.store.set(LICENSE_STORAGE_KEY, &raw).await
    }
}
