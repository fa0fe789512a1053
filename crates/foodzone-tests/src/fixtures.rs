//! Test fixtures for creating sample data.

use chrono::{Duration, Utc};
use foodzone_core::LicenseKey;
use foodzone_core::api::ActivateRequest;
use foodzone_core::license::{ActivationRequest, DeviceInfo};
use foodzone_core::ports::LicenseStore;
use foodzone_licensing::DeviceProfile;

use crate::context::TestContext;

pub const BUSINESS: &str = "Cafe X";

/// Factory for activation payloads.
pub struct ActivationFixture;

impl ActivationFixture {
    /// Wire body for `POST /api/license/activate`.
    pub fn body(license_key: &str, device_id: &str) -> ActivateRequest {
        ActivateRequest {
            license_key: Some(license_key.to_string()),
            device_id: Some(device_id.to_string()),
            device_info: Some(Self::device_info()),
            business_name: Some(BUSINESS.to_string()),
        }
    }

    /// Service-level request.
    pub fn request(license_key: &str, device_id: &str) -> ActivationRequest {
        ActivationRequest {
            license_key: Some(license_key.to_string()),
            device_id: Some(device_id.to_string()),
            device_info: Self::device_info(),
            business_name: Some(BUSINESS.to_string()),
            ip_address: Some("10.0.0.7".to_string()),
        }
    }

    pub fn device_info() -> DeviceInfo {
        DeviceInfo {
            model: Some("Pixel 8".to_string()),
            os: Some("android".to_string()),
            os_version: Some("14".to_string()),
            ..Default::default()
        }
    }
}

/// Factory for licenses already present in the store.
pub struct LicenseFixture;

impl LicenseFixture {
    /// Mint one pending license and return its key.
    pub async fn pending(ctx: &TestContext, months: Option<u32>) -> anyhow::Result<String> {
        let mut minted = ctx.admin().generate(Some(1), months).await?;
        let license = minted
            .pop()
            .ok_or_else(|| anyhow::anyhow!("no license minted"))?;
        Ok(license.license_key)
    }

    /// Mint a license and bind it to `device_id`.
    pub async fn active(ctx: &TestContext, device_id: &str) -> anyhow::Result<String> {
        let key = Self::pending(ctx, None).await?;
        ctx.licenses()
            .activate(ActivationFixture::request(&key, device_id))
            .await?;
        Ok(key)
    }

    /// Insert a pending license whose expiry is already in the past.
    pub async fn expired(ctx: &TestContext) -> anyhow::Result<String> {
        let key = LicenseKey::generate();
        let expired_at = Utc::now() - Duration::days(1);
        ctx.store().create(&key, Some(expired_at)).await?;
        Ok(key.into())
    }
}

/// A fixed device profile so generated device ids are predictable.
pub fn test_profile() -> DeviceProfile {
    DeviceProfile {
        model: "test-host".to_string(),
        os: "linux".to_string(),
        os_version: "x86_64".to_string(),
    }
}
