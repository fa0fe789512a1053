//! Stable per-installation device identifier.

use chrono::Utc;
use foodzone_core::Result;
use std::fmt;
use tracing::info;

use crate::storage::KeyValueStore;
use crate::types::DeviceProfile;

pub const DEVICE_ID_KEY: &str = "device_id";

/// Opaque identifier generated once and persisted. It is not derived from
/// hardware, so reinstalling the app yields a new identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub async fn load_or_create(
        store: &dyn KeyValueStore,
        profile: &DeviceProfile,
    ) -> Result<Self> {
        if let Some(existing) = store.get(DEVICE_ID_KEY).await? {
            let existing = existing.trim();
            if !existing.is_empty() {
                return Ok(Self(existing.to_string()));
            }
        }

        let id = format!(
            "{}-{}-{}",
            profile.model,
            profile.os_version,
            Utc::now().timestamp_millis()
        );
        store.set(DEVICE_ID_KEY, &id).await?;
        info!(device_id = %id, "Created device identity");
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
