//! Operator surface: minting keys, releasing bindings and audit queries.

use chrono::Utc;
use foodzone_core::license::{
    ActivationAttempt, GeneratedLicense, LicenseRecord, LicenseStats, SuspiciousActivity,
};
use foodzone_core::ports::LicenseStore;
use foodzone_core::{Error, LicenseKey, Result, expiry_from_months};
use std::sync::Arc;
use tracing::{info, warn};

/// Failed attempts per (key, device) above which a pair is flagged.
pub const SUSPICIOUS_ATTEMPT_THRESHOLD: u32 = 3;

/// Largest batch a single generate call may mint.
pub const MAX_GENERATE_BATCH: u32 = 1000;

/// Default page size for the attempts listing.
pub const DEFAULT_ATTEMPT_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct AdminLicenseService {
    store: Arc<dyn LicenseStore>,
}

impl AdminLicenseService {
    pub fn new(store: Arc<dyn LicenseStore>) -> Self {
        Self { store }
    }

    /// Mint `count` pending licenses (default 1). Every key in the batch
    /// shares one expiry, `months` from now, or none when `months` is absent
    /// or zero.
    ///
    /// A key that collides with an existing one is skipped, so the result
    /// may be shorter than `count`.
    pub async fn generate(
        &self,
        count: Option<u32>,
        months: Option<u32>,
    ) -> Result<Vec<GeneratedLicense>> {
        let count = count.unwrap_or(1);
        if count == 0 || count > MAX_GENERATE_BATCH {
            return Err(Error::Validation(format!(
                "count must be between 1 and {}",
                MAX_GENERATE_BATCH
            )));
        }
        // Zero months means no subscription, same as absent.
        let expires_at = match months {
            Some(months) if months > 0 => Some(expiry_from_months(months, Utc::now())?),
            _ => None,
        };

        let mut generated = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = LicenseKey::generate();
            match self.store.create(&key, expires_at).await {
                Ok(id) => generated.push(GeneratedLicense {
                    id,
                    license_key: key.into(),
                    expires_at,
                }),
                Err(Error::DuplicateKey(key)) => {
                    warn!(license_key = %key, "Generated key collided, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            requested = count,
            generated = generated.len(),
            expires_at = ?expires_at,
            "Generated licenses"
        );
        Ok(generated)
    }

    /// Release a license's device binding so it can be activated again.
    ///
    /// Returns whether a record was touched. An unknown key is not an error.
    pub async fn deactivate(&self, license_key: &str) -> Result<bool> {
        let license_key = license_key.trim();
        if license_key.is_empty() {
            return Err(Error::Validation("License key required".to_string()));
        }
        let reset = self.store.reset_binding(license_key).await?;
        if reset {
            info!(license_key, "License deactivated");
        } else {
            warn!(license_key, "Deactivate requested for unknown license");
        }
        Ok(reset)
    }

    pub async fn list_licenses(&self) -> Result<Vec<LicenseRecord>> {
        self.store.list_all().await
    }

    pub async fn recent_attempts(&self, limit: Option<u32>) -> Result<Vec<ActivationAttempt>> {
        let limit = limit.unwrap_or(DEFAULT_ATTEMPT_LIMIT).clamp(1, DEFAULT_ATTEMPT_LIMIT);
        self.store.list_activation_attempts(limit).await
    }

    pub async fn suspicious_activity(&self) -> Result<Vec<SuspiciousActivity>> {
        self.store
            .find_suspicious(SUSPICIOUS_ATTEMPT_THRESHOLD)
            .await
    }

    pub async fn stats(&self) -> Result<LicenseStats> {
        let records = self.store.list_all().await?;
        Ok(LicenseStats::from_records(&records, Utc::now()))
    }
}
