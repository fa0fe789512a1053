//! Public license operations called by devices.

use chrono::Utc;
use foodzone_core::license::{
    Activation, ActivationRequest, DeviceBinding, InvalidReason, LicenseRecord, LicenseSummary,
    NewActivationAttempt, Verification,
};
use foodzone_core::ports::LicenseStore;
use foodzone_core::{Error, LicenseKey, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ALREADY_BOUND_ELSEWHERE: &str = "License already activated on another device";
const TRANSFER_HINT: &str = "Contact support to transfer license";

/// How many times activation re-reads the record after losing a binding
/// race before giving up.
const MAX_BIND_ROUNDS: usize = 3;

/// Activate / verify / check against the license store.
#[derive(Clone)]
pub struct LicenseService {
    store: Arc<dyn LicenseStore>,
}

impl LicenseService {
    pub fn new(store: Arc<dyn LicenseStore>) -> Self {
        Self { store }
    }

    /// Bind a license to the calling device.
    ///
    /// Same-device re-activation is an idempotent success. A different
    /// device against an active license is rejected with
    /// [`Error::Conflict`] and the attempt is recorded for review.
    pub async fn activate(&self, request: ActivationRequest) -> Result<Activation> {
        let (Some(license_key), Some(device_id), Some(business_name)) = (
            non_blank(request.license_key.as_deref()),
            non_blank(request.device_id.as_deref()),
            non_blank(request.business_name.as_deref()),
        ) else {
            return Err(Error::Validation(
                "Missing required fields: licenseKey, deviceId, businessName".to_string(),
            ));
        };

        if !LicenseKey::is_valid_format(license_key) {
            return Err(Error::Validation("Invalid license key format".to_string()));
        }

        let binding = DeviceBinding {
            device_id: device_id.to_string(),
            device_info: request.device_info.clone(),
            business_name: business_name.to_string(),
        };

        for _ in 0..MAX_BIND_ROUNDS {
            let record = self.load(license_key).await?;

            if record.is_expired_at(Utc::now()) {
                debug!(license_key, "Activation refused: expired");
                return Err(Error::Expired);
            }

            if record.is_active() {
                return self.activate_bound(&record, &binding, &request).await;
            }

            if self.store.bind_device(license_key, &binding).await? {
                self.store
                    .append_activation_attempt(&attempt(&binding, license_key, &request, None))
                    .await?;
                info!(license_key, device_id, business_name, "License activated");
                return Ok(Activation {
                    message: "License activated successfully".to_string(),
                    expires_at: record.expires_at,
                    newly_bound: true,
                });
            }

            debug!(license_key, device_id, "Lost activation race, re-reading license");
        }

        Err(Error::Internal(format!(
            "Activation of {} did not settle after {} rounds",
            license_key, MAX_BIND_ROUNDS
        )))
    }

    /// Activation against a license that is already active.
    async fn activate_bound(
        &self,
        record: &LicenseRecord,
        binding: &DeviceBinding,
        request: &ActivationRequest,
    ) -> Result<Activation> {
        let license_key = record.license_key.as_str();

        if record.is_bound_to(&binding.device_id) {
            self.store.touch_verified(license_key).await?;
            debug!(license_key, device_id = %binding.device_id, "License already bound to this device");
            return Ok(Activation {
                message: "License already activated on this device".to_string(),
                expires_at: record.expires_at,
                newly_bound: false,
            });
        }

        self.store
            .append_activation_attempt(&attempt(
                binding,
                license_key,
                request,
                Some(ALREADY_BOUND_ELSEWHERE),
            ))
            .await?;
        warn!(
            license_key,
            device_id = %binding.device_id,
            ip_address = request.ip_address.as_deref().unwrap_or("-"),
            "Activation rejected: license bound to another device"
        );
        Err(Error::Conflict {
            message: ALREADY_BOUND_ELSEWHERE.to_string(),
            hint: Some(TRANSFER_HINT.to_string()),
        })
    }

    /// Confirm a previously activated license is still valid for `device_id`.
    pub async fn verify(&self, license_key: &str, device_id: &str) -> Result<Verification> {
        let (Some(license_key), Some(device_id)) =
            (non_blank(Some(license_key)), non_blank(Some(device_id)))
        else {
            return Err(Error::Validation(
                "Missing required fields: licenseKey, deviceId".to_string(),
            ));
        };

        let Some(record) = self.store.get_by_key(license_key).await? else {
            return Ok(invalid(license_key, InvalidReason::NotFound));
        };

        if !record.is_active() {
            return Ok(invalid(license_key, InvalidReason::NotActivated));
        }

        if !record.is_bound_to(device_id) {
            return Ok(invalid(license_key, InvalidReason::DeviceMismatch));
        }

        if record.is_expired_at(Utc::now()) {
            return Ok(invalid(license_key, InvalidReason::Expired));
        }

        self.store.touch_verified(license_key).await?;
        self.store
            .append_verification_log(license_key, device_id)
            .await?;

        debug!(license_key, device_id, "License verified");
        Ok(Verification::Valid {
            business_name: record.business_name,
            expires_at: record.expires_at,
        })
    }

    /// Read-only existence lookup. Not a security gate.
    pub async fn check(&self, license_key: &str) -> Result<Option<LicenseSummary>> {
        let Some(license_key) = non_blank(Some(license_key)) else {
            return Err(Error::Validation("License key required".to_string()));
        };
        let record = self.store.get_by_key(license_key).await?;
        Ok(record.as_ref().map(LicenseSummary::from))
    }

    async fn load(&self, license_key: &str) -> Result<LicenseRecord> {
        self.store
            .get_by_key(license_key)
            .await?
            .ok_or_else(|| Error::NotFound("License key not found".to_string()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(license_key: &str, reason: InvalidReason) -> Verification {
    debug!(license_key, reason = %reason, "Verification refused");
    Verification::Invalid(reason)
}

fn attempt(
    binding: &DeviceBinding,
    license_key: &str,
    request: &ActivationRequest,
    error: Option<&str>,
) -> NewActivationAttempt {
    NewActivationAttempt {
        license_key: license_key.to_string(),
        device_id: binding.device_id.clone(),
        device_info: Some(binding.device_info.clone()),
        business_name: Some(binding.business_name.clone()),
        success: error.is_none(),
        error_message: error.map(str::to_string),
        ip_address: request.ip_address.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::test_support::fixture;
    use chrono::Duration;
    use foodzone_core::license::{DeviceInfo, LicenseStatus};

    fn request(key: &str, device: &str) -> ActivationRequest {
        ActivationRequest {
            license_key: Some(key.to_string()),
            device_id: Some(device.to_string()),
            device_info: DeviceInfo {
                model: Some("Pixel 8".to_string()),
                ..Default::default()
            },
            business_name: Some("Cafe X".to_string()),
            ip_address: None,
        }
    }

    #[tokio::test]
    async fn test_activate_rejects_missing_fields() {
        let fx = fixture().await;
        let service = LicenseService::new(fx.store());

        let mut req = request("FOOD-AAAA-BBBB-CCCC", "dev1");
        req.business_name = Some("   ".to_string());
        let err = service.activate(req).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.starts_with("Missing required fields")));

        let mut req = request("FOOD-AAAA-BBBB-CCCC", "dev1");
        req.device_id = None;
        assert!(matches!(service.activate(req).await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_activate_rejects_bad_format_before_lookup() {
        let fx = fixture().await;
        let service = LicenseService::new(fx.store());

        let err = service
            .activate(request("food-aaaa-bbbb-cccc", "dev1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid license key format");
    }

    #[tokio::test]
    async fn test_activate_unknown_key_is_not_found() {
        let fx = fixture().await;
        let service = LicenseService::new(fx.store());

        let err = service
            .activate(request("FOOD-AAAA-BBBB-CCCC", "dev1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_activate_binds_pending_license() {
        let fx = fixture().await;
        let store = fx.store();
        let key = LicenseKey::generate();
        store.create(&key, None).await.unwrap();

        let service = LicenseService::new(store.clone());
        let activation = service.activate(request(key.as_str(), "dev1")).await.unwrap();
        assert!(activation.newly_bound);
        assert_eq!(activation.message, "License activated successfully");

        let record = store.get_by_key(key.as_str()).await.unwrap().unwrap();
        assert_eq!(record.status, LicenseStatus::Active);
        assert_eq!(record.device_id.as_deref(), Some("dev1"));
        assert_eq!(record.business_name.as_deref(), Some("Cafe X"));
        assert_eq!(
            record.device_info.and_then(|i| i.model).as_deref(),
            Some("Pixel 8")
        );
        assert!(record.activated_at.is_some());
        assert!(record.last_verified_at.is_some());
    }

    #[tokio::test]
    async fn test_activate_same_device_is_idempotent() {
        let fx = fixture().await;
        let store = fx.store();
        let key = LicenseKey::generate();
        store.create(&key, None).await.unwrap();

        let service = LicenseService::new(store.clone());
        service.activate(request(key.as_str(), "dev1")).await.unwrap();
        let first = store.get_by_key(key.as_str()).await.unwrap().unwrap();

        let again = service.activate(request(key.as_str(), "dev1")).await.unwrap();
        assert!(!again.newly_bound);
        assert_eq!(again.message, "License already activated on this device");

        let second = store.get_by_key(key.as_str()).await.unwrap().unwrap();
        assert_eq!(second.activated_at, first.activated_at);
        assert!(second.last_verified_at >= first.last_verified_at);

        // Only the binding call is audited.
        let attempts = store.list_activation_attempts(10).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].success);
    }

    #[tokio::test]
    async fn test_activate_other_device_conflicts_and_is_recorded() {
        let fx = fixture().await;
        let store = fx.store();
        let key = LicenseKey::generate();
        store.create(&key, None).await.unwrap();

        let service = LicenseService::new(store.clone());
        service.activate(request(key.as_str(), "dev1")).await.unwrap();

        let mut req = request(key.as_str(), "dev2");
        req.ip_address = Some("10.0.0.7".to_string());
        let err = service.activate(req).await.unwrap_err();
        assert_eq!(err.to_string(), "License already activated on another device");
        assert_eq!(err.hint(), Some("Contact support to transfer license"));

        let record = store.get_by_key(key.as_str()).await.unwrap().unwrap();
        assert_eq!(record.device_id.as_deref(), Some("dev1"));

        let attempts = store.list_activation_attempts(10).await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert!(!attempts[0].success);
        assert_eq!(attempts[0].device_id, "dev2");
        assert_eq!(attempts[0].ip_address.as_deref(), Some("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_rebind_after_reset() {
        let fx = fixture().await;
        let store = fx.store();
        let key = LicenseKey::generate();
        store.create(&key, None).await.unwrap();

        let service = LicenseService::new(store.clone());
        service.activate(request(key.as_str(), "dev1")).await.unwrap();
        assert!(store.reset_binding(key.as_str()).await.unwrap());

        let activation = service.activate(request(key.as_str(), "dev2")).await.unwrap();
        assert!(activation.newly_bound);
        assert_eq!(
            service.verify(key.as_str(), "dev1").await.unwrap(),
            Verification::Invalid(InvalidReason::DeviceMismatch)
        );
    }

    #[tokio::test]
    async fn test_concurrent_activations_bind_one_device() {
        let fx = fixture().await;
        let store = fx.store();
        let key = LicenseKey::generate();
        store.create(&key, None).await.unwrap();
        let service = LicenseService::new(store.clone());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                let req = request(key.as_str(), &format!("dev{}", i));
                tokio::spawn(async move { service.activate(req).await })
            })
            .collect();

        let mut bound = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(activation) if activation.newly_bound => bound += 1,
                Err(Error::Conflict { .. }) => conflicts += 1,
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
        assert_eq!(bound, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn test_activate_expired_license() {
        let fx = fixture().await;
        let store = fx.store();
        let key = LicenseKey::generate();
        store
            .create(&key, Some(Utc::now() - Duration::days(1)))
            .await
            .unwrap();

        let service = LicenseService::new(store);
        let err = service.activate(request(key.as_str(), "dev1")).await.unwrap_err();
        assert!(matches!(err, Error::Expired));
    }

    #[tokio::test]
    async fn test_verify_reasons_in_order() {
        let fx = fixture().await;
        let store = fx.store();
        let service = LicenseService::new(store.clone());

        assert_eq!(
            service.verify("FOOD-AAAA-BBBB-CCCC", "dev1").await.unwrap(),
            Verification::Invalid(InvalidReason::NotFound)
        );

        let key = LicenseKey::generate();
        store.create(&key, None).await.unwrap();
        assert_eq!(
            service.verify(key.as_str(), "dev1").await.unwrap(),
            Verification::Invalid(InvalidReason::NotActivated)
        );

        service.activate(request(key.as_str(), "dev1")).await.unwrap();
        assert_eq!(
            service.verify(key.as_str(), "dev2").await.unwrap(),
            Verification::Invalid(InvalidReason::DeviceMismatch)
        );

        let verdict = service.verify(key.as_str(), "dev1").await.unwrap();
        assert_eq!(
            verdict,
            Verification::Valid {
                business_name: Some("Cafe X".to_string()),
                expires_at: None,
            }
        );
    }

    #[tokio::test]
    async fn test_verify_expired_after_activation() {
        let fx = fixture().await;
        let store = fx.store();
        let service = LicenseService::new(store.clone());
        let key = LicenseKey::generate();
        store
            .create(&key, Some(Utc::now() + Duration::days(30)))
            .await
            .unwrap();
        service.activate(request(key.as_str(), "dev1")).await.unwrap();

        sqlx::query("UPDATE licenses SET expires_at = ? WHERE license_key = ?")
            .bind(Utc::now() - Duration::hours(1))
            .bind(key.as_str())
            .execute(fx.db.pool())
            .await
            .unwrap();

        assert_eq!(
            service.verify(key.as_str(), "dev1").await.unwrap(),
            Verification::Invalid(InvalidReason::Expired)
        );
        // Binding is checked before expiry.
        assert_eq!(
            service.verify(key.as_str(), "dev2").await.unwrap(),
            Verification::Invalid(InvalidReason::DeviceMismatch)
        );

        let record = store.get_by_key(key.as_str()).await.unwrap().unwrap();
        assert_eq!(record.status, LicenseStatus::Active);
        assert!(fx.db.license_store().verification_logs(key.as_str()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_requires_fields() {
        let fx = fixture().await;
        let service = LicenseService::new(fx.store());
        assert!(matches!(
            service.verify("", "dev1").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_check_is_read_only() {
        let fx = fixture().await;
        let store = fx.store();
        let service = LicenseService::new(store.clone());

        assert_eq!(service.check("FOOD-AAAA-BBBB-CCCC").await.unwrap(), None);
        assert!(matches!(service.check(" ").await, Err(Error::Validation(_))));

        let key = LicenseKey::generate();
        store.create(&key, None).await.unwrap();
        let summary = service.check(key.as_str()).await.unwrap().unwrap();
        assert_eq!(summary.status, LicenseStatus::Pending);
        assert_eq!(summary.business_name, None);

        let record = store.get_by_key(key.as_str()).await.unwrap().unwrap();
        assert!(record.last_verified_at.is_none());
    }
}
