//! SQLite implementation of LicenseStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use foodzone_core::license::{
    ActivationAttempt, DeviceBinding, DeviceInfo, LicenseRecord, LicenseStatus,
    NewActivationAttempt, SuspiciousActivity, VerificationLog,
};
use foodzone_core::ports::LicenseStore;
use foodzone_core::{Error, LicenseKey, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

const LICENSE_COLUMNS: &str = "id, license_key, business_name, device_id, device_info, status, expires_at, created_at, activated_at, last_verified_at";

pub struct SqliteLicenseStore {
    pool: SqlitePool,
}

impl SqliteLicenseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Verification audit entries for one key, newest first.
    pub async fn verification_logs(&self, key: &str) -> Result<Vec<VerificationLog>> {
        let rows = sqlx::query("SELECT id, license_key, device_id, verified_at FROM verification_logs WHERE license_key = ? ORDER BY verified_at DESC, id DESC")
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter()
            .map(|r| {
                Ok(VerificationLog {
                    id: r.try_get("id").map_err(db_error)?,
                    license_key: r.try_get("license_key").map_err(db_error)?,
                    device_id: r.try_get("device_id").map_err(db_error)?,
                    verified_at: r.try_get("verified_at").map_err(db_error)?,
                })
            })
            .collect()
    }

    fn row_to_license(r: &SqliteRow) -> Result<LicenseRecord> {
        let status: String = r.try_get("status").map_err(db_error)?;
        Ok(LicenseRecord {
            id: r.try_get("id").map_err(db_error)?,
            license_key: r.try_get("license_key").map_err(db_error)?,
            business_name: r.try_get("business_name").map_err(db_error)?,
            device_id: r.try_get("device_id").map_err(db_error)?,
            device_info: decode_device_info(r.try_get("device_info").map_err(db_error)?),
            status: status.parse()?,
            expires_at: r.try_get("expires_at").map_err(db_error)?,
            created_at: r.try_get("created_at").map_err(db_error)?,
            activated_at: r.try_get("activated_at").map_err(db_error)?,
            last_verified_at: r.try_get("last_verified_at").map_err(db_error)?,
        })
    }

    fn row_to_attempt(r: &SqliteRow) -> Result<ActivationAttempt> {
        Ok(ActivationAttempt {
            id: r.try_get("id").map_err(db_error)?,
            license_key: r.try_get("license_key").map_err(db_error)?,
            device_id: r.try_get("device_id").map_err(db_error)?,
            device_info: decode_device_info(r.try_get("device_info").map_err(db_error)?),
            business_name: r.try_get("business_name").map_err(db_error)?,
            success: r.try_get("success").map_err(db_error)?,
            error_message: r.try_get("error_message").map_err(db_error)?,
            ip_address: r.try_get("ip_address").map_err(db_error)?,
            attempted_at: r.try_get("attempted_at").map_err(db_error)?,
        })
    }
}

fn db_error(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}

/// Device info is stored as JSON text. Rows written by older tooling may
/// hold `null` or malformed text; those read back as absent.
fn decode_device_info(raw: Option<String>) -> Option<DeviceInfo> {
    raw.and_then(|s| serde_json::from_str::<Option<DeviceInfo>>(&s).ok().flatten())
}

#[async_trait]
impl LicenseStore for SqliteLicenseStore {
    async fn create(&self, key: &LicenseKey, expires_at: Option<DateTime<Utc>>) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO licenses (license_key, status, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(key.as_str())
        .bind(LicenseStatus::Pending.as_str())
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::DuplicateKey(key.to_string())
            }
            _ => db_error(e),
        })?;
        Ok(result.last_insert_rowid())
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<LicenseRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM licenses WHERE license_key = ?",
            LICENSE_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.as_ref().map(Self::row_to_license).transpose()
    }

    async fn bind_device(&self, key: &str, binding: &DeviceBinding) -> Result<bool> {
        let device_info = serde_json::to_string(&binding.device_info)?;
        let now = Utc::now();
        // The status guard makes this a compare-and-set: of two racing
        // activations only one can see the row as pending.
        let result = sqlx::query("UPDATE licenses SET status = 'active', device_id = ?, device_info = ?, business_name = ?, activated_at = ?, last_verified_at = ? WHERE license_key = ? AND status = 'pending'")
            .bind(&binding.device_id)
            .bind(&device_info)
            .bind(&binding.business_name)
            .bind(now)
            .bind(now)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        let bound = result.rows_affected() == 1;
        debug!(license_key = key, device_id = %binding.device_id, bound, "Device binding attempted");
        Ok(bound)
    }

    async fn touch_verified(&self, key: &str) -> Result<()> {
        sqlx::query("UPDATE licenses SET last_verified_at = ? WHERE license_key = ?")
            .bind(Utc::now())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn reset_binding(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE licenses SET status = 'pending', device_id = NULL, device_info = NULL WHERE license_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<LicenseRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM licenses ORDER BY created_at DESC, id DESC",
            LICENSE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.iter().map(Self::row_to_license).collect()
    }

    async fn append_activation_attempt(&self, attempt: &NewActivationAttempt) -> Result<()> {
        let device_info = attempt
            .device_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        sqlx::query("INSERT INTO activation_attempts (license_key, device_id, device_info, business_name, success, error_message, ip_address, attempted_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(&attempt.license_key)
            .bind(&attempt.device_id)
            .bind(device_info)
            .bind(&attempt.business_name)
            .bind(attempt.success)
            .bind(&attempt.error_message)
            .bind(&attempt.ip_address)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn append_verification_log(&self, key: &str, device_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO verification_logs (license_key, device_id, verified_at) VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(device_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_activation_attempts(&self, limit: u32) -> Result<Vec<ActivationAttempt>> {
        let rows = sqlx::query("SELECT id, license_key, device_id, device_info, business_name, success, error_message, ip_address, attempted_at FROM activation_attempts ORDER BY attempted_at DESC, id DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(Self::row_to_attempt).collect()
    }

    async fn find_suspicious(&self, threshold: u32) -> Result<Vec<SuspiciousActivity>> {
        let rows = sqlx::query("SELECT license_key, device_id, COUNT(*) AS attempt_count FROM activation_attempts WHERE success = 0 GROUP BY license_key, device_id HAVING COUNT(*) > ? ORDER BY attempt_count DESC, license_key ASC, device_id ASC")
            .bind(i64::from(threshold))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter()
            .map(|r| {
                Ok(SuspiciousActivity {
                    license_key: r.try_get("license_key").map_err(db_error)?,
                    device_id: r.try_get("device_id").map_err(db_error)?,
                    attempt_count: r.try_get("attempt_count").map_err(db_error)?,
                })
            })
            .collect()
    }
}
