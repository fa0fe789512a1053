//! Test context backed by a throwaway SQLite database.

use foodzone_api::config::AdminConfig;
use foodzone_core::ports::LicenseStore;
use foodzone_db::{Database, DatabaseConfig};
use foodzone_service::{AdminLicenseService, LicenseService};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "s3cret";

/// A migrated database in a temp directory.
///
/// Drop this to delete the database file.
pub struct TestContext {
    dir: TempDir,
    pub db: Database,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        crate::init_test_logging();

        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}", dir.path().join("licenses.db").display());
        let db = Database::connect(&DatabaseConfig::new(url)).await?;
        db.migrate().await?;

        Ok(Self { dir, db })
    }

    /// Scratch directory for device-side files.
    pub fn scratch_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn store(&self) -> Arc<dyn LicenseStore> {
        Arc::new(self.db.license_store())
    }

    pub fn licenses(&self) -> LicenseService {
        LicenseService::new(self.store())
    }

    pub fn admin(&self) -> AdminLicenseService {
        AdminLicenseService::new(self.store())
    }

    pub fn admin_credentials() -> AdminConfig {
        AdminConfig {
            username: Some(ADMIN_USERNAME.to_string()),
            password: Some(ADMIN_PASSWORD.to_string()),
        }
    }
}
