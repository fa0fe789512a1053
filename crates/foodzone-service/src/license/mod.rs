//! License activation, verification and administration.

pub mod admin;
pub mod service;

pub use admin::{AdminLicenseService, DEFAULT_ATTEMPT_LIMIT, MAX_GENERATE_BATCH, SUSPICIOUS_ATTEMPT_THRESHOLD};
pub use service::LicenseService;

#[cfg(test)]
pub(crate) mod test_support {
    use foodzone_db::{Database, DatabaseConfig};
    use std::sync::Arc;
    use tempfile::TempDir;

    pub struct Fixture {
        _dir: TempDir,
        pub db: Database,
    }

    impl Fixture {
        pub fn store(&self) -> Arc<foodzone_db::SqliteLicenseStore> {
            Arc::new(self.db.license_store())
        }
    }

    pub async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("licenses.db").display());
        let db = Database::connect(&DatabaseConfig::new(url)).await.unwrap();
        db.migrate().await.unwrap();
        Fixture { _dir: dir, db }
    }
}
