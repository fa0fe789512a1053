//! Application state shared across handlers.

use crate::config::AdminConfig;
use foodzone_core::ports::LicenseStore;
use foodzone_service::{AdminLicenseService, LicenseService};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub licenses: LicenseService,
    pub admin: AdminLicenseService,
    pub admin_credentials: AdminConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn LicenseStore>, admin_credentials: AdminConfig) -> Self {
        Self {
            licenses: LicenseService::new(store.clone()),
            admin: AdminLicenseService::new(store),
            admin_credentials,
            started_at: Instant::now(),
        }
    }
}
