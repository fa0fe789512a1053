//! CLI configuration management.

use anyhow::{Context, Result, anyhow, bail};
use foodzone_licensing::GuardConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// License server URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Admin username sent with operator commands.
    #[serde(default)]
    pub admin_username: Option<String>,
    /// Admin password sent with operator commands.
    #[serde(default)]
    pub admin_password: Option<String>,
    /// Where the device license cache lives.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_offline_grace_days")]
    pub offline_grace_days: u32,
    #[serde(default = "default_verify_timeout_secs")]
    pub verify_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_offline_grace_days() -> u32 {
    7
}

fn default_verify_timeout_secs() -> u64 {
    10
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            admin_username: None,
            admin_password: None,
            data_dir: None,
            offline_grace_days: default_offline_grace_days(),
            verify_timeout_secs: default_verify_timeout_secs(),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "foodzone", "foodzone")
        .ok_or_else(|| anyhow!("Could not determine config directory"))
}

impl CliConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.yaml"))
    }

    /// Resolved device data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }

    pub fn guard_config(&self) -> GuardConfig {
        GuardConfig {
            offline_grace: chrono::Duration::days(i64::from(self.offline_grace_days)),
            verify_timeout: self.verify_timeout(),
        }
    }

    pub fn verify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.verify_timeout_secs.max(1))
    }

    /// Set a configuration value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_url" => self.api_url = value.to_string(),
            "admin_username" => self.admin_username = Some(value.to_string()),
            "admin_password" => self.admin_password = Some(value.to_string()),
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            "offline_grace_days" => {
                self.offline_grace_days = value
                    .parse()
                    .with_context(|| format!("Invalid day count: {}", value))?;
            }
            "verify_timeout_secs" => {
                self.verify_timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout: {}", value))?;
            }
            _ => bail!("Unknown config key: {}", key),
        }
        Ok(())
    }
}
