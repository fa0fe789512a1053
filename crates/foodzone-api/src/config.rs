//! Server configuration.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/foodzone.{toml,yaml,json}` or an explicit file
//! 3. `FOODZONE__*` environment variables (`__` separates sections)
//! 4. the legacy names `PORT`, `DATABASE_URL`, `ADMIN_USERNAME`, `ADMIN_PASSWORD`

use config::{Config, Environment, File};
use foodzone_core::{Error, Result};
use foodzone_db::DatabaseConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

const ENV_PREFIX: &str = "FOODZONE";

/// Legacy variable name and the config key it overrides.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PORT", "port"),
    ("DATABASE_URL", "database.url"),
    ("ADMIN_USERNAME", "admin.username"),
    ("ADMIN_PASSWORD", "admin.password"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Operator credentials for the admin surface.
///
/// When either value is unset the admin surface refuses every request.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl AdminConfig {
    pub fn is_configured(&self) -> bool {
        matches!(
            (self.username.as_deref(), self.password.as_deref()),
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty()
        )
    }

    /// Whether the presented header values match the configured pair.
    pub fn authorizes(&self, username: Option<&str>, password: Option<&str>) -> bool {
        self.is_configured()
            && username.is_some()
            && password.is_some()
            && username == self.username.as_deref()
            && password == self.password.as_deref()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: DatabaseConfig::default(),
            admin: AdminConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the default file location (or `path`) and the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(
            path,
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
            |name| std::env::var(name).ok(),
        )
    }

    fn from_sources(
        path: Option<&Path>,
        env: Environment,
        legacy: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("config/foodzone").required(false),
        };

        let mut builder = Config::builder().add_source(file).add_source(env);
        for (var, key) in LEGACY_ENV {
            let value = legacy(var).filter(|v| !v.is_empty());
            builder = builder
                .set_override_option(*key, value)
                .map_err(|e| Error::Config(e.to_string()))?;
        }

        builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {e}")))?
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {e}")))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address: {e}")))
    }
}
