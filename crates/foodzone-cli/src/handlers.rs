//! Command handlers.

use anyhow::Result;
use console::style;
use foodzone_api::ServerConfig;
use foodzone_licensing::{
    DeviceProfile, FileStore, HttpLicenseApi, LicenseApi, LicenseGuard, LicenseVerdict,
    VerdictSource,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::AdminClient;
use crate::config::CliConfig;

/// Run the license server until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    info!(
        host = %config.host,
        port = config.port,
        database = %config.database.url,
        "Starting license server"
    );
    println!(
        "{} Food Zone license server on {}:{}",
        style("▶").green(),
        config.host,
        config.port
    );
    foodzone_api::serve(config, foodzone_api::shutdown_signal()).await?;
    Ok(())
}

pub async fn generate(config: &CliConfig, count: u32, months: Option<u32>) -> Result<()> {
    let response = AdminClient::new(config)?.generate(count, months).await?;

    println!(
        "{} Generated {} license(s)",
        style("✓").green(),
        response.count
    );
    for license in &response.licenses {
        let expiry = license
            .expires_at
            .map(|e| e.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!("  {}  expires {}", style(&license.license_key).bold(), expiry);
    }
    Ok(())
}

pub async fn list_licenses(config: &CliConfig) -> Result<()> {
    let response = AdminClient::new(config)?.list_licenses().await?;

    if response.licenses.is_empty() {
        println!("{} No licenses", style("i").blue());
        return Ok(());
    }

    println!(
        "{:<21} {:<8} {:<24} {:<28} {}",
        "KEY", "STATUS", "BUSINESS", "DEVICE", "EXPIRES"
    );
    for license in &response.licenses {
        println!(
            "{:<21} {:<8} {:<24} {:<28} {}",
            license.license_key,
            license.status,
            license.business_name.as_deref().unwrap_or("-"),
            license.device_id.as_deref().unwrap_or("-"),
            license
                .expires_at
                .map(|e| e.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "never".to_string()),
        );
    }
    println!("\n{} license(s)", response.count);
    Ok(())
}

pub async fn attempts(config: &CliConfig) -> Result<()> {
    let response = AdminClient::new(config)?.attempts().await?;

    if response.attempts.is_empty() {
        println!("{} No activation attempts", style("i").blue());
        return Ok(());
    }

    for attempt in &response.attempts {
        let outcome = if attempt.success {
            style("ok").green()
        } else {
            style("fail").red()
        };
        println!(
            "{}  {:<4}  {}  {}  {}",
            attempt.attempted_at.format("%Y-%m-%d %H:%M:%S"),
            outcome,
            attempt.license_key,
            attempt.device_id,
            attempt.error_message.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

pub async fn suspicious(config: &CliConfig) -> Result<()> {
    let response = AdminClient::new(config)?.suspicious().await?;

    if response.suspicious.is_empty() {
        println!("{} No suspicious activity", style("✓").green());
        return Ok(());
    }

    for entry in &response.suspicious {
        println!(
            "{} {}  {}  {} failed attempts",
            style("!").yellow(),
            entry.license_key,
            entry.device_id,
            entry.attempt_count
        );
    }
    Ok(())
}

pub async fn deactivate_license(config: &CliConfig, license_key: &str) -> Result<()> {
    AdminClient::new(config)?.deactivate(license_key).await?;
    println!(
        "{} License {} released; it can be activated on a new device",
        style("✓").green(),
        style(license_key).bold()
    );
    Ok(())
}

pub async fn stats(config: &CliConfig) -> Result<()> {
    let stats = AdminClient::new(config)?.stats().await?.stats;
    println!("Total:   {}", stats.total);
    println!("Active:  {}", style(stats.active).green());
    println!("Pending: {}", style(stats.pending).yellow());
    println!("Expired: {}", style(stats.expired).red());
    Ok(())
}

fn device_guard(config: &CliConfig) -> Result<LicenseGuard> {
    let api = HttpLicenseApi::new(&config.api_url, config.verify_timeout())?;
    let data_dir = config.data_dir()?;
    debug!(api_url = %config.api_url, data_dir = %data_dir.display(), "Device license guard");
    let store = FileStore::new(data_dir);
    Ok(LicenseGuard::new(
        Arc::new(api),
        Arc::new(store),
        DeviceProfile::current(),
        config.guard_config(),
    ))
}

pub async fn device_activate(config: &CliConfig, license_key: &str, business: &str) -> Result<()> {
    let guard = device_guard(config)?;

    match guard.activate(license_key, business).await {
        Ok(assertion) => {
            println!("{} License activated", style("✓").green());
            println!("  Key:      {}", style(&assertion.license_key).bold());
            println!("  Business: {}", assertion.business_name);
            println!("  Device:   {}", assertion.device_id);
            if let Some(expires_at) = assertion.expires_at {
                println!("  Expires:  {}", expires_at.format("%Y-%m-%d"));
            }
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Activation failed");
            println!("{} {}", style("✗").red(), e);
            if let Some(hint) = e.hint() {
                println!("  {}", style(hint).dim());
            }
            Err(e.into())
        }
    }
}

pub async fn device_status(config: &CliConfig) -> Result<()> {
    let guard = device_guard(config)?;

    match guard.startup_check().await? {
        LicenseVerdict::Valid { assertion, source } => {
            println!(
                "{} Licensed to {}",
                style("✓").green(),
                style(&assertion.business_name).bold()
            );
            println!("  Key: {}", assertion.license_key);
            match source {
                VerdictSource::Online => println!("  Verified online"),
                VerdictSource::OfflineGrace { remaining } => println!(
                    "  {} Offline; {}h of grace remaining",
                    style("!").yellow(),
                    remaining.num_hours()
                ),
            }
        }
        LicenseVerdict::Invalid(reason) => {
            info!(reason = %reason, "Device is not licensed");
            println!("{} {}", style("✗").red(), reason);
        }
    }
    Ok(())
}

pub async fn device_check(config: &CliConfig, license_key: &str) -> Result<()> {
    let license_key = license_key.trim().to_uppercase();
    let api = HttpLicenseApi::new(&config.api_url, config.verify_timeout())?;
    debug!(license_key = %license_key, "Checking license");
    let response = api.check(&license_key).await?;

    if !response.exists {
        let message = response.message.as_deref().unwrap_or("License not found");
        println!("{} {}", style("✗").red(), message);
        return Ok(());
    }

    println!("{} {}", style("✓").green(), style(&license_key).bold());
    if let Some(status) = response.status {
        println!("  Status:   {}", status);
    }
    if let Some(business) = response.business_name.as_deref() {
        println!("  Business: {}", business);
    }
    let expiry = response
        .expires_at
        .map(|e| e.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!("  Expires:  {}", expiry);
    Ok(())
}

pub async fn device_deactivate(config: &CliConfig) -> Result<()> {
    device_guard(config)?.deactivate().await?;
    println!("{} Local license removed", style("✓").green());
    Ok(())
}

pub fn show_config(config: &CliConfig, path: &Path) -> Result<()> {
    println!("Current configuration:");
    println!("  api_url: {}", config.api_url);
    println!(
        "  admin_username: {}",
        config.admin_username.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  admin_password: {}",
        if config.admin_password.is_some() {
            "***"
        } else {
            "(not set)"
        }
    );
    println!("  data_dir: {}", config.data_dir()?.display());
    println!("  offline_grace_days: {}", config.offline_grace_days);
    println!("  verify_timeout_secs: {}", config.verify_timeout_secs);
    println!("\nConfig file: {}", path.display());
    Ok(())
}

pub fn set_config(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut config = CliConfig::load_from(path)?;
    config.set(key, value)?;
    config.save_to(path)?;

    let shown = if key == "admin_password" { "***" } else { value };
    println!("{} Set {} = {}", style("✓").green(), key, shown);
    Ok(())
}
