//! Food Zone license CLI entrypoint.

use anyhow::Result;
use clap::Parser;
use foodzone_api::ServerConfig;
use foodzone_api::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod client;
mod commands;
mod config;
mod handlers;

use commands::{AdminCommands, Commands, ConfigCommands, DeviceCommands};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "foodzone")]
#[command(author, version, about = "Food Zone license server and tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let server_config = ServerConfig::load(config.as_deref())?;
            init_logging(&server_config.logging);
            handlers::serve(&server_config).await
        }
        Commands::Admin { command } => run_admin(command).await,
        Commands::Device { command } => run_device(command).await,
        Commands::Config { command } => {
            let path = CliConfig::config_path()?;
            match command {
                ConfigCommands::Show => handlers::show_config(&CliConfig::load_from(&path)?, &path),
                ConfigCommands::Set { key, value } => handlers::set_config(&path, &key, &value),
            }
        }
    }
}

/// Client commands log warnings only unless `RUST_LOG` says otherwise.
fn client_setup() -> Result<CliConfig> {
    init_logging(&LoggingConfig {
        level: "warn".to_string(),
        format: LogFormat::Pretty,
    });
    CliConfig::load()
}

async fn run_admin(command: AdminCommands) -> Result<()> {
    let config = client_setup()?;
    match command {
        AdminCommands::Generate { count, months } => {
            handlers::generate(&config, count, months).await
        }
        AdminCommands::List => handlers::list_licenses(&config).await,
        AdminCommands::Attempts => handlers::attempts(&config).await,
        AdminCommands::Suspicious => handlers::suspicious(&config).await,
        AdminCommands::Deactivate { license_key } => {
            handlers::deactivate_license(&config, &license_key).await
        }
        AdminCommands::Stats => handlers::stats(&config).await,
    }
}

async fn run_device(command: DeviceCommands) -> Result<()> {
    let config = client_setup()?;
    match command {
        DeviceCommands::Activate {
            license_key,
            business,
        } => handlers::device_activate(&config, &license_key, &business).await,
        DeviceCommands::Status => handlers::device_status(&config).await,
        DeviceCommands::Check { license_key } => {
            handlers::device_check(&config, &license_key).await
        }
        DeviceCommands::Deactivate => handlers::device_deactivate(&config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_device_activate() {
        let cli = Cli::try_parse_from([
            "foodzone",
            "device",
            "activate",
            "FOOD-1A2B-3C4D-5E6F",
            "--business",
            "Cafe X",
        ])
        .unwrap();
        match cli.command {
            Commands::Device {
                command:
                    DeviceCommands::Activate {
                        license_key,
                        business,
                    },
            } => {
                assert_eq!(license_key, "FOOD-1A2B-3C4D-5E6F");
                assert_eq!(business, "Cafe X");
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_parse_device_check() {
        let cli =
            Cli::try_parse_from(["foodzone", "device", "check", "food-1a2b-3c4d-5e6f"]).unwrap();
        match cli.command {
            Commands::Device {
                command: DeviceCommands::Check { license_key },
            } => assert_eq!(license_key, "food-1a2b-3c4d-5e6f"),
            _ => panic!("unexpected command"),
        }
        assert!(Cli::try_parse_from(["foodzone", "device", "check"]).is_err());
    }

    #[test]
    fn test_generate_defaults_to_one() {
        let cli = Cli::try_parse_from(["foodzone", "admin", "generate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Admin {
                command: AdminCommands::Generate { count: 1, months: None }
            }
        ));
    }
}
