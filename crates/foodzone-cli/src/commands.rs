//! CLI command definitions.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the license server
    Serve {
        /// Path to a server config file
        #[arg(short, long, env = "FOODZONE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Operator commands against a running server
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Activate and check the license on this machine
    Device {
        #[command(subcommand)]
        command: DeviceCommands,
    },

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Generate new license keys
    Generate {
        /// Number of keys
        #[arg(short, long, default_value_t = 1)]
        count: u32,

        /// Subscription length in months (perpetual if omitted)
        #[arg(short, long)]
        months: Option<u32>,
    },

    /// List all licenses
    List,

    /// Show recent activation attempts
    Attempts,

    /// Show keys with repeated failed activations
    Suspicious,

    /// Release a license so it can move to another device
    Deactivate {
        /// License key
        license_key: String,
    },

    /// Show license counts
    Stats,
}

#[derive(Subcommand)]
pub enum DeviceCommands {
    /// Bind this machine to a license key
    Activate {
        /// License key (FOOD-XXXX-XXXX-XXXX)
        license_key: String,

        /// Business name to register
        #[arg(short, long)]
        business: String,
    },

    /// Run the startup license check
    Status,

    /// Look up a license key without binding this machine
    Check {
        /// License key (FOOD-XXXX-XXXX-XXXX)
        license_key: String,
    },

    /// Forget the local license
    Deactivate,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },
}
