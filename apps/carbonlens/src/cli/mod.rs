//! # Carbonlens CLI Module
//!
//! This module implements the CLI interface for carbonlens.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `calculate` - Calculate activities from a JSON file
//! - `analyze` - Enhanced calculation for one browsing visit
//! - `predict` - Project emissions from a daily history file
//! - `factors` - Print the emission factor tables

mod commands;

use crate::config::Config;
use carbonlens_core::CarbonError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Carbonlens - Emission Estimator
///
/// Rule-based carbon estimates for everyday activities and web browsing.
#[derive(Parser, Debug)]
#[command(name = "carbonlens")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a carbonlens.toml configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the configuration file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the configuration file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Calculate activity records from a JSON file (one object or an array)
    Calculate {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Enhanced calculation for one browsing visit
    Analyze {
        /// Page URL
        #[arg(short, long)]
        url: String,

        /// Seconds spent on the page
        #[arg(short, long, default_value = "60")]
        time_on_page: f64,

        /// Device description (laptop, desktop, mobile, tablet, tv)
        #[arg(short, long, default_value = "laptop")]
        device_type: String,

        /// Network type (wifi, 4g, 5g, ethernet)
        #[arg(short, long, default_value = "wifi")]
        network_type: String,

        /// Country code for the grid factor
        #[arg(long, default_value = "US")]
        country: String,
    },

    /// Project emissions from a JSON daily history file
    Predict {
        /// Path to the history file (array of {date, emissions})
        #[arg(short, long)]
        file: PathBuf,

        /// Days to project
        #[arg(short, long, default_value = "30")]
        days: u32,
    },

    /// Print the emission factor tables
    Factors,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CarbonError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Calculate { file }) => cmd_calculate(&file, json_mode),
        Some(Commands::Analyze {
            url,
            time_on_page,
            device_type,
            network_type,
            country,
        }) => {
            let config = Config::load(cli.config.as_deref())?;
            let event = carbonlens_core::BrowsingEvent::from_url(url, time_on_page)?
                .with_device_type(device_type)
                .with_network_type(network_type)
                .with_country(country);
            cmd_analyze(&config, &event, json_mode, cli.verbose).await
        }
        Some(Commands::Predict { file, days }) => cmd_predict(&file, days, json_mode),
        Some(Commands::Factors) | None => cmd_factors(json_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_arguments() {
        let cli = Cli::try_parse_from([
            "carbonlens",
            "--json-mode",
            "analyze",
            "--url",
            "https://www.youtube.com/watch",
            "--time-on-page",
            "300",
        ])
        .expect("parse");

        assert!(cli.json_mode);
        assert!(matches!(
            cli.command,
            Some(Commands::Analyze { ref url, time_on_page, ref device_type, .. })
                if url == "https://www.youtube.com/watch"
                    && time_on_page == 300.0
                    && device_type == "laptop"
        ));
    }

    #[test]
    fn server_overrides_are_optional() {
        let cli = Cli::try_parse_from(["carbonlens", "server", "-p", "9000"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Server { host: None, port: Some(9000) })
        ));
    }

    #[test]
    fn predict_defaults_to_thirty_days() {
        let cli = Cli::try_parse_from(["carbonlens", "predict", "-f", "history.json"])
            .expect("parse");
        assert!(matches!(cli.command, Some(Commands::Predict { days: 30, .. })));
    }
}
