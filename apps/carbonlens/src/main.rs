//! # carbonlens - Emission Estimation Server
//!
//! The main binary for the carbonlens estimator.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for one-off calculations
//! - The enhanced browsing pipeline with degraded-path fallback
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   apps/carbonlens (THE BINARY)                  │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐     │
//! │  │   CLI       │    │   HTTP API  │    │  Enhanced Engine │     │
//! │  │  (clap)     │    │   (axum)    │    │ (reqwest, tokio) │     │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘     │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │                  ┌──────────────────┐                           │
//! │                  │ carbonlens-core  │                           │
//! │                  │ (THE CALCULATOR) │                           │
//! │                  └──────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! carbonlens server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! carbonlens calculate -f activities.json
//! carbonlens analyze --url https://www.youtube.com/ --time-on-page 300
//! carbonlens predict -f history.json --days 30
//! ```

use carbonlens::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // CARBONLENS_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("CARBONLENS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "carbonlens=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the carbonlens startup banner.
fn print_banner() {
    println!(
        r#"
   ___          _                  _
  / __|__ _ _ _| |__  ___ _ _     | |   ___ _ _  ___
 | (__/ _` | '_| '_ \/ _ \ ' \    | |__/ -_) ' \(_-<
  \___\__,_|_| |_.__/\___/_||_|   |____\___|_||_/__/

  Emission Estimator v{}

  Rule-based • Confidence-scored • Always answers
"#,
        env!("CARGO_PKG_VERSION")
    );
}
