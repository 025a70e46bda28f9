//! # Refuel - Fuel-Shuffle History Tool
//!
//! The main binary for the Refuel shuffle engine.
//!
//! This application provides:
//! - Conversion between legacy shuffle text and YAML
//! - Chain reconstruction for a recorded cycle
//! - Ring schedule printing for the built-in strategy
//! - Shuffle file validation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            apps/refuel (THE BINARY)          │
//! │                                              │
//! │   ┌──────────────┐     ┌─────────────────┐   │
//! │   │     CLI      │     │ settings (TOML) │   │
//! │   │   (clap)     │     │                 │   │
//! │   └──────┬───────┘     └────────┬────────┘   │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │              ┌───────────────┐               │
//! │              │  refuel-core  │               │
//! │              │ (THE ENGINE)  │               │
//! │              └───────────────┘               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! refuel convert -i case-SHUFFLES.txt -o shuffles.yaml
//! refuel chains -f shuffles.yaml -c 2
//! refuel schedule --max-ring 9 --coarse 0.5
//! refuel check -f case-SHUFFLES.txt --json-mode
//! ```

use clap::Parser;
use refuel::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // REFUEL_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("REFUEL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "refuel=debug,refuel_core=debug"
    } else {
        "refuel=info,refuel_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // JSON output stays parseable.
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Refuel startup banner.
fn print_banner() {
    println!(
        r#"
  ██████╗ ███████╗███████╗██╗   ██╗███████╗██╗
  ██╔══██╗██╔════╝██╔════╝██║   ██║██╔════╝██║
  ██████╔╝█████╗  █████╗  ██║   ██║█████╗  ██║
  ██╔══██╗██╔══╝  ██╔══╝  ██║   ██║██╔══╝  ██║
  ██║  ██║███████╗██║     ╚██████╔╝███████╗███████╗
  ╚═╝  ╚═╝╚══════╝╚═╝      ╚═════╝ ╚══════╝╚══════╝

  Fuel-Shuffle History Tool v{}

  Record • Reconstruct • Replay
"#,
        env!("CARGO_PKG_VERSION")
    );
}
