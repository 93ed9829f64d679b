//! Main entry point for the electricity-mix-exporter CLI

use clap::Parser;
use electricity_mix_exporter::cli::{Cli, Commands};
use electricity_mix_exporter::metrics;
use electricity_mix_exporter::shutdown::ShutdownCoordinator;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("electricity_mix_exporter=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    metrics::describe_metrics();

    let cli = Cli::parse();

    // Install Ctrl+C handler; the loop finishes the slot in flight and stops
    // before planning another window.
    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing current slot before exiting");
                shutdown.request_shutdown();
            }
        }
    });

    let result: Result<(), anyhow::Error> = match cli.command {
        Commands::Run(ref args) => args.execute(shutdown.clone()).await.map_err(Into::into),
        Commands::Validate(ref args) => args.execute().await.map_err(Into::into),
    };

    if let Err(e) = result {
        error!("Command failed: {e}");
        std::process::exit(1);
    }
}
