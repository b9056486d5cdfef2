//! sensorwatch - CPU temperature and power exporter
//!
//! Runs `sensors` every ten seconds and serves the readings on a Prometheus
//! scrape endpoint.

use anyhow::Result;
use clap::Parser;
use sensorwatch::{
    app::{forward_shutdown_signal, App},
    config::Cli,
    config::Config,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load_from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            // Logging is configured from the config, so fall back to defaults here.
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("sensorwatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_address);
    info!("Metrics Path: {}", config.server.metrics_path);
    match config.sampler.command_timeout() {
        Some(timeout) => info!("Command Timeout: {}s", timeout.as_secs()),
        None => info!("Command Timeout: Disabled"),
    }
    info!(
        "Internal Metrics: {}",
        if config.internal_metrics.enabled {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(forward_shutdown_signal(tokio::signal::ctrl_c(), shutdown_tx));

    app.run().await?;
    info!("All tasks shut down. Exiting.");
    Ok(())
}
