//! Token buy alert bot - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

/// DEX token buy alert bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via BUYBOT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // TLS provider must be installed before any wss:// or https:// connection
    buybot_rpc::init_crypto();

    let args = Args::parse();

    buybot_telemetry::init_logging()?;

    info!("Starting buybot v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > BUYBOT_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("BUYBOT_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = buybot::AppConfig::from_file(&config_path)?;
    info!(
        groups_file = %config.groups_file,
        chains = ?config.chains.keys().collect::<Vec<_>>(),
        "Configuration loaded"
    );

    let metrics_port = config.telemetry.metrics_port;
    if metrics_port != 0 {
        tokio::spawn(async move {
            if let Err(e) = buybot_telemetry::serve_metrics(metrics_port).await {
                error!(error = %e, port = metrics_port, "Metrics exporter stopped");
            }
        });
    }

    let app = buybot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
