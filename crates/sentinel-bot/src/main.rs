//! Real-time insider-trading surveillance pipeline — entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Prediction-market surveillance bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SENTINEL_CONFIG env var).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    sentinel_telemetry::init_logging()?;

    info!("starting sentinel-bot v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("SENTINEL_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "loading configuration");
    let config = sentinel_bot::AppConfig::from_file(&config_path)?;

    let app = sentinel_bot::Application::new(config).await?;
    app.run().await?;

    Ok(())
}
