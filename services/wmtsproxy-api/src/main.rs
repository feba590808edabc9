//! Capabilities registration service.
//!
//! HTTP server that registers WMS/WMTS layers and serves the generated
//! tile-caching proxy configurations.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wmtsproxy_api::{router, AppState, HttpFetcher, ServiceConfig};

#[derive(Parser, Debug)]
#[command(name = "wmtsproxy-api")]
#[command(about = "WMS/WMTS capabilities registration service")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "0.0.0.0:9091")]
    listen: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Registration store
    #[arg(long, env = "CSV_FILE", default_value = "./services.csv")]
    records_file: PathBuf,

    /// Directory for generated configurations
    #[arg(long, env = "CONFIGS_DIR", default_value = "./configs")]
    configs_dir: PathBuf,

    /// Base configuration referenced by every generated configuration
    #[arg(long, env = "BASE_CONFIG", default_value = "base.yaml")]
    base_config: String,

    /// Timeout for fetching capabilities documents, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    fetch_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let config = ServiceConfig {
        records_file: args.records_file,
        configs_dir: args.configs_dir,
        base_config: args.base_config,
        fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
    };
    std::fs::create_dir_all(&config.configs_dir).with_context(|| {
        format!("Failed to create configs directory {}", config.configs_dir.display())
    })?;

    info!(
        records_file = %config.records_file.display(),
        configs_dir = %config.configs_dir.display(),
        "Starting capabilities registration service"
    );

    let fetcher = HttpFetcher::new(config.fetch_timeout).context("Failed to create HTTP client")?;
    let state = Arc::new(AppState::new(config, Arc::new(fetcher)));
    let app = router(state, prometheus_handle);

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
