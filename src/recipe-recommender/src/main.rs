//! Recipe Recommender: loads the recipe dataset, builds every
//! recommendation strategy and serves them over HTTP.

use anyhow::Context;
use clap::Parser;
use recipe_api::{ApiServer, Snapshot};
use recipe_core::config::AppConfig;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "recipe-recommender")]
#[command(about = "Recipe recommendation service")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "RECIPE_RECOMMENDER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the CSV dataset (overrides config)
    #[arg(long, env = "RECIPE_RECOMMENDER__DATA__DIR")]
    data_dir: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "RECIPE_RECOMMENDER__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port (overrides config)
    #[arg(long, env = "RECIPE_RECOMMENDER__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Do not start the Prometheus exporter
    #[arg(long, default_value_t = false)]
    no_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_recommender=info,recipe_api=info,recipe_data=info,recipe_recommenders=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Recipe recommender starting up");

    // Load configuration
    let mut config = AppConfig::load_or_default(cli.config.as_deref()).with_context(|| {
        format!("Failed to load configuration from {:?}", cli.config)
    })?;

    // Apply CLI overrides
    if let Some(dir) = cli.data_dir {
        config.data.dir = dir;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if cli.no_metrics {
        config.metrics.enabled = false;
    }

    info!(
        data_dir = %config.data.dir,
        http_port = config.api.http_port,
        metrics_enabled = config.metrics.enabled,
        hybrid_members = ?config.recommender.hybrid.members,
        "Configuration loaded"
    );

    let snapshot = Snapshot::load(Path::new(&config.data.dir), &config.recommender)
        .with_context(|| format!("loading dataset from {}", config.data.dir))?;

    let api_server = ApiServer::new(config.clone(), snapshot);

    // Start metrics exporter
    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics().await {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("Recipe recommender is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
