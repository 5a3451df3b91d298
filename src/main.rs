//! Development reverse proxy.
//!
//! ```text
//!     Browser ──▶ dev-proxy ──┬─ /api, /ws, ... ──▶ backend (HTTP / WebSocket)
//!                             └─ anything else  ──▶ client assets or 404
//! ```

use std::path::PathBuf;

use clap::Parser;

use dev_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use dev_proxy::lifecycle::startup;
use dev_proxy::observability::logging::init_logging;
use dev_proxy::RouteTable;

#[derive(Parser)]
#[command(name = "dev-proxy")]
#[command(about = "Prefix-routing reverse proxy for local development", long_about = None)]
struct Cli {
    /// TOML configuration file. Without one the built-in route table is used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener address, e.g. 127.0.0.1:5173
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration, print the route table and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dev-proxy starting");

    if cli.check {
        let table = RouteTable::from_config(&config.routes).map_err(ConfigError::Validation)?;
        println!("listener {}", config.listener.bind_address);
        for route in table.routes() {
            let timeout = route
                .timeout()
                .map(|t| format!("{}ms", t.as_millis()))
                .unwrap_or_else(|| "none".to_string());
            println!(
                "{:<12} -> {}  origin-rewrite={} upgrade={} timeout={}",
                route.path_prefix(),
                route.target(),
                route.rewrites_origin(),
                route.supports_upgrade(),
                timeout,
            );
        }
        return Ok(());
    }

    startup::run(config).await?;
    Ok(())
}
