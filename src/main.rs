//! Process entry point: CLI, config, logging, metrics, serve.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use backend_dispatch::config::{load_config, DispatchConfig};
use backend_dispatch::observability::{logging, metrics};
use backend_dispatch::server::ProxyServer;

#[derive(Debug, Parser)]
#[command(name = "backend-dispatch", about = "HTTP load-balancing dispatcher")]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DispatchConfig::default(),
    };

    logging::init(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        strategy = ?config.strategy,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = ProxyServer::new(config)?;
    server.run(listener).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
