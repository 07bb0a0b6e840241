//! API gateway binary.
//!
//! ```text
//!  client ──▶ request id ──▶ access log ──▶ auth ──▶ rate limit ──▶ dispatch ──▶ backend
//!                                            │          │
//!                                      TokenValidator  CounterStore (Redis)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_gateway::config::load_config;
use api_gateway::lifecycle::{wait_for_signal, Shutdown};
use api_gateway::observability::{init_logging, metrics};
use api_gateway::GatewayServer;

#[derive(Debug, Parser)]
#[command(name = "api-gateway", version, about = "API gateway request pipeline")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("api-gateway: {err}");
            std::process::exit(2);
        }
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        rate_limit = config.rate_limit.limit,
        window_secs = config.rate_limit.window_secs,
        store = ?config.rate_limit.backend,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(err) = metrics::init_metrics(addr) {
                    tracing::error!(error = %err, "Failed to start metrics exporter, continuing without it");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = GatewayServer::new(&config)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received, draining connections");
        trigger.trigger();
    });

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
