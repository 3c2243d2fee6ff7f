//! ScanRun REST Server

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scanrun_server::{create_router, AppState, ServerConfig};
use scanrun_sim::SimConfig;

#[derive(Parser)]
#[command(name = "scanrun-server")]
#[command(about = "ScanRun REST API backed by the simulated engine")]
#[command(version)]
struct Cli {
    /// HTTP bind address
    #[arg(long, env = "SCANRUN_BIND", default_value = "127.0.0.1:8000")]
    bind: String,

    /// Use shortened simulated timings
    #[arg(long)]
    fast: bool,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            bind_addr: cli.bind,
            sim: if cli.fast {
                SimConfig::fast()
            } else {
                SimConfig::default()
            },
        }
    }
}

async fn shutdown_signal(state: Arc<AppState>) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    state.engine.shutdown().await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("scanrun_server=info,scanrun_sim=info,tower_http=info")
            }),
        )
        .with_target(true)
        .init();

    let config = ServerConfig::from(Cli::parse());
    let addr: SocketAddr = config.bind_addr.parse()?;

    let state = AppState::new(config.sim.clone());
    let router = create_router(state.clone());

    info!(
        http_addr = %addr,
        start_delay_ms = config.sim.start_delay.as_millis() as u64,
        min_duration_secs = config.sim.min_duration.as_secs(),
        max_duration_secs = config.sim.max_duration.as_secs(),
        "Starting ScanRun server"
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Server stopped");
    Ok(())
}
