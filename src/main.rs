//! Health ticker service.
//!
//! ```text
//!   recovery loop ─┐
//!   steady timer ──┼─▶ ticker ─▶ aggregator ─▶ probes (TCP)
//!                  │                 │
//!                  │                 ▼
//!                  │             snapshot ◀── GET /healthcheck
//!                  ▼
//!            transition log
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use health_ticker::config::{load_config, MonitorConfig};
use health_ticker::lifecycle::{signals, startup, Shutdown};
use health_ticker::observability::{logging, metrics};
use health_ticker::Error;

#[derive(Parser)]
#[command(name = "health-ticker")]
#[command(about = "Polls dependencies and serves their aggregated health", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MonitorConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "health-ticker starting"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| Error::Address(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    tracing::info!(
        bind_address = %config.server.bind_address,
        probes = config.probes.len(),
        interval_ms = config.ticker.interval_ms,
        recovery_interval_ms = config.ticker.recovery_interval_ms,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let shutdown = Shutdown::new();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    let probes = startup::build_probes(&config.probes);
    startup::run(config, probes, listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
