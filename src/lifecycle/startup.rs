//! Startup orchestration.
//!
//! # Responsibilities
//! - Build probes and the aggregator from configuration
//! - Start the ticker and the HTTP server
//! - Tear everything down in order once shutdown is triggered
//!
//! # Design Decisions
//! - Server stops first, then the ticker, so no round outlives `run`

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{MonitorConfig, ProbeConfig};
use crate::error::Result;
use crate::health::{Aggregator, Probe, TcpProbe, Ticker};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;

/// Build one TCP probe per configured dependency.
pub fn build_probes(configs: &[ProbeConfig]) -> Vec<Arc<dyn Probe>> {
    configs
        .iter()
        .map(|probe| {
            Arc::new(TcpProbe::new(
                probe.name.clone(),
                probe.address.clone(),
                std::time::Duration::from_millis(probe.connect_timeout_ms),
            )) as Arc<dyn Probe>
        })
        .collect()
}

/// Build the aggregator for `config`, honouring the optional probe timeout.
pub fn build_aggregator(config: &MonitorConfig, probes: Vec<Arc<dyn Probe>>) -> Aggregator {
    let aggregator = Aggregator::new(probes);
    match config.ticker.probe_timeout() {
        Some(timeout) => aggregator.with_probe_timeout(timeout),
        None => aggregator,
    }
}

/// Log every overall health edge until the ticker goes away.
fn spawn_transition_logger(mut transitions: mpsc::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(healthy) = transitions.recv().await {
            if healthy {
                tracing::info!("Overall health: OK");
            } else {
                tracing::warn!("Overall health: FAILING");
            }
        }
    })
}

/// Run the monitor on `listener` until `shutdown` is triggered.
pub async fn run(
    config: MonitorConfig,
    probes: Vec<Arc<dyn Probe>>,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<()> {
    let aggregator = Arc::new(build_aggregator(&config, probes));
    let server = HttpServer::new(&config.server, aggregator.store());

    let (transition_tx, transition_rx) = mpsc::channel(16);
    let logger = spawn_transition_logger(transition_rx);
    let ticker = Ticker::start(aggregator, &config.ticker, Some(transition_tx), None);

    let served = server.run(listener, shutdown.subscribe()).await;

    ticker.close().await;
    if let Err(e) = logger.await {
        tracing::error!(error = %e, "Transition logger failed");
    }

    served?;
    Ok(())
}
