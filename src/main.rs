use alloy::primitives::Address;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use custody_gateway::chain::{tx, ChainClient};
use custody_gateway::config::{self, ServiceConfig};
use custody_gateway::custody::correlator::EventCorrelator;
use custody_gateway::custody::events::event_stream;
use custody_gateway::custody::service::{CustodyPolicy, CustodyService};
use custody_gateway::custody::store::{MemoryStore, RecordStore};
use custody_gateway::http::HttpServer;
use custody_gateway::lifecycle::{signals, Shutdown};
use custody_gateway::observability;

/// Multi-signature custody wallet gateway.
#[derive(Debug, Parser)]
#[command(name = "custody-gateway", version)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_tracing();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => {
            tracing::warn!("No --config given, using built-in defaults");
            ServiceConfig::default()
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rpc_url = %config.chain.rpc_url,
        chain_id = config.chain.chain_id,
        "custody-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Capability objects, lifecycle owned here and injected downward.
    let client = ChainClient::new(&config.chain).await?;
    let signer = tx::operator_signer_from_env()?;
    let store: Arc<MemoryStore> = Arc::new(match &config.store.persistence_path {
        Some(path) => MemoryStore::load_from_file(std::path::Path::new(path))?,
        None => MemoryStore::new(None),
    });
    let factory: Address = config.custody.factory_address.parse().map_err(|e| {
        format!(
            "invalid custody.factory_address '{}': {e}",
            config.custody.factory_address
        )
    })?;

    let policy = CustodyPolicy {
        factory,
        owners_per_wallet: config.custody.owners_per_wallet,
        required_signatures: config.custody.required_signatures,
    };
    let service = Arc::new(CustodyService::new(
        client.clone(),
        store.clone() as Arc<dyn RecordStore>,
        signer,
        policy,
    ));

    let shutdown = Arc::new(Shutdown::new());

    // Event side: a single correlation task consuming the log stream.
    let events = event_stream(
        client,
        store.clone() as Arc<dyn RecordStore>,
        factory,
        Duration::from_millis(config.custody.poll_interval_ms),
    );
    let correlator = EventCorrelator::new(store as Arc<dyn RecordStore>, service.operator());
    let correlator_shutdown = shutdown.subscribe();
    let correlator_task = tokio::spawn(async move {
        correlator.run(events, correlator_shutdown).await;
    });

    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(service, &config);
    server.run(listener, shutdown.subscribe()).await?;

    let _ = correlator_task.await;
    tracing::info!("Shutdown complete");
    Ok(())
}
