//! SolPulse - Solana Network Telemetry Relay
//!
//! Samples chain performance counters on a fixed interval, derives normalized
//! congestion metrics, and fans them out to WebSocket subscribers while
//! serving status, history, and fee queries over HTTP.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solpulse_backend::{
    api::{create_router, AppState},
    cache::SnapshotCache,
    hub::BroadcastHub,
    middleware::logging::request_logging,
    models::Config,
    poller::Poller,
    rpc::{PerformanceSource, SolanaRpcClient},
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    info!("🛰️ SolPulse Telemetry Relay Starting");
    info!("  RPC endpoint: {}", config.rpc_url);
    info!("  Poll interval: {}s", config.poll_interval_secs);

    let source: Arc<dyn PerformanceSource> =
        Arc::new(SolanaRpcClient::new(&config).context("Failed to build RPC client")?);
    let cache = Arc::new(SnapshotCache::new());
    let hub = Arc::new(BroadcastHub::with_queue_depth(
        config.subscriber_queue_depth,
    ));

    let state = AppState {
        source: source.clone(),
        cache: cache.clone(),
        hub: hub.clone(),
        config: config.clone(),
    };

    // The poller runs for the lifetime of the process, independent of any
    // client activity.
    tokio::spawn(Poller::new(source, cache, hub, config.clone()).run());

    let app = create_router(state)
        .layer(axum::middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solpulse_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
