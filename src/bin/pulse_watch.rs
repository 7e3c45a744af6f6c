//! Pulse Watch
//!
//! Connects to a running SolPulse service, subscribes to the network channel,
//! and prints each snapshot as it arrives.
//!
//! Usage:
//!   pulse-watch --url ws://127.0.0.1:5000/ws
//!
//! Environment:
//!   SOLPULSE_WS_URL - Feed endpoint (default: ws://127.0.0.1:5000/ws)

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use solpulse_backend::client::FeedClient;

#[derive(Parser, Debug)]
#[command(name = "pulse-watch")]
#[command(about = "SolPulse feed watcher - stream live network telemetry")]
struct Args {
    /// WebSocket endpoint of the SolPulse service
    #[arg(long, env = "SOLPULSE_WS_URL", default_value = "ws://127.0.0.1:5000/ws")]
    url: String,

    /// Channel to subscribe to
    #[arg(long, default_value = "network")]
    channel: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("pulse_watch=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("Starting Pulse Watch");
    info!("  Feed: {}", args.url);
    info!("  Channel: {}", args.channel);

    let (client, mut updates) = FeedClient::new(args.url, args.channel);
    tokio::spawn(async move {
        let _ = client.run().await;
    });

    while let Some(update) = updates.recv().await {
        let snapshot = &update.data;
        info!(
            congestion = snapshot.congestion_percentage,
            status = ?snapshot.congestion_status,
            tps = snapshot.tps,
            block_time_ms = snapshot.block_time_ms,
            slot = %snapshot.current_slot,
            fee = %snapshot.recommended_priority_fee,
            at = %update.timestamp,
            "network update"
        );
    }

    Ok(())
}
