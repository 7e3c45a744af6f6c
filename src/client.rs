//! Reconnecting WebSocket subscriber for the push feed.
//!
//! Explicit connect → subscribe → stream state machine with exponential
//! backoff, independent of the pull path's bounded per-call retry policy.
//! Used by the `pulse-watch` binary and any embedding consumer.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::models::{ClientMessage, NetworkSnapshot, ServerMessage};

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// One received push update.
#[derive(Debug, Clone)]
pub struct NetworkUpdate {
    pub data: NetworkSnapshot,
    pub timestamp: DateTime<Utc>,
}

/// WebSocket client that subscribes to a telemetry channel and forwards
/// updates to a channel, reconnecting forever with backoff.
pub struct FeedClient {
    url: String,
    channel: String,
    update_tx: mpsc::UnboundedSender<NetworkUpdate>,
}

impl FeedClient {
    /// Returns the client and the receiver its updates arrive on.
    pub fn new(url: String, channel: String) -> (Self, mpsc::UnboundedReceiver<NetworkUpdate>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                url,
                channel,
                update_tx,
            },
            update_rx,
        )
    }

    /// Run forever, reconnecting on failure. Backoff doubles up to a minute
    /// and resets after a clean connection.
    pub async fn run(&self) -> Result<()> {
        let mut reconnect_delay = INITIAL_RECONNECT_DELAY;

        loop {
            match self.connect_and_stream().await {
                Ok(()) => {
                    info!("feed connection closed gracefully");
                    reconnect_delay = INITIAL_RECONNECT_DELAY;
                }
                Err(e) => {
                    warn!(error = %e, "feed connection failed, reconnecting in {:?}", reconnect_delay);
                    sleep(reconnect_delay).await;
                    reconnect_delay = (reconnect_delay * 2).min(MAX_RECONNECT_DELAY);
                    continue;
                }
            }
            // Server closed on us; brief pause before resubscribing.
            sleep(INITIAL_RECONNECT_DELAY).await;
        }
    }

    async fn connect_and_stream(&self) -> Result<()> {
        info!(url = %self.url, "connecting to telemetry feed");
        let (ws_stream, response) = connect_async(&self.url)
            .await
            .context("Failed to connect to feed")?;
        info!(status = %response.status(), "feed connected");

        let (mut write, mut read) = ws_stream.split();

        let subscribe = ClientMessage::Subscribe {
            channel: Some(self.channel.clone()),
        };
        let subscribe_json =
            serde_json::to_string(&subscribe).context("Failed to serialize subscribe message")?;
        write
            .send(Message::Text(subscribe_json))
            .await
            .context("Failed to send subscription")?;
        info!(channel = %self.channel, "subscribed to telemetry channel");

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::NetworkUpdate { data, timestamp }) => {
                        if self
                            .update_tx
                            .send(NetworkUpdate { data, timestamp })
                            .is_err()
                        {
                            // Consumer dropped the receiver; nothing left to do.
                            return Ok(());
                        }
                    }
                    Ok(ServerMessage::Pong) => debug!("pong received"),
                    Err(e) => warn!(error = %e, "unparseable feed message"),
                },
                Ok(Message::Ping(payload)) => {
                    write
                        .send(Message::Pong(payload))
                        .await
                        .context("Failed to send pong")?;
                }
                Ok(Message::Close(frame)) => {
                    info!(?frame, "feed closed by server");
                    break;
                }
                Ok(_) => {}
                Err(e) => return Err(e).context("feed read error"),
            }
        }

        Ok(())
    }
}
