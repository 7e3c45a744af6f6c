//! Solana JSON-RPC performance-sampling client.
//!
//! Three read-only queries: recent performance samples, current slot, and the
//! cluster node list. Every call gets bounded retries with jittered
//! exponential backoff; exhausting the budget surfaces `SourceUnavailable`.
//! No fallback values are ever synthesized.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::models::{ClusterNode, Config, PerformanceSample};

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(4);

/// Read-only view of the chain's performance counters. The poller, history
/// aggregator, and pull handlers all go through this seam so they can be
/// tested against a mock source.
#[async_trait]
pub trait PerformanceSource: Send + Sync {
    /// The most recent `limit` performance samples, newest first.
    async fn recent_samples(&self, limit: usize) -> Result<Vec<PerformanceSample>, ServiceError>;

    async fn current_slot(&self) -> Result<u64, ServiceError>;

    /// Cluster node list; callers only use its length as the validator count.
    async fn cluster_nodes(&self) -> Result<Vec<ClusterNode>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client against a configured Solana endpoint.
pub struct SolanaRpcClient {
    http: reqwest::Client,
    url: String,
    attempts: u32,
}

impl SolanaRpcClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.rpc_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            url: config.rpc_url.clone(),
            attempts: config.rpc_attempts.max(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = anyhow!("no attempts made");

        for attempt in 1..=self.attempts {
            match self.call_once(method, &params).await {
                Ok(value) => {
                    debug!(method, attempt, "RPC call succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(method, attempt, error = %e, "RPC call failed");
                    last_err = e;
                    if attempt < self.attempts {
                        // Jitter spreads retries so concurrent callers don't
                        // hammer a recovering endpoint in lockstep.
                        let jitter_ms =
                            rand::thread_rng().gen_range(0..=backoff.as_millis() as u64 / 2);
                        sleep(backoff + Duration::from_millis(jitter_ms)).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }
        }

        Err(last_err.context(format!("{} failed after {} attempts", method, self.attempts)))
    }

    async fn call_once<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("request failed")?
            .error_for_status()
            .context("endpoint returned an error status")?;

        let envelope: RpcEnvelope<T> = response
            .json()
            .await
            .context("invalid JSON-RPC response body")?;

        if let Some(err) = envelope.error {
            return Err(anyhow!("RPC error {}: {}", err.code, err.message));
        }

        envelope
            .result
            .ok_or_else(|| anyhow!("RPC response missing result"))
    }

    fn unavailable(err: anyhow::Error) -> ServiceError {
        ServiceError::SourceUnavailable(format!("{:#}", err))
    }
}

#[async_trait]
impl PerformanceSource for SolanaRpcClient {
    async fn recent_samples(&self, limit: usize) -> Result<Vec<PerformanceSample>, ServiceError> {
        self.call("getRecentPerformanceSamples", json!([limit]))
            .await
            .map_err(Self::unavailable)
    }

    async fn current_slot(&self) -> Result<u64, ServiceError> {
        self.call("getSlot", json!([])).await.map_err(Self::unavailable)
    }

    async fn cluster_nodes(&self) -> Result<Vec<ClusterNode>, ServiceError> {
        self.call("getClusterNodes", json!([]))
            .await
            .map_err(Self::unavailable)
    }
}
