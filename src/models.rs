//! Wire types and configuration for the telemetry relay.
//!
//! Every struct that crosses the HTTP or WebSocket boundary lives here, with
//! serde renames matching the public API the dashboard consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Congestion bucket, a pure function of the congestion percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CongestionStatus {
    Low,
    Medium,
    High,
}

impl CongestionStatus {
    pub fn from_percentage(pct: u8) -> Self {
        if pct < 30 {
            CongestionStatus::Low
        } else if pct < 70 {
            CongestionStatus::Medium
        } else {
            CongestionStatus::High
        }
    }
}

/// Confirmation latency bucket relative to a quiet network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationStatus {
    #[serde(rename = "Faster than usual")]
    FasterThanUsual,
    Normal,
    #[serde(rename = "Slower than usual")]
    SlowerThanUsual,
    #[serde(rename = "Very slow")]
    VerySlow,
}

/// Priority fee guidance bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityFeeStatus {
    #[serde(rename = "No priority fee needed")]
    None,
    #[serde(rename = "Low priority fee recommended")]
    Low,
    #[serde(rename = "Medium priority fee recommended")]
    Medium,
    #[serde(rename = "High priority fee recommended")]
    High,
}

/// The single current normalized telemetry reading.
///
/// Immutable: replaced wholesale on each successful poll, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub congestion_percentage: u8,
    pub congestion_status: CongestionStatus,
    pub avg_confirmation_time: String,
    pub confirmation_status: ConfirmationStatus,
    pub recommended_priority_fee: String,
    pub priority_fee_status: PriorityFeeStatus,
    pub tps: u64,
    pub block_time_ms: u64,
    pub failed_tx_percentage: f64,
    pub validator_count: usize,
    pub tps_change: f64,
    pub block_time_change: f64,
    pub failed_tx_change: f64,
    pub validator_count_change: f64,
    /// Thousands-separated for display; expected monotone but not enforced.
    pub current_slot: String,
}

/// One raw performance sample as returned by `getRecentPerformanceSamples`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    pub num_transactions: u64,
    pub num_failed_transactions: u64,
    pub sample_period_secs: f64,
    pub num_slots: u64,
}

/// One entry from `getClusterNodes`. Only the count matters to us, but
/// keeping the pubkey makes debug logging useful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    pub pubkey: String,
}

/// Named historical window mapped to a fixed sample count and label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[serde(rename = "24h")]
    Day,
    Week,
    Month,
}

impl Timeframe {
    /// Parse the query-string form. Unknown values fall back to the
    /// documented default of a week.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "24h" | "day" => Timeframe::Day,
            "month" => Timeframe::Month,
            _ => Timeframe::Week,
        }
    }

    /// How many raw samples to request for this window.
    pub fn sample_count(&self) -> usize {
        match self {
            Timeframe::Day => 24,
            Timeframe::Week => 7,
            Timeframe::Month => 4,
        }
    }
}

/// One averaged period of a history request. `day` carries the period label
/// ("Mon", "Week 2", "15:00") regardless of timeframe, matching the chart API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryBucket {
    pub day: String,
    pub congestion: u8,
    pub tps: u64,
    pub block_time: u64,
    pub fee: f64,
}

/// Full response of a history request: one bucket per label plus
/// whole-series congestion aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResult {
    pub timeframe: Timeframe,
    pub data: Vec<HistoryBucket>,
    pub avg_congestion: f64,
    pub peak_congestion: u8,
    pub low_congestion: u8,
}

/// Caller urgency preference for a fee recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeePriority {
    Standard,
    Fast,
    Urgent,
}

impl FeePriority {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "standard" => Some(FeePriority::Standard),
            "fast" => Some(FeePriority::Fast),
            "urgent" => Some(FeePriority::Urgent),
            _ => None,
        }
    }
}

/// A fee recommendation. String fields carry exact decimal literals so the
/// client never re-rounds them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub base_fee: String,
    pub priority_fee: String,
    pub total_fee: String,
    pub estimated_time: String,
}

/// Client → server messages on the push socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe {
        #[serde(default)]
        channel: Option<String>,
    },
    Unsubscribe,
    Ping,
}

/// Server → client messages on the push socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    NetworkUpdate {
        data: NetworkSnapshot,
        timestamp: DateTime<Utc>,
    },
    Pong,
}

/// Fixed historical baselines the `*Change` deltas are computed against.
/// Deliberately configuration, not a rolling average.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub tps: f64,
    pub block_time_ms: f64,
    pub failed_tx_pct: f64,
    pub validator_count: f64,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            tps: 1500.0,
            block_time_ms: 400.0,
            failed_tx_pct: 0.5,
            validator_count: 1950.0,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub port: u16,
    pub poll_interval_secs: u64,
    pub rpc_timeout_secs: u64,
    pub rpc_attempts: u32,
    /// How many raw samples back a status reading looks.
    pub status_sample_count: usize,
    /// Practical TPS ceiling the congestion percentage is normalized against.
    pub max_practical_tps: f64,
    pub subscriber_queue_depth: usize,
    pub baseline: Baseline,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            port: 5000,
            poll_interval_secs: 10,
            rpc_timeout_secs: 8,
            rpc_attempts: 3,
            status_sample_count: 4,
            max_practical_tps: 4000.0,
            subscriber_queue_depth: 16,
            baseline: Baseline::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Config::default();

        let config = Self {
            rpc_url: std::env::var("SOLANA_RPC_URL").unwrap_or(defaults.rpc_url),
            port: env_parse("PORT", defaults.port)?,
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", defaults.poll_interval_secs)?,
            rpc_timeout_secs: env_parse("RPC_TIMEOUT_SECS", defaults.rpc_timeout_secs)?,
            rpc_attempts: env_parse("RPC_RETRY_ATTEMPTS", defaults.rpc_attempts)?,
            status_sample_count: env_parse("STATUS_SAMPLE_COUNT", defaults.status_sample_count)?,
            max_practical_tps: env_parse("MAX_PRACTICAL_TPS", defaults.max_practical_tps)?,
            subscriber_queue_depth: env_parse(
                "SUBSCRIBER_QUEUE_DEPTH",
                defaults.subscriber_queue_depth,
            )?,
            baseline: Baseline {
                tps: env_parse("BASELINE_TPS", defaults.baseline.tps)?,
                block_time_ms: env_parse("BASELINE_BLOCK_TIME_MS", defaults.baseline.block_time_ms)?,
                failed_tx_pct: env_parse("BASELINE_FAILED_TX_PCT", defaults.baseline.failed_tx_pct)?,
                validator_count: env_parse(
                    "BASELINE_VALIDATOR_COUNT",
                    defaults.baseline.validator_count,
                )?,
            },
        };

        anyhow::ensure!(config.poll_interval_secs > 0, "POLL_INTERVAL_SECS must be positive");
        anyhow::ensure!(config.rpc_timeout_secs > 0, "RPC_TIMEOUT_SECS must be positive");
        anyhow::ensure!(config.rpc_attempts > 0, "RPC_RETRY_ATTEMPTS must be positive");
        anyhow::ensure!(config.status_sample_count > 0, "STATUS_SAMPLE_COUNT must be positive");
        anyhow::ensure!(config.max_practical_tps > 0.0, "MAX_PRACTICAL_TPS must be positive");
        anyhow::ensure!(
            config.subscriber_queue_depth > 0,
            "SUBSCRIBER_QUEUE_DEPTH must be positive"
        );

        Ok(config)
    }
}

/// Parse an env override if set. An explicitly set but malformed value is a
/// startup error, not a silent fall-through to the default.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}
