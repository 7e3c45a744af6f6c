//! SolPulse Backend Library
//!
//! Network-telemetry aggregation and fan-out for the Solana chain: a poller
//! samples performance counters, derives normalized congestion metrics,
//! caches the latest snapshot, and pushes it to WebSocket subscribers while
//! the HTTP API serves status, history, and fee recommendations.

pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod hub;
pub mod middleware;
pub mod models;
pub mod network;
pub mod poller;
pub mod rpc;
