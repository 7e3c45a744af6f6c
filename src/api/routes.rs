//! Pull-path HTTP handlers: status, history, and fee recommendation.
//!
//! Status and history drive fresh upstream calls; the fee recommendation
//! reads the cached snapshot. Every failure surfaces as a typed 503, never a
//! zero-filled body.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::cache::SnapshotCache;
use crate::error::{ApiError, ServiceError};
use crate::hub::BroadcastHub;
use crate::models::{Config, FeePriority, FeeQuote, HistoryResult, NetworkSnapshot, Timeframe};
use crate::network::{derive, fees, history};
use crate::rpc::PerformanceSource;

/// Shared application state, explicitly constructed in `main` and cloned
/// into every handler. No ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn PerformanceSource>,
    pub cache: Arc<SnapshotCache>,
    pub hub: Arc<BroadcastHub>,
    pub config: Config,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/network-status", get(get_network_status))
        .route("/api/historical-data", get(get_historical_data))
        .route(
            "/api/priority-fee-recommendation",
            post(post_priority_fee_recommendation),
        )
        .route("/ws", get(super::ws::websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "🛰️ SolPulse Operational - Network Telemetry Relay ACTIVE"
}

/// Current network status, derived fresh from the RPC endpoint.
async fn get_network_status(
    State(state): State<AppState>,
) -> Result<Json<NetworkSnapshot>, ApiError> {
    let snapshot = fetch_status(&state)
        .await
        .map_err(|e| ApiError::unavailable("Failed to fetch network status", e))?;
    Ok(Json(snapshot))
}

async fn fetch_status(state: &AppState) -> Result<NetworkSnapshot, ServiceError> {
    let samples = state
        .source
        .recent_samples(state.config.status_sample_count)
        .await?;
    let slot = state.source.current_slot().await?;
    let nodes = state.source.cluster_nodes().await?;
    derive::derive_snapshot(&samples, slot, nodes.len(), &state.config)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    timeframe: Option<String>,
}

/// Bucketed congestion history for the requested timeframe (default week).
async fn get_historical_data(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResult>, ApiError> {
    let timeframe = query
        .timeframe
        .as_deref()
        .map(Timeframe::parse)
        .unwrap_or(Timeframe::Week);

    let result = history::history(state.source.as_ref(), timeframe, &state.config)
        .await
        .map_err(|e| ApiError::unavailable("Failed to fetch historical data", e))?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeRecommendationRequest {
    transaction_type: Option<String>,
    priority: Option<String>,
    priority_fee: Option<String>,
}

/// Tiered fee quote from the cached snapshot plus caller preferences.
async fn post_priority_fee_recommendation(
    State(state): State<AppState>,
    Json(request): Json<FeeRecommendationRequest>,
) -> Result<Json<FeeQuote>, ApiError> {
    let (Some(tx_type), Some(priority_raw)) = (request.transaction_type, request.priority) else {
        return Err(ApiError::bad_request(
            "Transaction type and priority are required",
        ));
    };

    let priority = FeePriority::parse(&priority_raw)
        .ok_or_else(|| ApiError::bad_request("Priority must be standard, fast, or urgent"))?;

    let snapshot = state.cache.snapshot();
    let quote = fees::recommend(
        snapshot.as_deref(),
        &tx_type,
        priority,
        request.priority_fee.as_deref(),
    )
    .map_err(|e| ApiError::unavailable("Failed to calculate priority fee", e))?;

    Ok(Json(quote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterNode, PerformanceSample};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct UnreachableSource;

    #[async_trait]
    impl PerformanceSource for UnreachableSource {
        async fn recent_samples(
            &self,
            _limit: usize,
        ) -> Result<Vec<PerformanceSample>, ServiceError> {
            Err(ServiceError::SourceUnavailable("connection refused".into()))
        }

        async fn current_slot(&self) -> Result<u64, ServiceError> {
            Err(ServiceError::SourceUnavailable("connection refused".into()))
        }

        async fn cluster_nodes(&self) -> Result<Vec<ClusterNode>, ServiceError> {
            Err(ServiceError::SourceUnavailable("connection refused".into()))
        }
    }

    fn test_router() -> Router {
        create_router(AppState {
            source: Arc::new(UnreachableSource),
            cache: Arc::new(SnapshotCache::new()),
            hub: Arc::new(BroadcastHub::new()),
            config: Config::default(),
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn post_fee(body: Value) -> Response {
        test_router()
            .oneshot(
                Request::post("/api/priority-fee-recommendation")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn network_status_outage_surfaces_rpc_error_body() {
        let response = test_router()
            .oneshot(
                Request::get("/api/network-status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Failed to fetch network status");
        assert_eq!(body["isRpcError"], true);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn fee_request_without_priority_is_rejected() {
        let response = post_fee(json!({ "transactionType": "transfer" })).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Transaction type and priority are required");
        // Validation failures carry no upstream error fields.
        assert!(body.get("error").is_none());
        assert!(body.get("isRpcError").is_none());
    }

    #[tokio::test]
    async fn fee_request_with_unknown_priority_is_rejected() {
        let response = post_fee(json!({
            "transactionType": "transfer",
            "priority": "ludicrous"
        }))
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Priority must be standard, fast, or urgent");
    }

    #[tokio::test]
    async fn fee_request_before_first_poll_returns_unavailable() {
        let response = post_fee(json!({
            "transactionType": "transfer",
            "priority": "fast"
        }))
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Failed to calculate priority fee");
        // The cache being empty is not an RPC-boundary failure.
        assert_eq!(body["isRpcError"], false);
    }
}
