//! HTTP request handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::state::AppState;

// ============== Health Handlers ==============

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Client keys currently held by the rate limiter
    pub tracked_clients: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.shutdown.is_draining() {
        "draining"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.shutdown.uptime().as_secs(),
        tracked_clients: state.security.rate_limiter.tracked_keys(),
    })
}

/// GET /healthz
pub async fn ready_check(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.shutdown.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ok")
    }
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics
        .set_tracked_clients(state.security.rate_limiter.tracked_keys());
    state.metrics.export()
}

/// GET /version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rust_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
    pub rust_version: String,
}

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        name: "LeetCoach Gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: env!("CARGO_PKG_DESCRIPTION").to_string(),
        endpoints: vec![
            "/health".to_string(),
            "/healthz".to_string(),
            "/version".to_string(),
            state.config.telemetry.metrics_path.clone(),
        ],
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<String>,
}
