//! Route definitions

use axum::{routing::get, Router};

use super::handlers;
use super::state::AppState;

/// Health, metrics and service info routes
pub fn health_routes(metrics_path: &str) -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::ready_check))
        .route(metrics_path, get(handlers::metrics))
        .route("/version", get(handlers::version))
        .route("/", get(handlers::root))
}
