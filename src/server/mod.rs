//! HTTP server implementation
//!
//! Serves the route table behind the request pipeline. Every request,
//! including unmatched paths, goes through access logging, security headers,
//! origin admission and rate limiting before it reaches a route.

mod handlers;
mod routes;
mod state;
pub mod shutdown;

pub use handlers::*;
pub use routes::*;
pub use shutdown::*;
pub use state::*;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::config::GatewayConfig;
use crate::pipeline::{PipelineService, RouterHandler};
use crate::security::{build_cors_layer, build_pipeline, spawn_sweeper};
use crate::telemetry::init_telemetry;

/// Run the gateway server
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    init_telemetry(&config.telemetry)?;

    let state = AppState::new(config.clone());
    let addr: SocketAddr = config.server.socket_addr()?;

    let sweeper = config
        .security
        .rate_limiting
        .sweep_interval()
        .map(|every| {
            spawn_sweeper(
                state.security.rate_limiter.clone(),
                state.security.clock.clone(),
                every,
            )
        });

    let app = create_app(state.clone(), create_router(state.clone()));

    info!(
        "Starting LeetCoach gateway v{} on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );
    info!(
        requests_per_minute = config.security.rate_limiting.requests_per_minute,
        window_seconds = config.security.rate_limiting.window_size_seconds,
        "Rate limiting configured"
    );
    info!(
        debug = config.security.debug,
        allowed_origins = ?config.security.allowed_origins,
        "Origin admission configured"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful_shutdown(state.shutdown.clone()))
    .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}

/// The gateway's own route table
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(&state.config.telemetry.metrics_path))
        .with_state(state)
}

/// Wrap `routes` with the request pipeline.
///
/// CORS and the request timeout sit inside the pipeline, around the route
/// table, so preflights and timed out requests are logged, stamped with the
/// security headers and gated like any other request.
pub fn create_app(state: AppState, routes: Router) -> Router {
    let routes = routes.layer(build_cors_layer(&state.security.config));
    let handler = RouterHandler::new(routes).with_timeout(state.config.server.request_timeout());

    let pipeline = build_pipeline(&state.security, state.metrics.clone(), handler);
    let service = PipelineService::new(Arc::new(pipeline))
        .with_error_headers(state.security.headers.clone());

    Router::new().fallback_service(service)
}
