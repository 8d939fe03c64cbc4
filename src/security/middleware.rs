//! Security Stack
//!
//! Assembles the request pipeline with the stages in their fixed order and
//! builds the CORS layer that wraps the route table inside it.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::SecurityConfig;
use crate::pipeline::{Handler, Pipeline};
use crate::telemetry::{AccessLogStage, GatewayMetrics};

use super::{AdmissionGate, Clock, RateLimitStage, RateLimiter, SecurityHeaders, SystemClock};

/// Security state shared by every request
#[derive(Clone, Debug)]
pub struct SecurityState {
    pub config: Arc<SecurityConfig>,
    pub rate_limiter: Arc<RateLimiter>,
    pub headers: Arc<SecurityHeaders>,
    pub clock: Arc<dyn Clock>,
}

impl SecurityState {
    /// Create security state from configuration
    pub fn new(config: &SecurityConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &SecurityConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config.clone()),
            rate_limiter: Arc::new(RateLimiter::from_config(&config.rate_limiting)),
            headers: Arc::new(SecurityHeaders::new(&config.headers)),
            clock,
        }
    }

    /// Create a default security state (for development)
    pub fn development() -> Self {
        Self::new(&SecurityConfig {
            debug: true,
            ..Default::default()
        })
    }
}

/// Compose the pipeline around `handler`.
///
/// Stages run outer to inner:
/// 1. Access log (sees every outcome, including rejections and failures)
/// 2. Security headers (applied to every response that comes back)
/// 3. Origin admission (403 before any rate accounting)
/// 4. Rate limiting (innermost, only admitted requests consume quota)
pub fn build_pipeline<H>(
    security: &SecurityState,
    metrics: Arc<GatewayMetrics>,
    handler: H,
) -> Pipeline
where
    H: Handler + 'static,
{
    Pipeline::builder()
        .stage(AccessLogStage::new(metrics))
        .shared_stage(security.headers.clone())
        .stage(AdmissionGate::new(security.config.clone()))
        .stage(RateLimitStage::new(
            security.rate_limiter.clone(),
            security.clock.clone(),
        ))
        .build(handler)
}

/// Build CORS layer from configuration
pub fn build_cors_layer(config: &SecurityConfig) -> CorsLayer {
    if config.debug {
        return CorsLayer::very_permissive();
    }

    let mut cors = CorsLayer::new();

    if config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        // Wildcard subdomain entries cannot be expressed as a fixed list
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter(|o| !o.starts_with("*."))
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true);
    }

    cors.allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
    .expose_headers([
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderName::from_static("x-process-time"),
    ])
    .max_age(Duration::from_secs(600))
}
