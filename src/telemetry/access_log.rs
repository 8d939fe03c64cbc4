//! Access logging stage
//!
//! Emits one record per request under the [`ACCESS_LOG_TARGET`] target and
//! stamps `X-Process-Time` on every response it sees.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::http::HeaderValue;

use super::GatewayMetrics;
use crate::error::GatewayResult;
use crate::pipeline::{ClientKey, Next, Rejection, Request, Response, Stage};

/// Target used for access records, so they can be filtered independently
pub const ACCESS_LOG_TARGET: &str = "leetcoach_gateway::access";

/// Outermost pipeline stage
#[derive(Debug, Clone)]
pub struct AccessLogStage {
    metrics: Arc<GatewayMetrics>,
}

impl AccessLogStage {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Stage for AccessLogStage {
    fn name(&self) -> &'static str {
        "access_log"
    }

    async fn process(&self, request: Request, next: Next<'_>) -> GatewayResult<Response> {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let client = request
            .extensions()
            .get::<ClientKey>()
            .cloned()
            .unwrap_or_else(|| ClientKey::from_request(&request));

        let mut response = match next.run(request).await {
            Ok(response) => response,
            Err(err) => {
                let duration = start.elapsed();
                tracing::error!(
                    target: ACCESS_LOG_TARGET,
                    method = %method,
                    path = %path,
                    client = %client,
                    duration_ms = duration.as_secs_f64() * 1000.0,
                    error = %err,
                    error_type = err.error_type(),
                    "Request failed"
                );
                self.metrics
                    .record_handler_failure(method.as_str(), duration);
                return Err(err);
            }
        };

        let duration = start.elapsed();
        let status = response.status();
        let rejection = response.extensions().get::<Rejection>().copied();

        if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", duration.as_secs_f64())) {
            response.headers_mut().insert("x-process-time", value);
        }

        if status.is_client_error() || status.is_server_error() {
            tracing::warn!(
                target: ACCESS_LOG_TARGET,
                method = %method,
                path = %path,
                client = %client,
                status = status.as_u16(),
                duration_ms = duration.as_secs_f64() * 1000.0,
                rejection = rejection.map(|r| r.as_str()),
                "Request completed"
            );
        } else {
            tracing::info!(
                target: ACCESS_LOG_TARGET,
                method = %method,
                path = %path,
                client = %client,
                status = status.as_u16(),
                duration_ms = duration.as_secs_f64() * 1000.0,
                "Request completed"
            );
        }

        self.metrics
            .record_request(method.as_str(), status.as_u16(), duration);
        if let Some(rejection) = rejection {
            self.metrics.record_rejection(rejection);
        }

        Ok(response)
    }
}
