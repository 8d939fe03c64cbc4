//! Origin admission
//!
//! Rejects browser requests whose `Origin` is not on the allow-list before
//! they reach rate accounting or the handler.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header;
use axum::response::IntoResponse;

use crate::config::SecurityConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::pipeline::{Next, Rejection, Request, Response, Stage};

/// Pipeline stage enforcing `allowed_origins`
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    config: Arc<SecurityConfig>,
}

impl AdmissionGate {
    pub fn new(config: Arc<SecurityConfig>) -> Self {
        Self { config }
    }

    /// The disallowed origin, if the request carries one.
    ///
    /// Requests without an `Origin` header (same-origin navigation, curl,
    /// server-to-server) are admitted.
    pub fn rejected_origin(&self, request: &Request) -> Option<String> {
        if self.config.debug {
            return None;
        }

        let origin = request.headers().get(header::ORIGIN)?;
        match origin.to_str() {
            Ok(origin) if self.config.is_origin_allowed(origin) => None,
            Ok(origin) => Some(origin.to_string()),
            Err(_) => Some("<non-ascii>".to_string()),
        }
    }
}

#[async_trait]
impl Stage for AdmissionGate {
    fn name(&self) -> &'static str {
        "admission"
    }

    async fn process(&self, request: Request, next: Next<'_>) -> GatewayResult<Response> {
        if let Some(origin) = self.rejected_origin(&request) {
            let mut response = GatewayError::AdmissionRejected { origin }.into_response();
            response.extensions_mut().insert(Rejection::OriginNotAllowed);
            return Ok(response);
        }

        next.run(request).await
    }
}
