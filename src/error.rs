//! Error types for the LeetCoach gateway

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::HandlerFailure;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Main error type for the request pipeline and its configuration
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        param: Option<String>,
    },

    // Admission
    #[error("Origin not allowed: {origin}")]
    AdmissionRejected { origin: String },

    // Rate limiting
    #[error("Too many requests. Limit: {limit} per minute")]
    RateLimited { limit: u32, retry_after: Duration },

    // Failure raised by the wrapped business handler
    #[error("Handler failure: {0}")]
    Handler(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            retry_after: None,
            param: None,
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    pub fn with_param(mut self, param: &str) -> Self {
        self.param = Some(param.to_string());
        self
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::AdmissionRejected { .. } => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for the `error` field and for log records
    pub fn error_type(&self) -> &str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::Validation { .. } => "invalid_request_error",
            Self::AdmissionRejected { .. } => "origin_not_allowed",
            Self::RateLimited { .. } => "rate_limited",
            Self::Handler(_) => "handler_failure",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            Self::AdmissionRejected { .. } => ErrorResponse::new("Forbidden", &self.to_string()),
            Self::RateLimited { retry_after, .. } => {
                ErrorResponse::new("Rate limit exceeded", &self.to_string())
                    .with_retry_after(retry_after.as_secs())
            }
            Self::Validation { param: Some(p), .. } => {
                ErrorResponse::new(self.error_type(), &self.to_string()).with_param(p)
            }
            // Handler details stay in the logs
            Self::Handler(_) | Self::Internal(_) | Self::Config(_) => {
                ErrorResponse::new("Internal server error", "An unexpected error occurred")
            }
            _ => ErrorResponse::new(self.error_type(), &self.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_error_response());

        let mut response = (status, body).into_response();

        if let GatewayError::RateLimited { retry_after, .. } = &self {
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from(retry_after.as_secs()));
        }

        if status.is_server_error() {
            response
                .extensions_mut()
                .insert(HandlerFailure(self.to_string()));
        }

        response
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation {
            message: err.to_string(),
            param: None,
        }
    }
}
