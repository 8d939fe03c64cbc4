//! Security Headers
//!
//! Overwrites a fixed set of protective headers on every response:
//! - MIME sniffing opt-out
//! - Clickjacking prevention
//! - Legacy XSS filter flag
//! - Referrer policy and Content Security Policy
//! - Optional HTTP Strict Transport Security
//!
//! Any `Server` header is removed.

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use tracing::warn;

use crate::config::security::SecurityHeadersConfig;
use crate::error::GatewayResult;
use crate::pipeline::{Next, Request, Response, Stage};

/// Static header values for performance
struct StaticHeaders {
    x_content_type_options: HeaderValue,
    x_frame_options: HeaderValue,
    x_xss_protection: HeaderValue,
    referrer_policy: HeaderValue,
    content_security_policy: HeaderValue,
}

impl StaticHeaders {
    fn new() -> Self {
        Self {
            x_content_type_options: HeaderValue::from_static("nosniff"),
            x_frame_options: HeaderValue::from_static("DENY"),
            x_xss_protection: HeaderValue::from_static("1; mode=block"),
            referrer_policy: HeaderValue::from_static("strict-origin-when-cross-origin"),
            content_security_policy: HeaderValue::from_static("default-src 'self'"),
        }
    }
}

static STATIC_HEADERS: once_cell::sync::Lazy<StaticHeaders> =
    once_cell::sync::Lazy::new(StaticHeaders::new);

/// Precomputed header set, applied after the rest of the chain has run
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    frame_options: HeaderValue,
    referrer_policy: HeaderValue,
    content_security_policy: HeaderValue,
    hsts: Option<HeaderValue>,
}

impl SecurityHeaders {
    /// Build from configuration; unusable values fall back to the defaults
    pub fn new(config: &SecurityHeadersConfig) -> Self {
        Self {
            frame_options: configured(
                "frame_options",
                &config.frame_options,
                &STATIC_HEADERS.x_frame_options,
            ),
            referrer_policy: configured(
                "referrer_policy",
                &config.referrer_policy,
                &STATIC_HEADERS.referrer_policy,
            ),
            content_security_policy: configured(
                "content_security_policy",
                &config.content_security_policy,
                &STATIC_HEADERS.content_security_policy,
            ),
            hsts: config
                .hsts_max_age
                .map(|max_age| HeaderValue::from_str(&format!("max-age={}; includeSubDomains", max_age)))
                .and_then(Result::ok),
        }
    }

    /// Overwrite the protective headers and strip `Server`
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            STATIC_HEADERS.x_content_type_options.clone(),
        );
        headers.insert(header::X_FRAME_OPTIONS, self.frame_options.clone());
        headers.insert(header::X_XSS_PROTECTION, STATIC_HEADERS.x_xss_protection.clone());
        headers.insert(header::REFERRER_POLICY, self.referrer_policy.clone());
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            self.content_security_policy.clone(),
        );

        if let Some(hsts) = &self.hsts {
            headers.insert(header::STRICT_TRANSPORT_SECURITY, hsts.clone());
        }

        headers.remove(header::SERVER);
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::new(&SecurityHeadersConfig::default())
    }
}

fn configured(field: &str, value: &str, fallback: &HeaderValue) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| {
        warn!(field, value, "Invalid security header value, using default");
        fallback.clone()
    })
}

#[async_trait]
impl Stage for SecurityHeaders {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    async fn process(&self, request: Request, next: Next<'_>) -> GatewayResult<Response> {
        let mut response = next.run(request).await?;
        self.apply(response.headers_mut());
        Ok(response)
    }
}
