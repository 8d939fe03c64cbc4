//! Security configuration for the request pipeline
//!
//! Provides configuration for:
//! - Origin admission (allow-list and debug bypass)
//! - Sliding-window rate limiting
//! - Security response headers

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Disables origin/host enforcement and relaxes CORS
    pub debug: bool,
    /// Origins allowed to call the API; also fed to the CORS layer
    pub allowed_origins: Vec<String>,
    /// Rate limiting settings
    pub rate_limiting: RateLimitConfig,
    /// Security headers settings
    pub headers: SecurityHeadersConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            debug: false,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            rate_limiting: RateLimitConfig::default(),
            headers: SecurityHeadersConfig::default(),
        }
    }
}

impl SecurityConfig {
    /// Validate the security configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.debug && self.allowed_origins.is_empty() {
            return Err("No allowed origins configured and debug mode is off".to_string());
        }
        self.rate_limiting.validate()?;
        Ok(())
    }

    /// Check if an origin is allowed
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| {
            if allowed == "*" {
                true
            } else if let Some(domain) = allowed.strip_prefix("*.") {
                // Wildcard subdomain: "*.example.org" admits "https://api.example.org"
                origin
                    .strip_suffix(domain)
                    .is_some_and(|rest| rest.ends_with('.'))
            } else {
                origin == allowed
            }
        })
    }
}

/// Sliding-window rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Admission ceiling per client key within one window
    pub requests_per_minute: u32,
    /// Sliding window length in seconds
    pub window_size_seconds: u64,
    /// How often idle client keys are swept (0 disables the sweeper)
    pub sweep_interval_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            window_size_seconds: 60,
            sweep_interval_seconds: 300,
        }
    }
}

impl RateLimitConfig {
    /// Validate rate limit configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.requests_per_minute == 0 {
            return Err("requests_per_minute cannot be 0".to_string());
        }
        if self.window_size_seconds == 0 {
            return Err("window_size_seconds cannot be 0".to_string());
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_seconds > 0).then(|| Duration::from_secs(self.sweep_interval_seconds))
    }
}

/// Security headers configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityHeadersConfig {
    /// X-Frame-Options value
    pub frame_options: String,
    /// Referrer-Policy value
    pub referrer_policy: String,
    /// Content-Security-Policy value
    pub content_security_policy: String,
    /// Strict-Transport-Security max-age; no HSTS header when unset
    pub hsts_max_age: Option<u64>,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            frame_options: "DENY".to_string(),
            referrer_policy: "strict-origin-when-cross-origin".to_string(),
            content_security_policy: "default-src 'self'".to_string(),
            hsts_max_age: None,
        }
    }
}
