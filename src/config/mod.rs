//! Configuration module for the LeetCoach gateway
//!
//! Provides configuration with support for:
//! - YAML/TOML/JSON config files
//! - Environment variable overrides
//! - Validation
//!
//! All values are fixed at startup; the pipeline never observes a change.

pub mod security;

pub use security::{RateLimitConfig, SecurityConfig, SecurityHeadersConfig};

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LEETCOACH_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Telemetry settings
    pub telemetry: TelemetryConfig,
    /// Security settings
    pub security: SecurityConfig,
}

impl GatewayConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| GatewayError::Config(format!("YAML parse error: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| GatewayError::Config(format!("TOML parse error: {}", e)))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GatewayError::Config(format!("JSON parse error: {}", e)))?,
            _ => {
                return Err(GatewayError::Config(
                    "Unsupported config file format. Use .yaml, .toml, or .json".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load the default configuration with environment variable overrides
    pub fn from_env() -> GatewayResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (keys are given without the prefix)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> GatewayResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }

        if let Some(debug) = lookup("DEBUG") {
            self.security.debug = parse_env("DEBUG", &debug.to_ascii_lowercase())?;
        }

        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.security.allowed_origins = parse_origin_list(&origins);
        }

        if let Some(rpm) = lookup("RATE_LIMIT_PER_MINUTE") {
            self.security.rate_limiting.requests_per_minute =
                parse_env("RATE_LIMIT_PER_MINUTE", &rpm)?;
        }

        if let Some(window) = lookup("RATE_WINDOW_SECONDS") {
            self.security.rate_limiting.window_size_seconds =
                parse_env("RATE_WINDOW_SECONDS", &window)?;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.telemetry.log_level = level.to_ascii_lowercase();
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> GatewayResult<()> {
        self.server.validate()?;
        self.telemetry.validate()?;
        self.security.validate().map_err(|message| GatewayError::Validation {
            message,
            param: Some("security".to_string()),
        })?;
        Ok(())
    }

    /// Configuration for local development: origin checks off, verbose logs
    pub fn development() -> Self {
        let mut config = Self::default();
        config.security.debug = true;
        config.telemetry.log_level = "debug".to_string();
        config
    }

    /// Configuration for production: JSON logs and HSTS
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.json_logs = true;
        config.security.headers.hsts_max_age = Some(31_536_000);
        config
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> GatewayResult<T> {
    value.trim().parse().map_err(|_| {
        GatewayError::Config(format!("Invalid value for {}{}: {}", ENV_PREFIX, key, value))
    })
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout in seconds, applied around the routes inside the pipeline
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> GatewayResult<()> {
        if self.port == 0 {
            return Err(GatewayError::Validation {
                message: "Port cannot be 0".to_string(),
                param: Some("server.port".to_string()),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(GatewayError::Validation {
                message: "request_timeout_secs must be greater than 0".to_string(),
                param: Some("server.request_timeout_secs".to_string()),
            });
        }
        Ok(())
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> GatewayResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid socket address: {}", e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Enable telemetry
    pub enabled: bool,
    /// Log level
    pub log_level: String,
    /// Enable JSON logging
    pub json_logs: bool,
    /// Prometheus metrics endpoint path
    pub metrics_path: String,
    /// Service name for log records
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            json_logs: false,
            metrics_path: "/metrics".to_string(),
            service_name: "leetcoach-gateway".to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> GatewayResult<()> {
        const RESERVED: [&str; 4] = ["/", "/health", "/healthz", "/version"];
        if !self.metrics_path.starts_with('/') || RESERVED.contains(&self.metrics_path.as_str()) {
            return Err(GatewayError::Validation {
                message: format!("metrics_path '{}' must be an absolute, unused path", self.metrics_path),
                param: Some("telemetry.metrics_path".to_string()),
            });
        }
        Ok(())
    }
}
