//! Telemetry and observability module
//!
//! Provides:
//! - Structured logging with tracing
//! - Per-request access records
//! - Prometheus metrics

mod access_log;
mod metrics;

pub use access_log::*;
pub use metrics::*;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;
use crate::error::{GatewayError, GatewayResult};

/// Initialize the process-wide subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_telemetry(config: &TelemetryConfig) -> GatewayResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_thread_ids(true)
            .with_target(true);

        subscriber.with(json_layer).try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(false)
            .with_line_number(false)
            .with_target(true)
            .compact();

        subscriber.with(fmt_layer).try_init()
    };

    result.map_err(|e| GatewayError::Config(format!("Failed to initialize logging: {}", e)))?;

    tracing::info!(
        service = %config.service_name,
        version = %env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}
