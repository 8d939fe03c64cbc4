//! Server state management

use std::sync::Arc;

use super::shutdown::ShutdownState;
use crate::config::GatewayConfig;
use crate::security::{Clock, SecurityState};
use crate::telemetry::GatewayMetrics;

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub security: SecurityState,
    pub metrics: Arc<GatewayMetrics>,
    pub shutdown: Arc<ShutdownState>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let security = SecurityState::new(&config.security);
        Self::with_security(config, security)
    }

    /// State whose rate accounting reads time from `clock`
    pub fn with_clock(config: GatewayConfig, clock: Arc<dyn Clock>) -> Self {
        let security = SecurityState::with_clock(&config.security, clock);
        Self::with_security(config, security)
    }

    fn with_security(config: GatewayConfig, security: SecurityState) -> Self {
        Self {
            config: Arc::new(config),
            security,
            metrics: Arc::new(GatewayMetrics::new()),
            shutdown: Arc::new(ShutdownState::new()),
        }
    }
}
