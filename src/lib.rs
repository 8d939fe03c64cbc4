//! # LeetCoach Gateway
//!
//! Request-processing pipeline for the LeetCoach interview feedback backend.
//!
//! Every inbound HTTP request passes through an ordered chain of stages
//! before it reaches the business handlers:
//!
//! - **Access logging**: one structured record per request, `X-Process-Time`
//! - **Security headers**: protective headers on every response
//! - **Origin admission**: 403 for origins outside the allow-list
//! - **Rate limiting**: per-client sliding window with `X-RateLimit-*` headers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leetcoach_gateway::{run_server, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GatewayConfig::from_env()?;
//!     run_server(config).await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod security;
pub mod server;
pub mod telemetry;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use pipeline::{ClientKey, Handler, Next, Pipeline, Stage};
pub use security::RateLimiter;
pub use server::run_server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
