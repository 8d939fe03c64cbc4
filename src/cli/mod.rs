//! CLI Module for the LeetCoach gateway
//!
//! Provides subcommands for:
//! - Starting the gateway server
//! - Managing configuration
//! - Health checking a running instance

mod commands;

pub use commands::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::VERSION;

/// LeetCoach gateway: request pipeline for the interview feedback backend
#[derive(Parser, Debug)]
#[command(name = "leetcoach-gateway")]
#[command(version = VERSION)]
#[command(about = "Admission, rate limiting, security headers and access logging for the LeetCoach API")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Global configuration file path (YAML, TOML, or JSON)
    #[arg(short, long, global = true, env = "LEETCOACH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Global log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Enable JSON log output
    #[arg(long, global = true, env = "LEETCOACH_JSON_LOGS")]
    pub json_logs: bool,

    /// Quiet mode - suppress banner and non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the gateway server
    #[command(alias = "s")]
    Serve(ServeCommand),

    /// Configuration management
    #[command(alias = "cfg")]
    Config(ConfigCommand),

    /// Health check a running instance
    Health(HealthCommand),

    /// Show version and build information
    Version,
}

/// Start the gateway server
///
/// Flags left unset keep the value from the config file or environment.
#[derive(Parser, Debug)]
pub struct ServeCommand {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Debug mode: skip origin admission and relax CORS
    #[arg(long)]
    pub debug: bool,

    /// Requests allowed per client within one window
    #[arg(long)]
    pub rate_limit: Option<u32>,

    /// Sliding window length in seconds
    #[arg(long)]
    pub rate_window: Option<u64>,

    /// Allowed origin (repeatable; replaces the configured list)
    #[arg(long = "allowed-origin")]
    pub allowed_origins: Vec<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Configuration management
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (yaml, toml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        file: PathBuf,
    },

    /// Initialize a new configuration file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "leetcoach-gateway.yaml")]
        output: PathBuf,

        /// Configuration preset (development, standard, production)
        #[arg(short, long, default_value = "standard")]
        preset: String,

        /// Force overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show environment variable mappings
    Env,
}

/// Health check a running instance
#[derive(Parser, Debug)]
pub struct HealthCommand {
    /// Base URL of the gateway instance
    #[arg(short, long, default_value = "http://localhost:8000")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value = "5")]
    pub timeout: u64,

    /// Check readiness instead of liveness
    #[arg(short, long)]
    pub ready: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}
