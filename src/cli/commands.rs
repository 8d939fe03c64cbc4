//! CLI Command Implementations

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use crate::config::{GatewayConfig, ENV_PREFIX};
use crate::VERSION;

use super::{Cli, Commands, ConfigAction, ConfigCommand, HealthCommand, ServeCommand};

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;

    if let Some(level) = &cli.log_level {
        config.telemetry.log_level = level.to_ascii_lowercase();
    }
    if cli.json_logs {
        config.telemetry.json_logs = true;
    }

    match cli.command {
        Commands::Serve(cmd) => execute_serve(cmd, config, cli.quiet).await,
        Commands::Config(cmd) => execute_config(cmd, config),
        Commands::Health(cmd) => execute_health(cmd).await,
        Commands::Version => execute_version(),
    }
}

/// File settings first, then `LEETCOACH_*` variables on top
fn load_config(path: Option<&PathBuf>) -> Result<GatewayConfig> {
    match path {
        Some(path) => {
            let mut config = GatewayConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?;
            config.apply_env_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
            Ok(config)
        }
        None => Ok(GatewayConfig::from_env()?),
    }
}

/// Apply `serve` flags on top of the loaded configuration
pub fn apply_serve_overrides(cmd: ServeCommand, config: &mut GatewayConfig) {
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if cmd.debug {
        config.security.debug = true;
    }
    if let Some(limit) = cmd.rate_limit {
        config.security.rate_limiting.requests_per_minute = limit;
    }
    if let Some(window) = cmd.rate_window {
        config.security.rate_limiting.window_size_seconds = window;
    }
    if !cmd.allowed_origins.is_empty() {
        config.security.allowed_origins = cmd.allowed_origins;
    }
    if let Some(timeout) = cmd.timeout {
        config.server.request_timeout_secs = timeout;
    }
}

/// Execute the serve command
async fn execute_serve(cmd: ServeCommand, mut config: GatewayConfig, quiet: bool) -> Result<()> {
    apply_serve_overrides(cmd, &mut config);

    config
        .validate()
        .context("Configuration validation failed")?;

    if !quiet {
        print_banner(&config);
    }

    crate::run_server(config).await
}

/// Execute config subcommands
fn execute_config(cmd: ConfigCommand, config: GatewayConfig) -> Result<()> {
    match cmd.action {
        ConfigAction::Show { format } => {
            let output = match format.as_str() {
                "toml" => toml::to_string_pretty(&config)?,
                "json" => serde_json::to_string_pretty(&config)?,
                _ => serde_yaml::to_string(&config)?,
            };
            println!("{}", output);
            Ok(())
        }

        ConfigAction::Validate { file } => {
            let config = GatewayConfig::from_file(&file)?;
            let limits = &config.security.rate_limiting;
            println!("Configuration at {:?} is valid", file);
            println!(
                "  Rate limit: {} requests per {}s",
                limits.requests_per_minute, limits.window_size_seconds
            );
            println!("  Debug:      {}", config.security.debug);
            println!("  Origins:    {}", config.security.allowed_origins.join(", "));
            Ok(())
        }

        ConfigAction::Init { output, preset, force } => {
            if output.exists() && !force {
                bail!("File {:?} already exists. Use --force to overwrite.", output);
            }

            let config = match preset.as_str() {
                "development" => GatewayConfig::development(),
                "production" => GatewayConfig::production(),
                "standard" => GatewayConfig::default(),
                other => bail!("Unknown preset '{}'. Use development, standard or production.", other),
            };

            let yaml = serde_yaml::to_string(&config)?;
            std::fs::write(&output, yaml)?;
            println!("Created configuration file: {:?}", output);
            println!("Preset: {}", preset);
            Ok(())
        }

        ConfigAction::Env => {
            println!("Environment variables:");
            for (key, description) in ENV_VARS {
                println!("  {}{:<24} {}", ENV_PREFIX, key, description);
            }
            Ok(())
        }
    }
}

const ENV_VARS: [(&str, &str); 7] = [
    ("HOST", "Bind host"),
    ("PORT", "Bind port"),
    ("DEBUG", "Disable origin admission (true/false)"),
    ("ALLOWED_ORIGINS", "Comma-separated allowed origins"),
    ("RATE_LIMIT_PER_MINUTE", "Requests per client per window"),
    ("RATE_WINDOW_SECONDS", "Sliding window length"),
    ("LOG_LEVEL", "Log level"),
];

/// Execute the health command
async fn execute_health(cmd: HealthCommand) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cmd.timeout))
        .build()?;

    let endpoint = if cmd.ready { "healthz" } else { "health" };
    let url = format!("{}/{}", cmd.url.trim_end_matches('/'), endpoint);
    let start = Instant::now();

    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let latency = start.elapsed();
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match cmd.format.as_str() {
        "json" => {
            let parsed: serde_json::Value =
                serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
            let result = serde_json::json!({
                "url": url,
                "status": status.as_u16(),
                "latency_ms": latency.as_millis() as u64,
                "response": parsed,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            let marker = if status.is_success() { "✓" } else { "✗" };
            println!(
                "{} {} - Status: {} - Latency: {:?}",
                marker,
                url,
                status.as_u16(),
                latency
            );
        }
    }

    if status.is_success() {
        Ok(())
    } else {
        bail!("Health check failed with status {}", status)
    }
}

fn execute_version() -> Result<()> {
    println!("leetcoach-gateway {}", VERSION);
    println!();
    println!("Build Information:");
    println!("  Version:       {}", VERSION);
    println!("  Rust Version:  {}", env!("CARGO_PKG_RUST_VERSION"));
    Ok(())
}

fn print_banner(config: &GatewayConfig) {
    let limits = &config.security.rate_limiting;
    let base = format!("http://{}:{}", config.server.host, config.server.port);

    println!("LeetCoach gateway v{}", VERSION);
    println!();
    println!("Configuration:");
    println!("  • Server:     {}:{}", config.server.host, config.server.port);
    println!(
        "  • Rate limit: {} requests / {}s per client",
        limits.requests_per_minute, limits.window_size_seconds
    );
    println!(
        "  • Origins:    {}",
        if config.security.debug {
            "any (debug)".to_string()
        } else {
            config.security.allowed_origins.join(", ")
        }
    );
    println!();
    println!("Endpoints:");
    println!("  • Health:     {}/health", base);
    println!("  • Metrics:    {}{}", base, config.telemetry.metrics_path);
    println!();
}
