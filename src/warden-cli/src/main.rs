//! Warden CLI - Main entry point.
//!
//! Loads `warden.toml`, sets up logging and dispatches one subcommand:
//! - `list` / `describe` - inspect the command registry
//! - `check` - validate definition files
//! - `run` - dispatch an action against the sandbox world

use anyhow::Result;
use clap::Parser;

use warden_cli::WardenConfig;
use warden_cli::cli::{Cli, LogLevel, dispatch_command};

/// Pick the log level: `--trace`, `--verbose`, `--log-level`,
/// `WARDEN_LOG_LEVEL`, the config file, then the default.
fn resolve_log_level(cli: &Cli, config: &WardenConfig) -> LogLevel {
    if cli.trace {
        return LogLevel::Trace;
    }
    if cli.verbose {
        return LogLevel::Debug;
    }
    if let Some(level) = cli.log_level {
        return level;
    }
    if let Ok(env_level) = std::env::var("WARDEN_LOG_LEVEL")
        && let Some(level) = LogLevel::from_str_loose(&env_level)
    {
        return level;
    }
    config
        .log_level
        .as_deref()
        .and_then(LogLevel::from_str_loose)
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = WardenConfig::discover(cli.config.as_deref())?;

    let log_level = resolve_log_level(&cli, &config);
    let filter_str = if std::env::var("RUST_LOG").is_ok() {
        format!(
            "error,warden_cli={},warden_commands={},warden_ratelimits={}",
            log_level.as_filter_str(),
            log_level.as_filter_str(),
            log_level.as_filter_str()
        )
    } else {
        log_level.as_filter_str().to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(&filter_str)
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "Loaded config");
    }

    dispatch_command(cli, config).await
}
