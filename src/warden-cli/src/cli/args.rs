//! CLI argument structures and parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::styles::{AFTER_HELP, get_styles};

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors
    Warn,
    /// Show informational messages, warnings, and errors (default)
    #[default]
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Warden - dispatch agent commands against a sandbox colony
#[derive(Debug, Parser)]
#[command(name = "warden")]
#[command(author, version)]
#[command(about = "Warden - AI command dispatch sandbox", long_about = None)]
#[command(styles = get_styles(), after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to a warden.toml config file
    #[arg(long = "config", short = 'c', global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra definition directory, searched before the configured ones
    #[arg(long = "definitions", short = 'd', global = true, value_name = "DIR")]
    pub definitions: Vec<PathBuf>,

    /// Sandbox world YAML to run against (default: demo colony)
    #[arg(long = "world", global = true, value_name = "FILE")]
    pub world: Option<PathBuf>,

    /// Force elevated mode on
    #[arg(long = "elevated", global = true)]
    pub elevated: bool,

    /// Log verbosity
    #[arg(long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose output (same as --log-level debug)
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,

    /// Enable trace output (same as --log-level trace)
    #[arg(long = "trace", global = true)]
    pub trace: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List every dispatchable action
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Show the description of one action
    Describe(DescribeArgs),

    /// Load definitions and report the ones that were rejected
    Check(CheckArgs),

    /// Dispatch an action against the sandbox world
    #[command(visible_alias = "r")]
    Run(RunArgs),
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Only actions whose name or description contains this text
    pub query: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct DescribeArgs {
    /// Action name (case-insensitive)
    pub action: String,
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Action name (case-insensitive)
    #[arg(required_unless_present = "request")]
    pub action: Option<String>,

    /// Target: a name, an id or "x,z"
    #[arg(long, short = 't')]
    pub target: Option<String>,

    /// Parameter as KEY=VALUE. VALUE is read as JSON when it parses.
    #[arg(long = "param", short = 'p', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Full request as JSON: {"action": ..., "target": ..., "parameters": {...}}
    #[arg(long, conflicts_with_all = ["action", "target", "params"])]
    pub request: Option<String>,

    /// Dispatch the same request this many times
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_as_filter_str() {
        assert_eq!(LogLevel::Error.as_filter_str(), "error");
        assert_eq!(LogLevel::Warn.as_filter_str(), "warn");
        assert_eq!(LogLevel::Info.as_filter_str(), "info");
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert_eq!(LogLevel::Trace.as_filter_str(), "trace");
    }

    #[test]
    fn test_log_level_from_str_loose() {
        assert_eq!(LogLevel::from_str_loose("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str_loose("Debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str_loose("TrAcE"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str_loose("err"), None);
        assert_eq!(LogLevel::from_str_loose(""), None);
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("amount=20"),
            Ok(("amount".to_string(), "20".to_string()))
        );
        assert_eq!(
            parse_key_val("note=a=b"),
            Ok(("note".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_val("amount").is_err());
        assert!(parse_key_val("=5").is_err());
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::parse_from([
            "warden", "-v", "run", "GiveSilver", "-t", "Alice", "-p", "amount=20", "--repeat",
            "3",
        ]);
        assert!(cli.verbose);
        let Commands::Run(run) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(run.action.as_deref(), Some("GiveSilver"));
        assert_eq!(run.target.as_deref(), Some("Alice"));
        assert_eq!(run.params, vec![("amount".to_string(), "20".to_string())]);
        assert_eq!(run.repeat, 3);
    }

    #[test]
    fn test_run_request_conflicts_with_action() {
        assert!(Cli::try_parse_from(["warden", "run", "--request", "{}"]).is_ok());
        assert!(Cli::try_parse_from(["warden", "run", "X", "--request", "{}"]).is_err());
        assert!(Cli::try_parse_from(["warden", "run"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["warden", "list", "--elevated", "-d", "defs", "--json"]);
        assert!(cli.elevated);
        assert_eq!(cli.definitions, vec![PathBuf::from("defs")]);
        assert!(matches!(cli.command, Commands::List(ListArgs { json: true, .. })));
    }
}
