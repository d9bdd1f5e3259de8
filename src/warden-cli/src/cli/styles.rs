//! Help output styling.

use clap::builder::styling::{AnsiColor, Effects, Styles};

pub fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Cyan.on_default())
        .invalid(AnsiColor::Yellow.on_default())
}

/// Environment and path notes appended to `--help`.
pub const AFTER_HELP: &str = "\
ENVIRONMENT VARIABLES:
    WARDEN_LOG_LEVEL    Log verbosity (error, warn, info, debug, trace)
    RUST_LOG            When set, limits logging to warden crates

PATHS:
    Config         ./warden.toml, ~/.config/warden/config.toml
    Definitions    .warden/commands/, ~/.config/warden/commands/";
