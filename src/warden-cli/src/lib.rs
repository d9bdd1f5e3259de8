//! Warden CLI library.
//!
//! - `cli/` - argument parsing and subcommand handlers
//! - `config` - `warden.toml` discovery
//! - `session` - registry, definitions and sandbox world for one run

pub mod cli;
pub mod config;
pub mod session;

pub use config::WardenConfig;
pub use session::{Session, SessionSettings};
