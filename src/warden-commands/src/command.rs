//! Command contract and safe execution.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use warden_ratelimits::UsageLimits;

use crate::host::{Host, HostError, Notifier};
use crate::params::Parameters;
use crate::registry::CommandRegistry;

/// Magnitude reported when a command succeeds.
pub const SUCCESS_MAGNITUDE: f32 = 2.0;
/// Magnitude reported when a command runs but returns false.
pub const FAILURE_MAGNITUDE: f32 = -1.0;
/// Magnitude reported when a command errors or panics.
pub const ERROR_MAGNITUDE: f32 = -2.0;
/// Magnitude reported when the requested action is unknown.
pub const UNKNOWN_MAGNITUDE: f32 = -0.5;

/// Errors a command can raise while executing.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A parameter was present but unusable.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A required parameter was absent.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// The host refused or failed an effect.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The command could not be constructed.
    #[error("Failed to construct command: {0}")]
    Construction(String),

    #[error("{0}")]
    Other(String),
}

/// Everything a command may touch while executing.
pub struct CommandContext<'a> {
    pub host: &'a mut dyn Host,
    /// Registry used to resolve delegates.
    pub registry: &'a CommandRegistry,
    pub notifier: &'a dyn Notifier,
    depth: usize,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        host: &'a mut dyn Host,
        registry: &'a CommandRegistry,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            host,
            registry,
            notifier,
            depth: 0,
        }
    }

    /// Number of delegations above the current command.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run `f` one delegation level deeper. The depth is restored even if
    /// `f` unwinds.
    pub(crate) fn nested<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.depth += 1;
        let mut guard = DepthGuard { ctx: self };
        f(&mut *guard.ctx)
    }
}

struct DepthGuard<'c, 'a> {
    ctx: &'c mut CommandContext<'a>,
}

impl Drop for DepthGuard<'_, '_> {
    fn drop(&mut self) {
        self.ctx.depth -= 1;
    }
}

/// A named action the agent can request.
pub trait AiCommand: Send + Sync {
    /// Unique name, matched case-insensitively.
    fn action_name(&self) -> &str;

    /// Description shown to the agent.
    fn description(&self) -> String;

    /// Perform the action. `Ok(false)` is a handled failure.
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<bool, CommandError>;

    /// Implementation name, used in collision diagnostics.
    fn implementation(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Cooldown and daily limits, for commands that have any.
    fn usage_limits(&self) -> Option<UsageLimits> {
        None
    }
}

/// Outcome of one dispatched command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub side_effect_magnitude: f32,
}

impl CommandResult {
    pub fn succeeded(message: impl Into<String>, magnitude: f32) -> Self {
        Self {
            success: true,
            message: message.into(),
            side_effect_magnitude: magnitude,
        }
    }

    pub fn failed(message: impl Into<String>, magnitude: f32) -> Self {
        Self {
            success: false,
            message: message.into(),
            side_effect_magnitude: magnitude,
        }
    }
}

/// Execute `command`, turning every outcome, panics included, into a
/// [`CommandResult`].
pub fn execute_safe(
    command: &dyn AiCommand,
    ctx: &mut CommandContext<'_>,
    target: Option<&str>,
    params: &Parameters,
) -> CommandResult {
    let name = command.action_name();
    info!(action = %name, target = target.unwrap_or(""), "Executing command");

    match catch_unwind(AssertUnwindSafe(|| command.execute(ctx, target, params))) {
        Ok(Ok(true)) => CommandResult::succeeded(
            format!("{name} completed successfully"),
            SUCCESS_MAGNITUDE,
        ),
        Ok(Ok(false)) => {
            warn!(action = %name, "Command reported failure");
            CommandResult::failed(format!("{name} failed to execute"), FAILURE_MAGNITUDE)
        }
        Ok(Err(e)) => {
            error!(action = %name, error = %e, "Command raised an error");
            CommandResult::failed(format!("{name} raised an error: {e}"), ERROR_MAGNITUDE)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(action = %name, panic = %message, "Command panicked");
            CommandResult::failed(format!("{name} panicked: {message}"), ERROR_MAGNITUDE)
        }
    }
}

/// Text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
