//! Entry point that turns agent requests into command results.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::builtin;
use crate::command::{
    AiCommand, CommandContext, CommandResult, ERROR_MAGNITUDE, UNKNOWN_MAGNITUDE, execute_safe,
};
use crate::host::{Host, Notifier, NullNotifier};
use crate::params::Parameters;
use crate::registry::{CommandFactory, CommandRegistry};

/// A structured request from the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    /// Parameter object; anything else is treated as no parameters.
    #[serde(default)]
    pub parameters: Option<Value>,
}

impl CommandRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Resolves requests against a curated factory table first and the command
/// registry second, then executes them safely.
pub struct CommandParser {
    /// Lower-cased name to display name and factory.
    factories: HashMap<String, (&'static str, CommandFactory)>,
    registry: Arc<CommandRegistry>,
    notifier: Arc<dyn Notifier>,
}

impl CommandParser {
    /// Parser with the built-in curated table.
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        let mut parser = Self::without_factories(registry);
        for (name, factory) in builtin::CURATED {
            parser.register_factory(*name, *factory);
        }
        parser
    }

    /// Parser that only consults the registry.
    pub fn without_factories(registry: Arc<CommandRegistry>) -> Self {
        Self {
            factories: HashMap::new(),
            registry,
            notifier: Arc::new(NullNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Add an entry to the curated table, replacing any with the same name.
    pub fn register_factory(&mut self, name: &'static str, factory: CommandFactory) {
        self.factories.insert(name.to_lowercase(), (name, factory));
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Dispatch one request. Never panics; every outcome is a result.
    pub fn parse_and_execute(&self, host: &mut dyn Host, request: &CommandRequest) -> CommandResult {
        let action = request.action.trim();
        if action.is_empty() {
            return CommandResult::failed("No command specified", 0.0);
        }

        let command = match self.resolve(action) {
            Some(Ok(command)) => command,
            Some(Err(message)) => {
                return CommandResult::failed(message, ERROR_MAGNITUDE);
            }
            None => {
                warn!(
                    action = %action,
                    available = %self.available_commands().join(", "),
                    "Unknown command"
                );
                return CommandResult::failed(format!("Unknown command: {action}"), UNKNOWN_MAGNITUDE);
            }
        };

        let params = Parameters::from_json(request.parameters.as_ref());
        let target = request.target.as_deref().filter(|t| !t.trim().is_empty());
        let mut ctx = CommandContext::new(host, &self.registry, self.notifier.as_ref());
        execute_safe(command.as_ref(), &mut ctx, target, &params)
    }

    /// Find a command: curated factories first, then the registry.
    fn resolve(&self, action: &str) -> Option<Result<Arc<dyn AiCommand>, String>> {
        if let Some((name, factory)) = self.factories.get(&action.to_lowercase()) {
            debug!(action = %name, "Resolved from curated table");
            return Some(match std::panic::catch_unwind(*factory) {
                Ok(Ok(command)) => Ok(command),
                Ok(Err(e)) => {
                    error!(action = %name, error = %e, "Failed to construct command");
                    Err(format!("{name} could not be constructed: {e}"))
                }
                Err(_) => {
                    error!(action = %name, "Command constructor panicked");
                    Err(format!("{name} could not be constructed"))
                }
            });
        }

        self.registry.get(action).map(Ok)
    }

    /// Every action name the parser can dispatch, sorted and deduplicated
    /// case-insensitively.
    pub fn available_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .values()
            .map(|(name, _)| (*name).to_string())
            .collect();
        for name in self.registry.names() {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                names.push(name);
            }
        }
        names.sort_by_key(|n| n.to_lowercase());
        names
    }

    /// Description of `action`, or a not-found message.
    pub fn describe(&self, action: &str) -> String {
        match self.resolve(action.trim()) {
            Some(Ok(command)) => command.description(),
            Some(Err(message)) => message,
            None => format!("Command '{}' not found", action.trim()),
        }
    }
}

impl std::fmt::Debug for CommandParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandParser")
            .field("commands", &self.available_commands())
            .finish_non_exhaustive()
    }
}
