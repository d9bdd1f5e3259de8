//! Command registry.

use std::collections::HashMap;
use std::panic::catch_unwind;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::command::{AiCommand, CommandError, panic_message};

/// Builds one command. Used for compile-time discovery lists.
pub type CommandFactory = fn() -> Result<Arc<dyn AiCommand>, CommandError>;

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Registry of every known command, keyed by case-insensitive action name.
///
/// Registration overwrites: the last command registered under a name wins
/// and the collision is logged. Reads and writes may happen from any thread.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<dyn AiCommand>>>,
}

impl CommandRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry populated from `factories`.
    pub fn with_factories(factories: &[CommandFactory]) -> Self {
        let registry = Self::new();
        registry.register_all_discovered(factories);
        registry
    }

    /// Register a command, returning the one it replaced.
    ///
    /// Commands with an empty action name are skipped.
    pub fn register(&self, command: Arc<dyn AiCommand>) -> Option<Arc<dyn AiCommand>> {
        let name = command.action_name().trim().to_string();
        if name.is_empty() {
            warn!(
                implementation = command.implementation(),
                "Skipping command with empty action name"
            );
            return None;
        }

        let implementation = command.implementation();
        let previous = self.commands.write().insert(key(&name), command);
        match &previous {
            Some(old) => warn!(
                action = %name,
                previous = old.implementation(),
                replacement = implementation,
                "Duplicate command action name, overwriting"
            ),
            None => debug!(action = %name, "Registered command"),
        }
        previous
    }

    /// Construct and register every factory. A factory that fails or
    /// panics is logged and skipped. Returns how many were registered.
    pub fn register_all_discovered(&self, factories: &[CommandFactory]) -> usize {
        let mut count = 0;

        for factory in factories {
            match catch_unwind(*factory) {
                Ok(Ok(command)) if command.action_name().trim().is_empty() => warn!(
                    implementation = command.implementation(),
                    "Skipping command with empty action name"
                ),
                Ok(Ok(command)) => {
                    self.register(command);
                    count += 1;
                }
                Ok(Err(e)) => error!(error = %e, "Failed to construct command"),
                Err(payload) => {
                    error!(panic = %panic_message(payload.as_ref()), "Command constructor panicked")
                }
            }
        }

        info!(count, "Command registry initialized");
        count
    }

    /// Clear the registry and register `factories` again.
    pub fn rebuild(&self, factories: &[CommandFactory]) -> usize {
        self.clear();
        self.register_all_discovered(factories)
    }

    /// Unregister a command by name.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn AiCommand>> {
        self.commands.write().remove(&key(name))
    }

    /// Get a command by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AiCommand>> {
        self.commands.read().get(&key(name)).cloned()
    }

    /// Check if a command exists by name.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.read().contains_key(&key(name))
    }

    /// Get all registered commands, ordered by name.
    pub fn all(&self) -> Vec<Arc<dyn AiCommand>> {
        let commands = self.commands.read();
        let mut entries: Vec<_> = commands.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, c)| Arc::clone(c)).collect()
    }

    /// Get all action names as registered, ordered case-insensitively.
    pub fn names(&self) -> Vec<String> {
        self.all()
            .iter()
            .map(|c| c.action_name().trim().to_string())
            .collect()
    }

    /// Search commands by name or description.
    pub fn search(&self, query: &str) -> Vec<Arc<dyn AiCommand>> {
        let query = query.to_lowercase();
        self.all()
            .into_iter()
            .filter(|c| {
                c.action_name().to_lowercase().contains(&query)
                    || c.description().to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Get the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Clear all commands.
    pub fn clear(&self) {
        self.commands.write().clear();
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
