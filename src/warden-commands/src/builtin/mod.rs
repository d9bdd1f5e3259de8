//! Built-in commands.
//!
//! These commands are compiled in and always available, whatever
//! definitions are loaded.
//!
//! # Available Commands
//!
//! - `DraftPawn` - Toggle or set a colonist's draft status
//! - `HealPawn` - Heal every injury on a pawn
//! - `ForbidItems` / `AllowItems` - Forbid or allow loose items
//! - `TriggerEvent` - Fire an incident
//! - `BatchHarvest` - Designate mature plants for harvest
//! - `BatchMine` - Designate mineable rock
//!
//! [`DISCOVERED`] lists every built-in for registry population.
//! [`CURATED`] is the parser's static table, consulted before the registry.

mod batch;
mod event;
mod pawn;
mod resource;

use std::sync::Arc;

pub use batch::{BatchHarvestCommand, BatchMineCommand};
pub use event::TriggerEventCommand;
pub use pawn::{DraftPawnCommand, HealPawnCommand};
pub use resource::{AllowItemsCommand, ForbidItemsCommand};

use tracing::warn;

use crate::command::{AiCommand, CommandContext, CommandError};
use crate::host::{Effect, EffectOutcome, HostError};
use crate::registry::{CommandFactory, CommandRegistry};

fn build<C: AiCommand + Default + 'static>() -> Result<Arc<dyn AiCommand>, CommandError> {
    Ok(Arc::new(C::default()))
}

/// Apply `effect`. A host refusal is a handled failure (`Ok(None)`);
/// anything else is an error.
fn apply_or_decline(
    ctx: &mut CommandContext<'_>,
    action: &str,
    effect: Effect,
) -> Result<Option<EffectOutcome>, CommandError> {
    match ctx.host.apply(effect) {
        Ok(outcome) => Ok(Some(outcome)),
        Err(HostError::Rejected(reason)) => {
            warn!(action, reason = %reason, "Host declined effect");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Non-blank target text.
fn target_text(target: Option<&str>) -> Option<&str> {
    target.map(str::trim).filter(|t| !t.is_empty())
}

/// Every built-in command.
pub const DISCOVERED: &[CommandFactory] = &[
    build::<DraftPawnCommand>,
    build::<HealPawnCommand>,
    build::<ForbidItemsCommand>,
    build::<AllowItemsCommand>,
    build::<TriggerEventCommand>,
    build::<BatchHarvestCommand>,
    build::<BatchMineCommand>,
];

/// Commands the parser resolves before consulting the registry.
pub const CURATED: &[(&str, CommandFactory)] = &[
    ("BatchHarvest", build::<BatchHarvestCommand>),
    ("BatchMine", build::<BatchMineCommand>),
    ("DraftPawn", build::<DraftPawnCommand>),
    ("ForbidItems", build::<ForbidItemsCommand>),
    ("AllowItems", build::<AllowItemsCommand>),
];

/// Register every built-in. Returns how many were registered.
pub fn register_builtins(registry: &CommandRegistry) -> usize {
    registry.register_all_discovered(DISCOVERED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_builtins() {
        let registry = CommandRegistry::new();
        assert_eq!(register_builtins(&registry), DISCOVERED.len());
        assert_eq!(registry.len(), DISCOVERED.len());

        for name in [
            "draftpawn",
            "HEALPAWN",
            "ForbidItems",
            "allowitems",
            "TriggerEvent",
            "batchharvest",
            "BatchMine",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_curated_names_match_commands() {
        for (name, factory) in CURATED {
            let command = factory().unwrap();
            assert_eq!(command.action_name(), *name);
        }
    }
}
