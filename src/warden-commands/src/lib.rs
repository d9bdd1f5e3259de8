//! Command registration, resolution and dispatch for AI-driven actions.
//!
//! An agent asks for actions by name. This crate turns each request into a
//! call on a command implementation and reports back a [`CommandResult`].
//!
//! # Commands
//!
//! Anything implementing [`AiCommand`] can be registered with a
//! [`CommandRegistry`], which matches action names case-insensitively.
//! Commands come from two places:
//!
//! - hand-written built-ins listed in [`builtin::DISCOVERED`]
//! - YAML definitions, each wrapped in a [`DefinitionCommand`]
//!
//! # Definition File Format
//!
//! A file holds one definition or a list of them:
//!
//! ```yaml
//! - action_name: GiveSilver
//!   description: Give the colony some silver
//!   parameters:
//!     - name: amount
//!       type: int
//!       default_value: 100
//!   primitive_action: add_silver
//!   requires_elevated_mode: true
//!   cooldown_ticks: 2500
//!   daily_limit: 3
//!   success_message: "Delivered: {1}"
//! ```
//!
//! Each definition names exactly one execution strategy:
//! `delegate_to_command`, `external_class` with `external_method`, or
//! `primitive_action`.
//!
//! # Search Paths
//!
//! Definitions are loaded from:
//! 1. `.warden/commands/` (project-local)
//! 2. `~/.config/warden/commands/` (global)
//!
//! # Dispatch
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_commands::{CommandParser, CommandRegistry, CommandRequest, builtin};
//! use warden_commands::sandbox::SandboxWorld;
//!
//! let registry = Arc::new(CommandRegistry::new());
//! builtin::register_builtins(&registry);
//! let parser = CommandParser::new(registry);
//!
//! let mut world = SandboxWorld::demo();
//! let request = CommandRequest::new("DraftPawn").with_target("Alice");
//! let result = parser.parse_and_execute(&mut world, &request);
//! println!("{}", result.message);
//! ```

pub mod builtin;
mod command;
mod definition;
mod host;
mod invoke;
mod loader;
mod params;
mod parser;
mod primitive;
mod registry;
pub mod sandbox;
mod target;
mod wrapper;

pub use command::{
    AiCommand, CommandContext, CommandError, CommandResult, ERROR_MAGNITUDE, FAILURE_MAGNITUDE,
    SUCCESS_MAGNITUDE, UNKNOWN_MAGNITUDE, execute_safe,
};
pub use definition::{
    CommandDefinition, DefinitionError, ExecutionStrategy, MIN_AFFINITY, ParameterDef,
};
pub use host::{
    Cell, Effect, EffectOutcome, EntityId, FactionInfo, Host, HostError, Notifier, NullNotifier,
    OpenGate, PawnInfo, ReputationGate, ThingInfo, WorkDesignation, WorldObjectInfo, ZoneInfo,
};
pub use invoke::{
    Arg, ArgKind, Args, Invokable, InvokableRegistry, InvokeError, InvokeFn, InvokeParam,
};
pub use loader::{
    DefinitionIssue, DefinitionLoader, LoadReport, LoadedDefinitions, LoaderError,
    SourcedDefinition, parse_definitions, register_definitions,
};
pub use params::{DefKind, ParamKind, ParamValue, Parameters};
pub use parser::{CommandParser, CommandRequest};
pub use primitive::PrimitiveAction;
pub use registry::{CommandFactory, CommandRegistry};
pub use target::{EntityRef, ResolvedTarget, TargetKind, parse_cell, resolve_target};
pub use wrapper::{CommandServices, DefinitionCommand, InvocationError, MAX_DELEGATION_DEPTH};

pub use warden_ratelimits::{
    Clock, LimitViolation, ManualClock, SystemClock, UsageLimits, UsageSnapshot, UsageTracker,
};

/// Synchronous loader utilities.
pub mod sync {
    pub use crate::loader::sync::*;
}

/// Re-export common types for convenience.
pub mod prelude {
    pub use crate::{
        AiCommand, CommandContext, CommandDefinition, CommandError, CommandParser,
        CommandRegistry, CommandRequest, CommandResult, CommandServices, DefinitionCommand,
        DefinitionLoader, Effect, Host, InvokableRegistry, Notifier, Parameters, TargetKind,
    };
}
