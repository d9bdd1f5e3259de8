//! Commands built from definitions.
//!
//! [`DefinitionCommand`] runs a definition through permissions, usage
//! limits, target resolution, parameter defaults and its execution strategy,
//! then records the use and reports back to the player.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use warden_ratelimits::{LimitViolation, UsageLimits, UsageSnapshot, UsageTracker};

use crate::command::{AiCommand, CommandContext, CommandError, panic_message};
use crate::definition::{CommandDefinition, DefinitionError, ExecutionStrategy};
use crate::host::{OpenGate, ReputationGate};
use crate::invoke::{InvokableRegistry, InvokeError};
use crate::params::{ParamValue, Parameters};
use crate::primitive::run_primitive;
use crate::target::{ResolvedTarget, TargetKind, resolve_target};

/// Deepest delegate chain allowed before a run is refused.
pub const MAX_DELEGATION_DEPTH: usize = 8;

/// Why a definition-driven command did not run to completion.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("This command requires elevated mode")]
    ElevatedModeRequired,

    #[error("Affinity requirement not met: {0}")]
    AffinityTooLow(String),

    #[error(transparent)]
    Limited(#[from] LimitViolation),

    #[error("Could not find target: {0}")]
    TargetNotFound(String),

    #[error("Delegate command not found: {0}")]
    DelegateNotFound(String),

    #[error("Delegate command {command} failed: {reason}")]
    DelegateFailed { command: String, reason: String },

    #[error("Delegation deeper than {} levels", MAX_DELEGATION_DEPTH)]
    DelegationTooDeep,

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("{0}")]
    PrimitiveRejected(String),

    #[error(transparent)]
    Host(#[from] crate::host::HostError),

    #[error("Command panicked: {0}")]
    Panicked(String),
}

/// Shared collaborators handed to every definition-driven command.
#[derive(Clone)]
pub struct CommandServices {
    pub tracker: Arc<UsageTracker>,
    pub invokables: Arc<InvokableRegistry>,
    pub gate: Arc<dyn ReputationGate>,
}

impl CommandServices {
    pub fn new(tracker: Arc<UsageTracker>) -> Self {
        Self {
            tracker,
            invokables: Arc::new(InvokableRegistry::new()),
            gate: Arc::new(OpenGate),
        }
    }

    pub fn with_invokables(mut self, invokables: Arc<InvokableRegistry>) -> Self {
        self.invokables = invokables;
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn ReputationGate>) -> Self {
        self.gate = gate;
        self
    }
}

impl Default for CommandServices {
    fn default() -> Self {
        Self::new(Arc::new(UsageTracker::with_system_clock()))
    }
}

impl std::fmt::Debug for CommandServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandServices")
            .field("tracker", &self.tracker)
            .field("invokables", &self.invokables.names())
            .finish_non_exhaustive()
    }
}

/// A command backed by a validated [`CommandDefinition`].
#[derive(Debug)]
pub struct DefinitionCommand {
    definition: CommandDefinition,
    strategy: ExecutionStrategy,
    /// Declared defaults, coerced once at construction.
    defaults: Vec<(String, ParamValue)>,
    limits: UsageLimits,
    services: CommandServices,
}

impl DefinitionCommand {
    /// Validate `definition` and build the command. Every configuration
    /// problem is returned.
    pub fn new(
        definition: CommandDefinition,
        services: CommandServices,
    ) -> Result<Self, Vec<DefinitionError>> {
        let errors = definition.config_errors();
        if !errors.is_empty() {
            return Err(errors);
        }
        let strategy = definition.strategy().map_err(|e| vec![e])?;

        let defaults = definition
            .parameters
            .iter()
            .filter_map(|p| {
                p.default_value
                    .as_deref()
                    .map(|raw| (p.name.trim().to_string(), p.kind().coerce(raw)))
            })
            .collect();

        Ok(Self {
            limits: definition.limits(),
            definition,
            strategy,
            defaults,
            services,
        })
    }

    pub fn definition(&self) -> &CommandDefinition {
        &self.definition
    }

    pub fn strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }

    pub fn limits(&self) -> UsageLimits {
        self.limits
    }

    /// Usage recorded so far for this action.
    pub fn usage(&self) -> UsageSnapshot {
        self.services.tracker.snapshot(&self.definition.action_name)
    }

    fn name(&self) -> &str {
        &self.definition.action_name
    }

    /// Run the full pipeline and return the result text.
    ///
    /// Checks run in order: elevated mode, affinity, usage limits, target.
    /// The use is held from the limit check until the strategy finishes, so
    /// concurrent runs cannot exceed the limits. On success the use is kept,
    /// the affinity cost charged and the success message shown. On failure
    /// the use is given back and the failure message shown.
    pub fn run(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<String, InvocationError> {
        match self.run_inner(ctx, target, params) {
            Ok(result) => {
                if self.definition.affinity_cost_on_success > 0.0 {
                    self.services
                        .gate
                        .charge(self.name(), self.definition.affinity_cost_on_success);
                }
                if self.definition.show_message {
                    ctx.notifier.notify(&self.success_text(target, &result));
                }
                info!(action = %self.name(), result = %result, "Definition command succeeded");
                Ok(result)
            }
            Err(error) => {
                warn!(action = %self.name(), error = %error, "Definition command failed");
                if self.definition.show_message {
                    ctx.notifier.notify(&self.failure_text(target, &error));
                }
                Err(error)
            }
        }
    }

    fn run_inner(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<String, InvocationError> {
        let def = &self.definition;

        if def.requires_elevated_mode && !ctx.host.elevated_mode() {
            return Err(InvocationError::ElevatedModeRequired);
        }

        if def.has_affinity_requirement() {
            self.services
                .gate
                .check(self.name(), def.min_affinity_required)
                .map_err(InvocationError::AffinityTooLow)?;
        }

        let reservation = self.services.tracker.try_acquire(self.name(), &self.limits)?;

        let text = target.unwrap_or("");
        let resolved = if def.requires_target {
            Some(
                resolve_target(&*ctx.host, def.target_type, text)
                    .ok_or_else(|| InvocationError::TargetNotFound(text.to_string()))?,
            )
        } else if def.target_type != TargetKind::None {
            resolve_target(&*ctx.host, def.target_type, text)
        } else {
            None
        };
        if let Some(resolved) = &resolved {
            debug!(action = %self.name(), target = %resolved, "Resolved target");
        }

        let mut merged = params.clone();
        for (name, value) in &self.defaults {
            merged.fill_default(name, value);
        }

        let text = self.dispatch(ctx, target, params, resolved.as_ref(), &merged)?;
        reservation.commit();
        Ok(text)
    }

    fn dispatch(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        original_params: &Parameters,
        resolved: Option<&ResolvedTarget>,
        params: &Parameters,
    ) -> Result<String, InvocationError> {
        match &self.strategy {
            ExecutionStrategy::Delegate { command } => {
                if ctx.depth() >= MAX_DELEGATION_DEPTH {
                    return Err(InvocationError::DelegationTooDeep);
                }
                let delegate = ctx
                    .registry
                    .get(command)
                    .ok_or_else(|| InvocationError::DelegateNotFound(command.clone()))?;

                match ctx.nested(|ctx| delegate.execute(ctx, target, original_params)) {
                    Ok(true) => Ok(String::new()),
                    Ok(false) => Err(InvocationError::DelegateFailed {
                        command: command.clone(),
                        reason: "returned false".to_string(),
                    }),
                    Err(e) => Err(InvocationError::DelegateFailed {
                        command: command.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
            ExecutionStrategy::External { class, method } => {
                let text = self
                    .services
                    .invokables
                    .call(class, method, &mut *ctx.host, resolved, params)?;
                Ok(text.unwrap_or_default())
            }
            ExecutionStrategy::Primitive {
                action,
                params: fixed,
            } => run_primitive(*action, &mut *ctx.host, resolved, params, fixed),
        }
    }

    fn success_text(&self, target: Option<&str>, result: &str) -> String {
        match &self.definition.success_message {
            Some(template) => fill_template(template, target.unwrap_or(""), result),
            None => format!("{} executed successfully", self.name()),
        }
    }

    fn failure_text(&self, target: Option<&str>, error: &InvocationError) -> String {
        match &self.definition.failure_message {
            Some(template) => fill_template(template, target.unwrap_or(""), &error.to_string()),
            None => format!("{} failed: {error}", self.name()),
        }
    }
}

/// Substitute `{0}` with the target text and `{1}` with the result text.
fn fill_template(template: &str, target: &str, result: &str) -> String {
    template.replace("{0}", target).replace("{1}", result)
}

impl AiCommand for DefinitionCommand {
    fn action_name(&self) -> &str {
        self.name()
    }

    fn description(&self) -> String {
        self.definition.full_description()
    }

    fn usage_limits(&self) -> Option<UsageLimits> {
        (!self.limits.is_unlimited()).then_some(self.limits)
    }

    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<bool, CommandError> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run(ctx, target, params)))
            .unwrap_or_else(|payload| Err(InvocationError::Panicked(panic_message(payload.as_ref()))));
        Ok(outcome.is_ok())
    }
}
