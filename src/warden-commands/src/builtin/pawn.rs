//! Commands acting on a single pawn.

use tracing::{info, warn};

use super::{apply_or_decline, target_text};
use crate::command::{AiCommand, CommandContext, CommandError};
use crate::host::Effect;
use crate::params::Parameters;
use crate::target::{TargetKind, resolve_target};

/// Toggle a colonist's draft status, or set it with `drafted=<bool>`.
#[derive(Debug, Default)]
pub struct DraftPawnCommand;

impl DraftPawnCommand {
    pub const NAME: &'static str = "DraftPawn";
}

impl AiCommand for DraftPawnCommand {
    fn action_name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        "Toggle draft status for a specific colonist. Target: colonist name. \
         Parameters: drafted=<true/false>"
            .to_string()
    }

    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<bool, CommandError> {
        let Some(name) = target_text(target) else {
            warn!(action = Self::NAME, "No colonist named");
            return Ok(false);
        };
        let Some(pawn) = resolve_target(&*ctx.host, TargetKind::Colonist, name)
            .and_then(|t| t.as_pawn().cloned())
        else {
            warn!(action = Self::NAME, target = name, "Colonist not found");
            return Ok(false);
        };

        let drafted = match params.get("drafted") {
            Some(value) => value.as_bool().ok_or_else(|| CommandError::InvalidParameter {
                name: "drafted".to_string(),
                reason: format!("expected true or false, got '{value}'"),
            })?,
            None => !ctx
                .host
                .pawns()
                .iter()
                .any(|p| p.id == pawn.id && p.drafted),
        };

        let effect = Effect::SetDrafted {
            pawn: pawn.id,
            drafted,
        };
        let Some(outcome) = apply_or_decline(ctx, Self::NAME, effect)? else {
            return Ok(false);
        };
        info!(action = Self::NAME, pawn = %pawn.label, drafted, "{}", outcome.summary);
        Ok(true)
    }
}

/// Heal every injury on a pawn.
#[derive(Debug, Default)]
pub struct HealPawnCommand;

impl HealPawnCommand {
    pub const NAME: &'static str = "HealPawn";
}

impl AiCommand for HealPawnCommand {
    fn action_name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        "Heal a specific pawn. Target: pawn name".to_string()
    }

    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        _params: &Parameters,
    ) -> Result<bool, CommandError> {
        let Some(name) = target_text(target) else {
            warn!(action = Self::NAME, "No pawn named");
            return Ok(false);
        };
        let Some(pawn) =
            resolve_target(&*ctx.host, TargetKind::Pawn, name).and_then(|t| t.as_pawn().cloned())
        else {
            warn!(action = Self::NAME, target = name, "Pawn not found");
            return Ok(false);
        };

        match apply_or_decline(ctx, Self::NAME, Effect::HealPawn(pawn.id))? {
            Some(outcome) => {
                info!(action = Self::NAME, pawn = %pawn.label, "{}", outcome.summary);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
