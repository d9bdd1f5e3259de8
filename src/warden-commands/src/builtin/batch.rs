//! Bulk work designations.

use tracing::info;

use super::{apply_or_decline, target_text};
use crate::command::{AiCommand, CommandContext, CommandError};
use crate::host::{Effect, WorkDesignation};
use crate::params::Parameters;

/// Designation options shared by the batch commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BatchOptions {
    limit: Option<usize>,
    near_focus: bool,
}

impl BatchOptions {
    /// Unparseable values fall back to the defaults: no limit, any order.
    fn from_params(params: &Parameters) -> Self {
        let limit = params
            .int("limit")
            .filter(|l| *l > 0)
            .and_then(|l| usize::try_from(l).ok());
        let near_focus = params
            .bool("nearFocus")
            .or_else(|| params.bool("near_focus"))
            .unwrap_or(false);
        Self { limit, near_focus }
    }
}

fn designate(
    ctx: &mut CommandContext<'_>,
    action: &str,
    work: WorkDesignation,
    filter: Option<String>,
    params: &Parameters,
) -> Result<bool, CommandError> {
    let options = BatchOptions::from_params(params);
    let effect = Effect::Designate {
        work,
        filter: filter.clone(),
        limit: options.limit,
        near_focus: options.near_focus,
    };
    let Some(outcome) = apply_or_decline(ctx, action, effect)? else {
        return Ok(false);
    };

    info!(
        action,
        %work,
        count = outcome.affected,
        filter = filter.as_deref().unwrap_or("all"),
        limit = ?options.limit,
        near_focus = options.near_focus,
        "{}",
        outcome.summary
    );
    if outcome.affected > 0 {
        ctx.notifier.notify(&outcome.summary);
    }
    Ok(outcome.affected > 0)
}

/// Designate every mature plant for harvest.
#[derive(Debug, Default)]
pub struct BatchHarvestCommand;

impl BatchHarvestCommand {
    pub const NAME: &'static str = "BatchHarvest";
}

impl AiCommand for BatchHarvestCommand {
    fn action_name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        "Designate all mature plants for harvest. Parameters: limit=<number>, nearFocus=<true/false>"
            .to_string()
    }

    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _target: Option<&str>,
        params: &Parameters,
    ) -> Result<bool, CommandError> {
        designate(ctx, Self::NAME, WorkDesignation::Harvest, None, params)
    }
}

/// Designate mineable rock, optionally narrowed by the target name.
#[derive(Debug, Default)]
pub struct BatchMineCommand;

impl BatchMineCommand {
    pub const NAME: &'static str = "BatchMine";
}

impl AiCommand for BatchMineCommand {
    fn action_name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        "Designate all mineable resources for mining. Target: resource name or all. \
         Parameters: limit=<number>, nearFocus=<true/false>"
            .to_string()
    }

    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<bool, CommandError> {
        let filter = target_text(target)
            .filter(|t| !t.eq_ignore_ascii_case("all"))
            .map(str::to_lowercase);
        designate(ctx, Self::NAME, WorkDesignation::Mine, filter, params)
    }
}
