//! Forbid and allow loose items.

use tracing::info;

use super::target_text;
use crate::command::{AiCommand, CommandContext, CommandError};
use crate::host::{Cell, Effect, ThingInfo};
use crate::params::{ParamValue, Parameters};

/// Forbid items matching the target name, or every item for `all`.
#[derive(Debug, Default)]
pub struct ForbidItemsCommand;

impl ForbidItemsCommand {
    pub const NAME: &'static str = "ForbidItems";
}

impl AiCommand for ForbidItemsCommand {
    fn action_name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        "Forbid items. Parameters: target=<itemName/all>, x=<int>, z=<int>, radius=<int>".to_string()
    }

    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<bool, CommandError> {
        set_forbidden(ctx, Self::NAME, target, params, true)
    }
}

/// Allow items matching the target name, or every item for `all`.
#[derive(Debug, Default)]
pub struct AllowItemsCommand;

impl AllowItemsCommand {
    pub const NAME: &'static str = "AllowItems";
}

impl AiCommand for AllowItemsCommand {
    fn action_name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        "Allow (unforbid) items. Parameters: target=<itemName/all>, x=<int>, z=<int>, radius=<int>"
            .to_string()
    }

    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<bool, CommandError> {
        set_forbidden(ctx, Self::NAME, target, params, false)
    }
}

/// Area filter built from `x`, `z` and `radius`. Inactive unless all three
/// are given and the radius is positive.
struct Area {
    center: Cell,
    radius_squared: i64,
}

impl Area {
    fn from_params(params: &Parameters) -> Result<Option<Self>, CommandError> {
        let (Some(x), Some(z), Some(radius)) = (params.get("x"), params.get("z"), params.get("radius"))
        else {
            return Ok(None);
        };
        let int = |name: &str, value: &ParamValue| {
            value
                .as_int()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| CommandError::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("expected an integer, got '{value}'"),
                })
        };
        let radius = i64::from(int("radius", radius)?);
        if radius <= 0 {
            return Ok(None);
        }
        Ok(Some(Self {
            center: Cell::new(int("x", x)?, int("z", z)?),
            radius_squared: radius * radius,
        }))
    }

    fn contains(&self, position: Option<Cell>) -> bool {
        position.is_some_and(|p| p.distance_squared(&self.center) <= self.radius_squared)
    }
}

fn matches_filter(thing: &ThingInfo, filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    [thing.label.as_deref(), thing.def_name.as_deref()]
        .into_iter()
        .flatten()
        .any(|name| name.to_lowercase().contains(filter))
}

/// Flip every matching item that is not already in the wanted state.
/// Matching nothing is still a success.
fn set_forbidden(
    ctx: &mut CommandContext<'_>,
    action: &str,
    target: Option<&str>,
    params: &Parameters,
    forbidden: bool,
) -> Result<bool, CommandError> {
    let filter = target_text(target)
        .filter(|t| !t.eq_ignore_ascii_case("all"))
        .map(str::to_lowercase);
    let area = Area::from_params(params)?;

    let ids: Vec<_> = ctx
        .host
        .things()
        .into_iter()
        .filter(|t| t.item && t.forbidden != forbidden)
        .filter(|t| matches_filter(t, filter.as_deref()))
        .filter(|t| area.as_ref().is_none_or(|a| a.contains(t.position)))
        .map(|t| t.id)
        .collect();

    for &thing in &ids {
        ctx.host.apply(Effect::SetForbidden { thing, forbidden })?;
    }

    info!(
        action,
        count = ids.len(),
        filter = filter.as_deref().unwrap_or("all"),
        "{} {} items",
        if forbidden { "Forbade" } else { "Allowed" },
        ids.len()
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EntityId, NullNotifier};
    use crate::registry::CommandRegistry;
    use crate::sandbox::{SandboxThing, SandboxWorld};

    fn world() -> SandboxWorld {
        SandboxWorld::new()
            .with_thing(SandboxThing::item(1, "steel", "Steel").at(10, 10))
            .with_thing(SandboxThing::item(2, "steel", "Steel").at(40, 40))
            .with_thing(SandboxThing::item(3, "packaged survival meal", "MealSurvivalPack").at(11, 10))
            .with_thing(SandboxThing::item(4, "wood", "WoodLog").at(12, 12).forbidden())
            .with_thing(SandboxThing::building(5, "wall", "Wall").at(10, 11))
    }

    fn run(
        command: &dyn AiCommand,
        world: &mut SandboxWorld,
        target: Option<&str>,
        params: &Parameters,
    ) -> bool {
        let registry = CommandRegistry::new();
        let mut ctx = CommandContext::new(world, &registry, &NullNotifier);
        command.execute(&mut ctx, target, params).unwrap()
    }

    fn forbidden(world: &SandboxWorld, id: u64) -> bool {
        world.thing(EntityId(id)).unwrap().forbidden
    }

    #[test]
    fn test_forbid_all_skips_buildings_and_forbidden() {
        let mut world = world();
        assert!(run(&ForbidItemsCommand, &mut world, None, &Parameters::new()));

        assert!(forbidden(&world, 1));
        assert!(forbidden(&world, 2));
        assert!(forbidden(&world, 3));
        assert!(!forbidden(&world, 5));
        // Item 4 was already forbidden and is left alone.
        assert_eq!(world.applied().len(), 3);
    }

    #[test]
    fn test_forbid_by_name_and_area() {
        let mut world = world();
        let params = Parameters::new()
            .with("x", ParamValue::Int(10))
            .with("z", ParamValue::Int(10))
            .with("radius", ParamValue::Int(5));

        assert!(run(&ForbidItemsCommand, &mut world, Some("Steel"), &params));
        assert!(forbidden(&world, 1));
        assert!(!forbidden(&world, 2));
        assert!(!forbidden(&world, 3));
    }

    #[test]
    fn test_allow_matches_nothing_still_succeeds() {
        let mut world = world();
        assert!(run(&AllowItemsCommand, &mut world, Some("plasteel"), &Parameters::new()));
        assert!(world.applied().is_empty());

        assert!(run(&AllowItemsCommand, &mut world, Some("ALL"), &Parameters::new()));
        assert!(!forbidden(&world, 4));
    }

    #[test]
    fn test_bad_area_parameter() {
        let mut world = world();
        let params = Parameters::new()
            .with("x", ParamValue::Text("left".to_string()))
            .with("z", ParamValue::Int(0))
            .with("radius", ParamValue::Int(3));

        let registry = CommandRegistry::new();
        let mut ctx = CommandContext::new(&mut world, &registry, &NullNotifier);
        assert!(ForbidItemsCommand.execute(&mut ctx, None, &params).is_err());
    }
}
