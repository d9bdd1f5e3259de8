use tracing::{info, warn};

use super::{apply_or_decline, target_text};
use crate::command::{AiCommand, CommandContext, CommandError};
use crate::host::Effect;
use crate::params::Parameters;

/// Fire an incident by definition name, with optional threat points.
#[derive(Debug, Default)]
pub struct TriggerEventCommand;

impl TriggerEventCommand {
    pub const NAME: &'static str = "TriggerEvent";
}

impl AiCommand for TriggerEventCommand {
    fn action_name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        "Trigger a game event. Target: incident definition name. Parameters: points=<int>".to_string()
    }

    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<bool, CommandError> {
        let incident = target_text(target)
            .map(str::to_string)
            .or_else(|| params.text("incident_def"));
        let Some(incident) = incident else {
            warn!(action = Self::NAME, "No incident named");
            return Ok(false);
        };

        let points = match params.get("points") {
            Some(value) => Some(
                value
                    .as_int()
                    .and_then(|p| u32::try_from(p).ok())
                    .ok_or_else(|| CommandError::InvalidParameter {
                        name: "points".to_string(),
                        reason: format!("expected a non-negative integer, got '{value}'"),
                    })?,
            ),
            None => None,
        };

        let effect = Effect::TriggerIncident {
            incident: incident.clone(),
            points,
        };
        match apply_or_decline(ctx, Self::NAME, effect)? {
            Some(outcome) => {
                info!(action = Self::NAME, incident = %incident, ?points, "{}", outcome.summary);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullNotifier;
    use crate::params::ParamValue;
    use crate::registry::CommandRegistry;
    use crate::sandbox::SandboxWorld;

    fn run(
        world: &mut SandboxWorld,
        target: Option<&str>,
        params: &Parameters,
    ) -> Result<bool, CommandError> {
        let registry = CommandRegistry::new();
        let mut ctx = CommandContext::new(world, &registry, &NullNotifier);
        TriggerEventCommand.execute(&mut ctx, target, params)
    }

    #[test]
    fn test_fires_known_incident_with_points() {
        let mut world = SandboxWorld::new().with_incident("RaidEnemy");
        let params = Parameters::new().with("points", ParamValue::Int(350));

        assert!(run(&mut world, Some("RaidEnemy"), &params).unwrap());
        assert_eq!(world.fired, vec![("RaidEnemy".to_string(), Some(350))]);
    }

    #[test]
    fn test_incident_from_parameter() {
        let mut world = SandboxWorld::new().with_incident("Eclipse");
        let params = Parameters::new().with("incident_def", ParamValue::Text("Eclipse".to_string()));

        assert!(run(&mut world, None, &params).unwrap());
        assert_eq!(world.fired.len(), 1);
    }

    #[test]
    fn test_unknown_incident_is_declined() {
        let mut world = SandboxWorld::new().with_incident("RaidEnemy");
        assert!(!run(&mut world, Some("Meteorite"), &Parameters::new()).unwrap());
        assert!(!run(&mut world, None, &Parameters::new()).unwrap());
        assert!(world.fired.is_empty());
    }

    #[test]
    fn test_negative_points_rejected() {
        let mut world = SandboxWorld::new().with_incident("RaidEnemy");
        let params = Parameters::new().with("points", ParamValue::Int(-5));
        assert!(run(&mut world, Some("RaidEnemy"), &params).is_err());
    }
}
