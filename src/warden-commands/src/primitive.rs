//! Built-in primitive actions available to definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::{Effect, Host};
use crate::params::{ParamValue, Parameters};
use crate::target::{EntityRef, ResolvedTarget};
use crate::wrapper::InvocationError;

/// A fixed action a definition can run without code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveAction {
    HealPawn,
    KillPawn,
    DraftPawn,
    UndraftPawn,
    ArrestPawn,
    ReleasePrisoner,
    RecruitPrisoner,
    SpawnThing,
    DestroyThing,
    ForbidThing,
    UnforbidThing,
    DeconstructBuilding,
    RepairBuilding,
    TriggerIncident,
    EndGameCondition,
    AddSilver,
    AddComponent,
    ChangeWeather,
    ChangeSeason,
    ImproveRelation,
    WorsenRelation,
}

impl PrimitiveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HealPawn => "HealPawn",
            Self::KillPawn => "KillPawn",
            Self::DraftPawn => "DraftPawn",
            Self::UndraftPawn => "UndraftPawn",
            Self::ArrestPawn => "ArrestPawn",
            Self::ReleasePrisoner => "ReleasePrisoner",
            Self::RecruitPrisoner => "RecruitPrisoner",
            Self::SpawnThing => "SpawnThing",
            Self::DestroyThing => "DestroyThing",
            Self::ForbidThing => "ForbidThing",
            Self::UnforbidThing => "UnforbidThing",
            Self::DeconstructBuilding => "DeconstructBuilding",
            Self::RepairBuilding => "RepairBuilding",
            Self::TriggerIncident => "TriggerIncident",
            Self::EndGameCondition => "EndGameCondition",
            Self::AddSilver => "AddSilver",
            Self::AddComponent => "AddComponent",
            Self::ChangeWeather => "ChangeWeather",
            Self::ChangeSeason => "ChangeSeason",
            Self::ImproveRelation => "ImproveRelation",
            Self::WorsenRelation => "WorsenRelation",
        }
    }
}

impl fmt::Display for PrimitiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where primitive arguments are looked up: resolved parameters first,
/// then the definition's fixed `action_params`.
struct Args<'a> {
    params: &'a Parameters,
    fixed: &'a BTreeMap<String, String>,
}

impl Args<'_> {
    fn get(&self, key: &str) -> Option<ParamValue> {
        self.params
            .get(key)
            .cloned()
            .or_else(|| self.fixed.get(key).map(|raw| ParamValue::infer(raw)))
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    fn name(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.def_name().map(str::to_string))
    }
}

fn reject(message: impl Into<String>) -> InvocationError {
    InvocationError::PrimitiveRejected(message.into())
}

fn pawn<'t>(
    action: PrimitiveAction,
    target: Option<&'t ResolvedTarget>,
) -> Result<&'t EntityRef, InvocationError> {
    target
        .and_then(ResolvedTarget::as_pawn)
        .ok_or_else(|| reject(format!("{action} requires a pawn target")))
}

fn thing<'t>(
    action: PrimitiveAction,
    target: Option<&'t ResolvedTarget>,
) -> Result<&'t EntityRef, InvocationError> {
    target
        .and_then(ResolvedTarget::as_thing)
        .ok_or_else(|| reject(format!("{action} requires a thing target")))
}

fn building<'t>(
    action: PrimitiveAction,
    target: Option<&'t ResolvedTarget>,
) -> Result<&'t EntityRef, InvocationError> {
    target
        .and_then(ResolvedTarget::as_building)
        .ok_or_else(|| reject(format!("{action} requires a building target")))
}

fn required_name(
    action: PrimitiveAction,
    args: &Args<'_>,
    key: &str,
) -> Result<String, InvocationError> {
    args.name(key)
        .ok_or_else(|| reject(format!("{action} requires '{key}'")))
}

fn positive_count(
    action: PrimitiveAction,
    args: &Args<'_>,
    key: &str,
) -> Result<u32, InvocationError> {
    match args.int(key) {
        Some(n) if n > 0 => Ok(u32::try_from(n).unwrap_or(u32::MAX)),
        Some(n) => Err(reject(format!("{action} requires a positive '{key}', got {n}"))),
        None => Err(reject(format!("{action} requires '{key}'"))),
    }
}

/// Translate a primitive into an effect, apply it, and return the host's
/// summary.
pub(crate) fn run_primitive(
    action: PrimitiveAction,
    host: &mut dyn Host,
    target: Option<&ResolvedTarget>,
    params: &Parameters,
    fixed: &BTreeMap<String, String>,
) -> Result<String, InvocationError> {
    let args = Args { params, fixed };

    let effect = match action {
        PrimitiveAction::HealPawn => Effect::HealPawn(pawn(action, target)?.id),
        PrimitiveAction::KillPawn => Effect::KillPawn(pawn(action, target)?.id),
        PrimitiveAction::DraftPawn => Effect::SetDrafted {
            pawn: pawn(action, target)?.id,
            drafted: true,
        },
        PrimitiveAction::UndraftPawn => Effect::SetDrafted {
            pawn: pawn(action, target)?.id,
            drafted: false,
        },
        PrimitiveAction::ArrestPawn => Effect::ArrestPawn(pawn(action, target)?.id),
        PrimitiveAction::ReleasePrisoner => Effect::ReleasePrisoner(pawn(action, target)?.id),
        PrimitiveAction::RecruitPrisoner => Effect::RecruitPrisoner(pawn(action, target)?.id),
        PrimitiveAction::SpawnThing => Effect::SpawnThing {
            def_name: required_name(action, &args, "thing_def")?,
            count: positive_count(action, &args, "count")?,
            at: target.and_then(ResolvedTarget::as_cell),
        },
        PrimitiveAction::DestroyThing => Effect::DestroyThing(thing(action, target)?.id),
        PrimitiveAction::ForbidThing => Effect::SetForbidden {
            thing: thing(action, target)?.id,
            forbidden: true,
        },
        PrimitiveAction::UnforbidThing => Effect::SetForbidden {
            thing: thing(action, target)?.id,
            forbidden: false,
        },
        PrimitiveAction::DeconstructBuilding => Effect::Deconstruct(building(action, target)?.id),
        PrimitiveAction::RepairBuilding => Effect::Repair(building(action, target)?.id),
        PrimitiveAction::TriggerIncident => Effect::TriggerIncident {
            incident: required_name(action, &args, "incident_def")?,
            points: args
                .int("points")
                .filter(|p| *p > 0)
                .map(|p| u32::try_from(p).unwrap_or(u32::MAX)),
        },
        PrimitiveAction::EndGameCondition => {
            Effect::EndGameCondition(required_name(action, &args, "condition_def")?)
        }
        PrimitiveAction::AddSilver => Effect::SpawnThing {
            def_name: "Silver".to_string(),
            count: positive_count(action, &args, "amount")?,
            at: target.and_then(ResolvedTarget::as_cell),
        },
        PrimitiveAction::AddComponent => Effect::SpawnThing {
            def_name: "ComponentIndustrial".to_string(),
            count: positive_count(action, &args, "amount")?,
            at: target.and_then(ResolvedTarget::as_cell),
        },
        PrimitiveAction::ChangeWeather => {
            Effect::ChangeWeather(required_name(action, &args, "weather_def")?)
        }
        PrimitiveAction::ChangeSeason => Effect::ChangeSeason(required_name(action, &args, "season")?),
        PrimitiveAction::ImproveRelation | PrimitiveAction::WorsenRelation => {
            let faction = target
                .and_then(ResolvedTarget::as_faction)
                .ok_or_else(|| reject(format!("{action} requires a faction target")))?;
            let amount = positive_count(action, &args, "amount")?;
            let amount = i32::try_from(amount).unwrap_or(i32::MAX);
            Effect::AffectGoodwill {
                faction: faction.id,
                delta: if action == PrimitiveAction::ImproveRelation {
                    amount
                } else {
                    -amount
                },
            }
        }
    };

    let outcome = host.apply(effect)?;
    Ok(outcome.summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Cell, EffectOutcome, EntityId, FactionInfo, HostError, PawnInfo, ThingInfo};

    #[derive(Default)]
    struct RecordingHost {
        applied: Vec<Effect>,
    }

    impl Host for RecordingHost {
        fn elevated_mode(&self) -> bool {
            true
        }

        fn pawns(&self) -> Vec<PawnInfo> {
            Vec::new()
        }

        fn things(&self) -> Vec<ThingInfo> {
            Vec::new()
        }

        fn factions(&self) -> Vec<FactionInfo> {
            Vec::new()
        }

        fn apply(&mut self, effect: Effect) -> Result<EffectOutcome, HostError> {
            self.applied.push(effect);
            Ok(EffectOutcome::new("done"))
        }
    }

    fn pawn_target(id: u64) -> ResolvedTarget {
        ResolvedTarget::Pawn(EntityRef::new(EntityId(id), "Alice"))
    }

    #[test]
    fn test_pawn_actions_need_a_pawn() {
        let mut host = RecordingHost::default();
        let none = BTreeMap::new();
        let params = Parameters::new();

        let result = run_primitive(PrimitiveAction::HealPawn, &mut host, None, &params, &none);
        assert!(matches!(result, Err(InvocationError::PrimitiveRejected(_))));

        let cell = ResolvedTarget::Cell(Cell::new(1, 1));
        let result = run_primitive(PrimitiveAction::KillPawn, &mut host, Some(&cell), &params, &none);
        assert!(result.is_err());
        assert!(host.applied.is_empty());

        let target = pawn_target(4);
        run_primitive(PrimitiveAction::DraftPawn, &mut host, Some(&target), &params, &none).unwrap();
        assert_eq!(
            host.applied,
            vec![Effect::SetDrafted {
                pawn: EntityId(4),
                drafted: true
            }]
        );
    }

    #[test]
    fn test_spawn_reads_params_then_fixed() {
        let mut host = RecordingHost::default();
        let fixed = BTreeMap::from([
            ("thing_def".to_string(), "Steel".to_string()),
            ("count".to_string(), "50".to_string()),
        ]);
        let params = Parameters::new().with("count", ParamValue::Int(5));
        let cell = ResolvedTarget::Cell(Cell::new(12, 7));

        run_primitive(PrimitiveAction::SpawnThing, &mut host, Some(&cell), &params, &fixed).unwrap();
        assert_eq!(
            host.applied,
            vec![Effect::SpawnThing {
                def_name: "Steel".to_string(),
                count: 5,
                at: Some(Cell::new(12, 7)),
            }]
        );
    }

    #[test]
    fn test_spawn_rejects_non_positive_count() {
        let mut host = RecordingHost::default();
        let fixed = BTreeMap::from([("thing_def".to_string(), "Steel".to_string())]);
        let params = Parameters::new().with("count", ParamValue::Int(0));

        let err = run_primitive(PrimitiveAction::SpawnThing, &mut host, None, &params, &fixed)
            .unwrap_err();
        assert!(err.to_string().contains("positive 'count'"));
    }

    #[test]
    fn test_add_silver() {
        let mut host = RecordingHost::default();
        let fixed = BTreeMap::from([("amount".to_string(), "200".to_string())]);

        run_primitive(PrimitiveAction::AddSilver, &mut host, None, &Parameters::new(), &fixed).unwrap();
        assert_eq!(
            host.applied,
            vec![Effect::SpawnThing {
                def_name: "Silver".to_string(),
                count: 200,
                at: None,
            }]
        );
    }

    #[test]
    fn test_relations() {
        let mut host = RecordingHost::default();
        let faction = ResolvedTarget::Faction(EntityRef::new(EntityId(9), "Union"));
        let params = Parameters::new().with("amount", ParamValue::Int(15));
        let none = BTreeMap::new();

        run_primitive(PrimitiveAction::WorsenRelation, &mut host, Some(&faction), &params, &none).unwrap();
        assert_eq!(
            host.applied,
            vec![Effect::AffectGoodwill {
                faction: EntityId(9),
                delta: -15
            }]
        );
    }

    #[test]
    fn test_named_defs() {
        let mut host = RecordingHost::default();
        let fixed = BTreeMap::from([("weather_def".to_string(), "Rain".to_string())]);

        let summary =
            run_primitive(PrimitiveAction::ChangeWeather, &mut host, None, &Parameters::new(), &fixed).unwrap();
        assert_eq!(summary, "done");
        assert_eq!(host.applied, vec![Effect::ChangeWeather("Rain".to_string())]);

        let err = run_primitive(PrimitiveAction::TriggerIncident, &mut host, None, &Parameters::new(), &fixed)
            .unwrap_err();
        assert!(err.to_string().contains("incident_def"));
    }
}
