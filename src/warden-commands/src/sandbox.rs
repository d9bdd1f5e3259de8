//! In-memory host.
//!
//! [`SandboxWorld`] is a small colony that applies every [`Effect`] to plain
//! data. The CLI runs commands against it, and tests use it in place of a
//! live game.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::host::{
    Cell, Effect, EffectOutcome, EntityId, FactionInfo, Host, HostError, Notifier, PawnInfo,
    ThingInfo, WorkDesignation, WorldObjectInfo, ZoneInfo,
};
use crate::invoke::{ArgKind, Invokable, InvokableRegistry, InvokeParam};
use crate::params::{ParamKind, ParamValue};

/// Invokable class installed by [`register_debug_tools`].
pub const DEBUG_TOOLS_CLASS: &str = "Sandbox.DebugTools";

const SEASONS: [&str; 4] = ["Spring", "Summer", "Fall", "Winter"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPawn {
    pub id: EntityId,
    pub name: String,
    pub nickname: Option<String>,
    pub colonist: bool,
    pub prisoner: bool,
    pub animal: bool,
    pub dead: bool,
    pub drafted: bool,
    pub injuries: u32,
}

impl SandboxPawn {
    pub fn colonist(id: u64, name: &str, nickname: &str) -> Self {
        Self {
            id: EntityId(id),
            name: name.to_string(),
            nickname: Some(nickname.to_string()),
            colonist: true,
            ..Default::default()
        }
    }

    pub fn prisoner(id: u64, name: &str, nickname: &str) -> Self {
        Self {
            colonist: false,
            prisoner: true,
            ..Self::colonist(id, name, nickname)
        }
    }

    pub fn animal(id: u64, name: &str) -> Self {
        Self {
            id: EntityId(id),
            name: name.to_string(),
            animal: true,
            ..Default::default()
        }
    }

    pub fn injured(mut self, injuries: u32) -> Self {
        self.injuries = injuries;
        self
    }

    pub fn deceased(mut self) -> Self {
        self.dead = true;
        self
    }

    pub fn label(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }

    fn info(&self) -> PawnInfo {
        PawnInfo {
            id: self.id,
            full_name: Some(self.name.clone()),
            short_label: self.nickname.clone(),
            colonist: self.colonist,
            dead: self.dead,
            prisoner: self.prisoner,
            animal: self.animal,
            drafted: self.drafted,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThingKind {
    #[default]
    Item,
    Building,
    Plant,
    Rock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxThing {
    pub id: EntityId,
    pub label: String,
    pub def_name: String,
    pub kind: ThingKind,
    pub player_owned: bool,
    pub forbidden: bool,
    pub position: Option<Cell>,
    pub stack_count: u32,
    pub hit_points: u32,
    pub max_hit_points: u32,
    /// Plants only: ready to harvest.
    pub mature: bool,
    pub designated: Option<WorkDesignation>,
}

impl Default for SandboxThing {
    fn default() -> Self {
        Self {
            id: EntityId::default(),
            label: String::new(),
            def_name: String::new(),
            kind: ThingKind::Item,
            player_owned: false,
            forbidden: false,
            position: None,
            stack_count: 1,
            hit_points: 100,
            max_hit_points: 100,
            mature: true,
            designated: None,
        }
    }
}

impl SandboxThing {
    fn new(id: u64, label: &str, def_name: &str, kind: ThingKind) -> Self {
        Self {
            id: EntityId(id),
            label: label.to_string(),
            def_name: def_name.to_string(),
            kind,
            ..Default::default()
        }
    }

    pub fn item(id: u64, label: &str, def_name: &str) -> Self {
        Self::new(id, label, def_name, ThingKind::Item)
    }

    /// A player-owned building.
    pub fn building(id: u64, label: &str, def_name: &str) -> Self {
        Self {
            player_owned: true,
            ..Self::new(id, label, def_name, ThingKind::Building)
        }
    }

    /// A mature plant.
    pub fn plant(id: u64, label: &str) -> Self {
        Self::new(id, label, "Plant", ThingKind::Plant)
    }

    pub fn rock(id: u64, label: &str, def_name: &str) -> Self {
        Self::new(id, label, def_name, ThingKind::Rock)
    }

    pub fn at(mut self, x: i32, z: i32) -> Self {
        self.position = Some(Cell::new(x, z));
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.forbidden = true;
        self
    }

    pub fn immature(mut self) -> Self {
        self.mature = false;
        self
    }

    pub fn damaged(mut self, hit_points: u32) -> Self {
        self.hit_points = hit_points.min(self.max_hit_points);
        self
    }

    fn matches(&self, needle: &str) -> bool {
        self.label.to_lowercase().contains(needle) || self.def_name.to_lowercase().contains(needle)
    }

    fn designatable(&self, work: WorkDesignation) -> bool {
        self.designated.is_none()
            && match work {
                WorkDesignation::Harvest => self.kind == ThingKind::Plant && self.mature,
                WorkDesignation::Mine => self.kind == ThingKind::Rock,
            }
    }

    fn info(&self) -> ThingInfo {
        ThingInfo {
            id: self.id,
            label: Some(self.label.clone()),
            def_name: Some(self.def_name.clone()),
            building: self.kind == ThingKind::Building,
            item: self.kind == ThingKind::Item,
            player_owned: self.player_owned,
            forbidden: self.forbidden,
            position: self.position,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxFaction {
    pub id: EntityId,
    pub name: String,
    /// Clamped to -100..=100.
    pub goodwill: i32,
}

impl SandboxFaction {
    pub fn new(id: u64, name: &str, goodwill: i32) -> Self {
        Self {
            id: EntityId(id),
            name: name.to_string(),
            goodwill,
        }
    }
}

/// An incident the world has fired, with its threat points.
pub type FiredIncident = (String, Option<u32>);

/// In-memory colony implementing [`Host`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxWorld {
    pub elevated: bool,
    /// Where the player is looking; nearest-first designations start here.
    pub focus: Cell,
    pub pawns: Vec<SandboxPawn>,
    pub things: Vec<SandboxThing>,
    pub zones: Vec<ZoneInfo>,
    pub factions: Vec<SandboxFaction>,
    pub world_objects: Vec<WorldObjectInfo>,
    /// Thing definitions that may be spawned.
    pub thing_defs: BTreeSet<String>,
    /// Incident definitions that may be fired.
    pub incidents: BTreeSet<String>,
    pub active_conditions: Vec<String>,
    pub weather: String,
    pub season: String,
    pub fired: Vec<FiredIncident>,
    #[serde(skip)]
    applied: Vec<Effect>,
}

impl SandboxWorld {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// A small colony with a bit of everything.
    pub fn demo() -> Self {
        let mut world = Self::new()
            .with_elevated(true)
            .with_focus(50, 50)
            .with_pawn(SandboxPawn::colonist(1, "Alice Moreau", "Alice").injured(2))
            .with_pawn(SandboxPawn::colonist(2, "Bertram Okafor", "Bert"))
            .with_pawn(SandboxPawn::colonist(3, "Tomasz Wren", "Tom").deceased())
            .with_pawn(SandboxPawn::prisoner(4, "Grim Tusk", "Grim").injured(1))
            .with_pawn(SandboxPawn::animal(5, "Muffalo"))
            .with_thing(SandboxThing::item(10, "steel", "Steel").at(48, 50))
            .with_thing(SandboxThing::item(11, "steel", "Steel").at(80, 20))
            .with_thing(SandboxThing::item(12, "silver", "Silver").at(51, 49))
            .with_thing(SandboxThing::item(13, "herbal medicine", "MedicineHerbal").forbidden())
            .with_thing(SandboxThing::building(20, "solar generator", "SolarGenerator").at(45, 52))
            .with_thing(SandboxThing::building(21, "granite wall", "Wall").at(46, 46).damaged(40))
            .with_thing(SandboxThing::plant(30, "rice plant").at(55, 55))
            .with_thing(SandboxThing::plant(31, "rice plant").at(70, 70))
            .with_thing(SandboxThing::plant(32, "corn plant").at(52, 51).immature())
            .with_thing(SandboxThing::rock(40, "granite", "Granite").at(60, 40))
            .with_thing(SandboxThing::rock(41, "compacted steel", "MineableSteel").at(62, 41))
            .with_faction(SandboxFaction::new(100, "Ashvale Union", 10))
            .with_faction(SandboxFaction::new(101, "Red Fang Pirates", -80));

        world.zones = vec![
            ZoneInfo {
                id: EntityId(200),
                label: "Stockpile zone 1".to_string(),
            },
            ZoneInfo {
                id: EntityId(201),
                label: "Growing zone 1".to_string(),
            },
        ];
        world.world_objects = vec![WorldObjectInfo {
            id: EntityId(300),
            label: "Ashvale".to_string(),
        }];
        world.thing_defs = ["Steel", "Silver", "ComponentIndustrial", "MealSimple", "WoodLog"]
            .into_iter()
            .map(String::from)
            .collect();
        world.incidents = ["RaidEnemy", "TraderCaravanArrival", "ResourcePodCrash", "Eclipse"]
            .into_iter()
            .map(String::from)
            .collect();
        world.active_conditions = vec!["ToxicFallout".to_string()];
        world.weather = "Clear".to_string();
        world.season = "Spring".to_string();
        world
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn with_elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    pub fn with_focus(mut self, x: i32, z: i32) -> Self {
        self.focus = Cell::new(x, z);
        self
    }

    pub fn with_pawn(mut self, pawn: SandboxPawn) -> Self {
        self.pawns.push(pawn);
        self
    }

    pub fn with_thing(mut self, thing: SandboxThing) -> Self {
        self.things.push(thing);
        self
    }

    pub fn with_faction(mut self, faction: SandboxFaction) -> Self {
        self.factions.push(faction);
        self
    }

    pub fn with_thing_def(mut self, def_name: &str) -> Self {
        self.thing_defs.insert(def_name.to_string());
        self
    }

    pub fn with_incident(mut self, incident: &str) -> Self {
        self.incidents.insert(incident.to_string());
        self
    }

    pub fn pawn(&self, id: EntityId) -> Option<&SandboxPawn> {
        self.pawns.iter().find(|p| p.id == id)
    }

    pub fn thing(&self, id: EntityId) -> Option<&SandboxThing> {
        self.things.iter().find(|t| t.id == id)
    }

    pub fn faction(&self, id: EntityId) -> Option<&SandboxFaction> {
        self.factions.iter().find(|f| f.id == id)
    }

    /// Total stack count of items with `def_name`.
    pub fn count_of(&self, def_name: &str) -> u32 {
        self.things
            .iter()
            .filter(|t| t.kind == ThingKind::Item && t.def_name == def_name)
            .map(|t| t.stack_count)
            .sum()
    }

    /// Every effect applied successfully, in order.
    pub fn applied(&self) -> &[Effect] {
        &self.applied
    }

    fn next_id(&self) -> EntityId {
        let highest = self
            .pawns
            .iter()
            .map(|p| p.id.0)
            .chain(self.things.iter().map(|t| t.id.0))
            .max()
            .unwrap_or(0);
        EntityId(highest + 1)
    }

    fn pawn_mut(&mut self, id: EntityId) -> Result<&mut SandboxPawn, HostError> {
        self.pawns
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(HostError::NotFound(id))
    }

    fn thing_index(&self, id: EntityId) -> Result<usize, HostError> {
        self.things
            .iter()
            .position(|t| t.id == id)
            .ok_or(HostError::NotFound(id))
    }

    fn apply_effect(&mut self, effect: &Effect) -> Result<EffectOutcome, HostError> {
        match effect {
            Effect::HealPawn(id) => {
                let pawn = self.pawn_mut(*id)?;
                if pawn.dead {
                    return Err(HostError::Rejected(format!("{} is dead", pawn.label())));
                }
                pawn.injuries = 0;
                Ok(EffectOutcome::new(format!("Healed {}", pawn.label())))
            }
            Effect::KillPawn(id) => {
                let pawn = self.pawn_mut(*id)?;
                if pawn.dead {
                    return Err(HostError::Rejected(format!("{} is already dead", pawn.label())));
                }
                pawn.dead = true;
                pawn.drafted = false;
                Ok(EffectOutcome::new(format!("{} died", pawn.label())))
            }
            Effect::ResurrectPawn(id) => {
                let pawn = self.pawn_mut(*id)?;
                if !pawn.dead {
                    return Err(HostError::Rejected(format!("{} is not dead", pawn.label())));
                }
                pawn.dead = false;
                pawn.injuries = 0;
                Ok(EffectOutcome::new(format!("Resurrected {}", pawn.label())))
            }
            Effect::SetDrafted { pawn, drafted } => {
                let pawn = self.pawn_mut(*pawn)?;
                if !pawn.colonist || pawn.dead {
                    return Err(HostError::Rejected(format!("{} cannot be drafted", pawn.label())));
                }
                pawn.drafted = *drafted;
                let state = if *drafted { "Drafted" } else { "Undrafted" };
                Ok(EffectOutcome::new(format!("{state} {}", pawn.label())))
            }
            Effect::ArrestPawn(id) => {
                let pawn = self.pawn_mut(*id)?;
                if pawn.dead || pawn.prisoner || pawn.animal {
                    return Err(HostError::Rejected(format!("{} cannot be arrested", pawn.label())));
                }
                pawn.prisoner = true;
                pawn.colonist = false;
                pawn.drafted = false;
                Ok(EffectOutcome::new(format!("Arrested {}", pawn.label())))
            }
            Effect::ReleasePrisoner(id) => {
                let pawn = self.pawn_mut(*id)?;
                if !pawn.prisoner {
                    return Err(HostError::Rejected(format!("{} is not a prisoner", pawn.label())));
                }
                pawn.prisoner = false;
                Ok(EffectOutcome::new(format!("Released {}", pawn.label())))
            }
            Effect::RecruitPrisoner(id) => {
                let pawn = self.pawn_mut(*id)?;
                if !pawn.prisoner || pawn.dead {
                    return Err(HostError::Rejected(format!("{} is not a prisoner", pawn.label())));
                }
                pawn.prisoner = false;
                pawn.colonist = true;
                Ok(EffectOutcome::new(format!("Recruited {}", pawn.label())))
            }
            Effect::SpawnThing { def_name, count, at } => {
                if !self.thing_defs.contains(def_name) {
                    return Err(HostError::Rejected(format!("Unknown thing def: {def_name}")));
                }
                if *count == 0 {
                    return Err(HostError::Rejected("Nothing to spawn".to_string()));
                }
                let thing = SandboxThing {
                    id: self.next_id(),
                    label: def_name.to_lowercase(),
                    def_name: def_name.clone(),
                    position: Some(at.unwrap_or(self.focus)),
                    stack_count: *count,
                    ..Default::default()
                };
                self.things.push(thing);
                Ok(EffectOutcome::with_count(format!("Spawned {count} {def_name}"), 1))
            }
            Effect::DestroyThing(id) => {
                let index = self.thing_index(*id)?;
                let thing = self.things.remove(index);
                Ok(EffectOutcome::new(format!("Destroyed {}", thing.label)))
            }
            Effect::SetForbidden { thing, forbidden } => {
                let index = self.thing_index(*thing)?;
                let thing = &mut self.things[index];
                thing.forbidden = *forbidden;
                let state = if *forbidden { "Forbade" } else { "Allowed" };
                Ok(EffectOutcome::new(format!("{state} {}", thing.label)))
            }
            Effect::Deconstruct(id) => {
                let index = self.thing_index(*id)?;
                if self.things[index].kind != ThingKind::Building || !self.things[index].player_owned {
                    return Err(HostError::Rejected(format!(
                        "{} is not a player building",
                        self.things[index].label
                    )));
                }
                let thing = self.things.remove(index);
                Ok(EffectOutcome::new(format!("Deconstructed {}", thing.label)))
            }
            Effect::Repair(id) => {
                let index = self.thing_index(*id)?;
                let thing = &mut self.things[index];
                if thing.kind != ThingKind::Building {
                    return Err(HostError::Rejected(format!("{} is not a building", thing.label)));
                }
                if thing.hit_points >= thing.max_hit_points {
                    return Err(HostError::Rejected(format!("{} is not damaged", thing.label)));
                }
                thing.hit_points = thing.max_hit_points;
                Ok(EffectOutcome::new(format!("Repaired {}", thing.label)))
            }
            Effect::TriggerIncident { incident, points } => {
                if !self.incidents.contains(incident) {
                    return Err(HostError::Rejected(format!("Unknown incident: {incident}")));
                }
                self.fired.push((incident.clone(), *points));
                Ok(EffectOutcome::new(format!("Triggered {incident}")))
            }
            Effect::EndGameCondition(condition) => {
                let before = self.active_conditions.len();
                self.active_conditions.retain(|c| c != condition);
                if self.active_conditions.len() == before {
                    return Err(HostError::Rejected(format!("{condition} is not active")));
                }
                Ok(EffectOutcome::new(format!("Ended {condition}")))
            }
            Effect::ChangeWeather(weather) => {
                if weather.trim().is_empty() {
                    return Err(HostError::Rejected("No weather given".to_string()));
                }
                self.weather = weather.clone();
                Ok(EffectOutcome::new(format!("Weather is now {weather}")))
            }
            Effect::ChangeSeason(season) => {
                let Some(season) = SEASONS.iter().find(|s| s.eq_ignore_ascii_case(season.trim()))
                else {
                    return Err(HostError::Rejected(format!("Unknown season: {season}")));
                };
                self.season = (*season).to_string();
                Ok(EffectOutcome::new(format!("Season is now {season}")))
            }
            Effect::AffectGoodwill { faction, delta } => {
                let faction = self
                    .factions
                    .iter_mut()
                    .find(|f| f.id == *faction)
                    .ok_or(HostError::NotFound(*faction))?;
                faction.goodwill = faction.goodwill.saturating_add(*delta).clamp(-100, 100);
                Ok(EffectOutcome::new(format!(
                    "Goodwill with {} is now {}",
                    faction.name, faction.goodwill
                )))
            }
            Effect::Designate {
                work,
                filter,
                limit,
                near_focus,
            } => Ok(self.designate(*work, filter.as_deref(), *limit, *near_focus)),
        }
    }

    fn designate(
        &mut self,
        work: WorkDesignation,
        filter: Option<&str>,
        limit: Option<usize>,
        near_focus: bool,
    ) -> EffectOutcome {
        let needle = filter.map(str::to_lowercase);
        let mut candidates: Vec<usize> = self
            .things
            .iter()
            .enumerate()
            .filter(|(_, t)| t.designatable(work))
            .filter(|(_, t)| needle.as_deref().is_none_or(|n| t.matches(n)))
            .map(|(i, _)| i)
            .collect();

        if near_focus {
            let focus = self.focus;
            candidates.sort_by_key(|&i| {
                self.things[i]
                    .position
                    .map_or(i64::MAX, |p| p.distance_squared(&focus))
            });
        }
        if let Some(limit) = limit {
            candidates.truncate(limit);
        }

        for &i in &candidates {
            self.things[i].designated = Some(work);
        }
        EffectOutcome::with_count(
            format!("Designated {} things to {work}", candidates.len()),
            candidates.len(),
        )
    }
}

impl Host for SandboxWorld {
    fn elevated_mode(&self) -> bool {
        self.elevated
    }

    fn pawns(&self) -> Vec<PawnInfo> {
        self.pawns.iter().map(SandboxPawn::info).collect()
    }

    fn things(&self) -> Vec<ThingInfo> {
        self.things.iter().map(SandboxThing::info).collect()
    }

    fn zones(&self) -> Vec<ZoneInfo> {
        self.zones.clone()
    }

    fn factions(&self) -> Vec<FactionInfo> {
        self.factions
            .iter()
            .map(|f| FactionInfo {
                id: f.id,
                name: Some(f.name.clone()),
            })
            .collect()
    }

    fn world_objects(&self) -> Vec<WorldObjectInfo> {
        self.world_objects.clone()
    }

    fn apply(&mut self, effect: Effect) -> Result<EffectOutcome, HostError> {
        let outcome = self.apply_effect(&effect)?;
        debug!(?effect, summary = %outcome.summary, "Applied effect");
        self.applied.push(effect);
        Ok(outcome)
    }
}

/// Notifier that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Install sample host routines under [`DEBUG_TOOLS_CLASS`].
pub fn register_debug_tools(registry: &mut InvokableRegistry) {
    fn applied(host: &mut dyn Host, effect: Effect) -> Result<Option<String>, String> {
        host.apply(effect)
            .map(|outcome| Some(outcome.summary))
            .map_err(|e| e.to_string())
    }

    registry
        .register(
            DEBUG_TOOLS_CLASS,
            "Resurrect",
            Invokable::new(vec![InvokeParam::new("pawn", ArgKind::Pawn)], |host, args| {
                let pawn = args.pawn(0).ok_or("No pawn given")?;
                applied(host, Effect::ResurrectPawn(pawn.id))
            }),
        )
        .register(
            DEBUG_TOOLS_CLASS,
            "Smite",
            Invokable::new(vec![InvokeParam::new("pawn", ArgKind::Pawn)], |host, args| {
                let pawn = args.pawn(0).ok_or("No pawn given")?;
                applied(host, Effect::KillPawn(pawn.id))
            }),
        )
        .register(
            DEBUG_TOOLS_CLASS,
            "HealAll",
            Invokable::new(Vec::new(), |host, _args| {
                let living: Vec<EntityId> = host
                    .pawns()
                    .into_iter()
                    .filter(|p| !p.dead)
                    .map(|p| p.id)
                    .collect();
                for &id in &living {
                    host.apply(Effect::HealPawn(id)).map_err(|e| e.to_string())?;
                }
                Ok(Some(format!("Healed {} pawns", living.len())))
            }),
        )
        .register(
            DEBUG_TOOLS_CLASS,
            "GiveSilver",
            Invokable::new(
                vec![
                    InvokeParam::new("amount", ArgKind::Value(ParamKind::Int))
                        .with_default(ParamValue::Int(100)),
                ],
                |host, args| {
                    let amount = args.int(0).unwrap_or(0);
                    let count = u32::try_from(amount)
                        .ok()
                        .filter(|c| *c > 0)
                        .ok_or_else(|| format!("Invalid amount: {amount}"))?;
                    applied(
                        host,
                        Effect::SpawnThing {
                            def_name: "Silver".to_string(),
                            count,
                            at: None,
                        },
                    )
                },
            ),
        )
        .register(
            DEBUG_TOOLS_CLASS,
            "SetGoodwill",
            Invokable::new(
                vec![
                    InvokeParam::new("faction", ArgKind::Faction),
                    InvokeParam::new("delta", ArgKind::Value(ParamKind::Int)),
                ],
                |host, args| {
                    let faction = args.faction(0).ok_or("No faction given")?;
                    let delta = args
                        .int(1)
                        .and_then(|d| i32::try_from(d).ok())
                        .ok_or("Invalid goodwill delta")?;
                    applied(
                        host,
                        Effect::AffectGoodwill {
                            faction: faction.id,
                            delta,
                        },
                    )
                },
            ),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::params::Parameters;
    use crate::target::{ResolvedTarget, TargetKind, resolve_target};

    #[test]
    fn test_effects_change_state() {
        let mut world = SandboxWorld::demo();

        world.apply(Effect::HealPawn(EntityId(1))).unwrap();
        assert_eq!(world.pawn(EntityId(1)).unwrap().injuries, 0);

        world.apply(Effect::RecruitPrisoner(EntityId(4))).unwrap();
        assert!(world.pawn(EntityId(4)).unwrap().colonist);

        world.apply(Effect::Repair(EntityId(21))).unwrap();
        assert_eq!(world.thing(EntityId(21)).unwrap().hit_points, 100);

        world
            .apply(Effect::AffectGoodwill {
                faction: EntityId(101),
                delta: -50,
            })
            .unwrap();
        assert_eq!(world.faction(EntityId(101)).unwrap().goodwill, -100);

        assert_eq!(world.applied().len(), 4);
    }

    #[test]
    fn test_rejections_leave_no_trace() {
        let mut world = SandboxWorld::demo();

        assert_eq!(
            world.apply(Effect::HealPawn(EntityId(3))),
            Err(HostError::Rejected("Tom is dead".to_string()))
        );
        assert_eq!(
            world.apply(Effect::DestroyThing(EntityId(999))),
            Err(HostError::NotFound(EntityId(999)))
        );
        assert!(world.apply(Effect::ChangeSeason("Monsoon".to_string())).is_err());
        assert!(world.apply(Effect::EndGameCondition("Eclipse".to_string())).is_err());
        assert!(world.applied().is_empty());
    }

    #[test]
    fn test_spawn_assigns_fresh_ids() {
        let mut world = SandboxWorld::demo();
        let before = world.count_of("Silver");

        let spawn = || Effect::SpawnThing {
            def_name: "Silver".to_string(),
            count: 250,
            at: Some(Cell::new(1, 1)),
        };
        world.apply(spawn()).unwrap();
        world.apply(spawn()).unwrap();

        assert_eq!(world.count_of("Silver"), before + 500);
        let ids: BTreeSet<_> = world.things.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), world.things.len());

        assert!(
            world
                .apply(Effect::SpawnThing {
                    def_name: "Plasteel".to_string(),
                    count: 1,
                    at: None,
                })
                .is_err()
        );
    }

    #[test]
    fn test_designate_skips_immature_and_designated() {
        let mut world = SandboxWorld::demo();
        let harvest = || Effect::Designate {
            work: WorkDesignation::Harvest,
            filter: None,
            limit: None,
            near_focus: false,
        };

        assert_eq!(world.apply(harvest()).unwrap().affected, 2);
        assert_eq!(world.thing(EntityId(32)).unwrap().designated, None);
        assert_eq!(world.apply(harvest()).unwrap().affected, 0);
    }

    #[test]
    fn test_from_yaml() {
        let world = SandboxWorld::from_yaml(
            r#"
elevated: true
pawns:
  - id: 1
    name: Ada Lindqvist
    nickname: Ada
    colonist: true
things:
  - id: 2
    label: wall
    def_name: Wall
    kind: building
    player_owned: true
incidents: [RaidEnemy]
"#,
        )
        .unwrap();

        assert!(world.elevated_mode());
        assert_eq!(world.things[0].stack_count, 1);
        assert!(matches!(
            resolve_target(&world, TargetKind::Building, "wall"),
            Some(ResolvedTarget::Building(_))
        ));
        assert!(world.incidents.contains("RaidEnemy"));
    }

    #[test]
    fn test_debug_tools() {
        let mut tools = InvokableRegistry::new();
        register_debug_tools(&mut tools);
        let mut world = SandboxWorld::demo();

        let tom = resolve_target(&world, TargetKind::DeadPawn, "Tom").unwrap();
        let text = tools
            .call(DEBUG_TOOLS_CLASS, "Resurrect", &mut world, Some(&tom), &Parameters::new())
            .unwrap();
        assert_eq!(text.as_deref(), Some("Resurrected Tom"));

        let before = world.count_of("Silver");
        tools
            .call(DEBUG_TOOLS_CLASS, "GiveSilver", &mut world, None, &Parameters::new())
            .unwrap();
        assert_eq!(world.count_of("Silver"), before + 100);

        let params = Parameters::new()
            .with("faction", ParamValue::Text("ashvale".to_string()))
            .with("delta", ParamValue::Int(15));
        tools
            .call(DEBUG_TOOLS_CLASS, "SetGoodwill", &mut world, None, &params)
            .unwrap();
        assert_eq!(world.faction(EntityId(100)).unwrap().goodwill, 25);
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::default();
        notifier.notify("one");
        notifier.notify("two");

        assert_eq!(notifier.take(), vec!["one", "two"]);
        assert!(notifier.messages().is_empty());
    }
}
