//! Target resolution.
//!
//! Turns the free-text target a caller supplies into a concrete host entity
//! of the declared kind. Matching is a case-insensitive substring search and
//! the first match in host enumeration order wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::{Cell, EntityId, Host, PawnInfo, ThingInfo};

/// Kind of entity a command targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    #[default]
    None,
    Pawn,
    Colonist,
    DeadPawn,
    Prisoner,
    Animal,
    Thing,
    Building,
    Cell,
    Zone,
    Faction,
    WorldObject,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pawn => "pawn",
            Self::Colonist => "colonist",
            Self::DeadPawn => "dead_pawn",
            Self::Prisoner => "prisoner",
            Self::Animal => "animal",
            Self::Thing => "thing",
            Self::Building => "building",
            Self::Cell => "cell",
            Self::Zone => "zone",
            Self::Faction => "faction",
            Self::WorldObject => "world_object",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host entity with the label it matched under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub label: String,
}

impl EntityRef {
    pub fn new(id: EntityId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// A resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Pawn(EntityRef),
    Thing(EntityRef),
    Building(EntityRef),
    Cell(Cell),
    Zone(EntityRef),
    Faction(EntityRef),
    WorldObject(EntityRef),
}

impl ResolvedTarget {
    pub fn label(&self) -> String {
        match self {
            Self::Cell(cell) => cell.to_string(),
            Self::Pawn(e)
            | Self::Thing(e)
            | Self::Building(e)
            | Self::Zone(e)
            | Self::Faction(e)
            | Self::WorldObject(e) => e.label.clone(),
        }
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            Self::Cell(_) => None,
            Self::Pawn(e)
            | Self::Thing(e)
            | Self::Building(e)
            | Self::Zone(e)
            | Self::Faction(e)
            | Self::WorldObject(e) => Some(e.id),
        }
    }

    pub fn as_pawn(&self) -> Option<&EntityRef> {
        match self {
            Self::Pawn(e) => Some(e),
            _ => None,
        }
    }

    /// Things, including buildings.
    pub fn as_thing(&self) -> Option<&EntityRef> {
        match self {
            Self::Thing(e) | Self::Building(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_building(&self) -> Option<&EntityRef> {
        match self {
            Self::Building(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<Cell> {
        match self {
            Self::Cell(cell) => Some(*cell),
            _ => None,
        }
    }

    pub fn as_faction(&self) -> Option<&EntityRef> {
        match self {
            Self::Faction(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Resolve `text` against the host's current entities.
///
/// Returns `None` for an empty target, for [`TargetKind::None`], and when
/// nothing matches.
pub fn resolve_target(host: &dyn Host, kind: TargetKind, text: &str) -> Option<ResolvedTarget> {
    let needle = text.trim();
    if needle.is_empty() {
        return None;
    }
    let needle = needle.to_lowercase();

    match kind {
        TargetKind::None => None,
        TargetKind::Pawn => find_pawn(host, &needle, |_| true),
        TargetKind::Colonist => find_pawn(host, &needle, |p| p.colonist && !p.dead && !p.prisoner),
        TargetKind::DeadPawn => find_pawn(host, &needle, |p| p.dead),
        TargetKind::Prisoner => find_pawn(host, &needle, |p| p.prisoner && !p.dead),
        TargetKind::Animal => find_pawn(host, &needle, |p| p.animal),
        TargetKind::Thing => host
            .things()
            .into_iter()
            .find(|t| thing_matches(t, &needle))
            .map(|t| {
                let entity = EntityRef::new(t.id, t.label.clone().unwrap_or_default());
                if t.building {
                    ResolvedTarget::Building(entity)
                } else {
                    ResolvedTarget::Thing(entity)
                }
            }),
        TargetKind::Building => host
            .things()
            .into_iter()
            .filter(|t| t.building && t.player_owned)
            .find(|t| thing_matches(t, &needle))
            .map(|t| ResolvedTarget::Building(EntityRef::new(t.id, t.label.unwrap_or_default()))),
        TargetKind::Cell => parse_cell(text).map(ResolvedTarget::Cell),
        TargetKind::Zone => host
            .zones()
            .into_iter()
            .find(|z| contains(&z.label, &needle))
            .map(|z| ResolvedTarget::Zone(EntityRef::new(z.id, z.label))),
        TargetKind::Faction => host
            .factions()
            .into_iter()
            .find(|f| f.name.as_deref().is_some_and(|n| contains(n, &needle)))
            .map(|f| ResolvedTarget::Faction(EntityRef::new(f.id, f.name.unwrap_or_default()))),
        TargetKind::WorldObject => host
            .world_objects()
            .into_iter()
            .find(|w| contains(&w.label, &needle))
            .map(|w| ResolvedTarget::WorldObject(EntityRef::new(w.id, w.label))),
    }
}

/// Parse an `"x,z"` cell. Both parts must be integers.
pub fn parse_cell(text: &str) -> Option<Cell> {
    let (x, z) = text.split_once(',')?;
    let x = x.trim().parse().ok()?;
    let z = z.trim().parse().ok()?;
    Some(Cell::new(x, z))
}

fn find_pawn(
    host: &dyn Host,
    needle: &str,
    filter: impl Fn(&PawnInfo) -> bool,
) -> Option<ResolvedTarget> {
    host.pawns()
        .into_iter()
        .filter(|p| filter(p))
        .find(|p| pawn_matches(p, needle))
        .map(|p| ResolvedTarget::Pawn(EntityRef::new(p.id, p.label())))
}

fn pawn_matches(pawn: &PawnInfo, needle: &str) -> bool {
    [pawn.full_name.as_deref(), pawn.short_label.as_deref()]
        .into_iter()
        .flatten()
        .any(|name| contains(name, needle))
}

fn thing_matches(thing: &ThingInfo, needle: &str) -> bool {
    [thing.label.as_deref(), thing.def_name.as_deref()]
        .into_iter()
        .flatten()
        .any(|name| contains(name, needle))
}

/// `needle` must already be lower-cased.
fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
