//! Interfaces to the host application commands act upon.
//!
//! Commands never touch host state directly. They read snapshots through
//! [`Host`] and request changes as [`Effect`]s, which the host applies and
//! reports back on.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a live host entity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A map coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

impl Cell {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Squared distance, enough for ordering by proximity. Saturates at
    /// `i64::MAX` for cells at opposite ends of the coordinate range.
    pub fn distance_squared(&self, other: &Cell) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx.saturating_mul(dx).saturating_add(dz.saturating_mul(dz))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// A pawn as the host enumerates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PawnInfo {
    pub id: EntityId,
    pub full_name: Option<String>,
    pub short_label: Option<String>,
    /// Free colonist of the player's faction.
    pub colonist: bool,
    pub dead: bool,
    pub prisoner: bool,
    pub animal: bool,
    pub drafted: bool,
}

impl PawnInfo {
    /// Best display label available.
    pub fn label(&self) -> &str {
        self.short_label
            .as_deref()
            .or(self.full_name.as_deref())
            .unwrap_or("")
    }
}

/// A map object as the host enumerates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThingInfo {
    pub id: EntityId,
    pub label: Option<String>,
    pub def_name: Option<String>,
    pub building: bool,
    /// Haulable item, as opposed to plants, rock or buildings.
    pub item: bool,
    pub player_owned: bool,
    pub forbidden: bool,
    pub position: Option<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneInfo {
    pub id: EntityId,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactionInfo {
    pub id: EntityId,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldObjectInfo {
    pub id: EntityId,
    pub label: String,
}

/// Kind of bulk work designation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkDesignation {
    Harvest,
    Mine,
}

impl fmt::Display for WorkDesignation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Harvest => f.write_str("harvest"),
            Self::Mine => f.write_str("mine"),
        }
    }
}

/// A state change requested from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    HealPawn(EntityId),
    KillPawn(EntityId),
    ResurrectPawn(EntityId),
    SetDrafted { pawn: EntityId, drafted: bool },
    ArrestPawn(EntityId),
    ReleasePrisoner(EntityId),
    RecruitPrisoner(EntityId),
    SpawnThing {
        def_name: String,
        count: u32,
        at: Option<Cell>,
    },
    DestroyThing(EntityId),
    SetForbidden { thing: EntityId, forbidden: bool },
    Deconstruct(EntityId),
    Repair(EntityId),
    TriggerIncident {
        incident: String,
        /// Threat points; the host picks a default when absent.
        points: Option<u32>,
    },
    EndGameCondition(String),
    ChangeWeather(String),
    ChangeSeason(String),
    AffectGoodwill { faction: EntityId, delta: i32 },
    /// Designate up to `limit` eligible, undesignated things, nearest to the
    /// host's focus point first when `near_focus` is set. `filter` narrows
    /// the candidates by name.
    Designate {
        work: WorkDesignation,
        filter: Option<String>,
        limit: Option<usize>,
        near_focus: bool,
    },
}

/// What the host reports after applying an effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectOutcome {
    pub summary: String,
    /// Number of entities changed.
    pub affected: usize,
}

impl EffectOutcome {
    pub fn new(summary: impl Into<String>) -> Self {
        Self::with_count(summary, 1)
    }

    pub fn with_count(summary: impl Into<String>, affected: usize) -> Self {
        Self {
            summary: summary.into(),
            affected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("Host does not support {0}")]
    Unsupported(String),

    #[error("Entity not found: {0}")]
    NotFound(EntityId),

    #[error("{0}")]
    Rejected(String),
}

/// The simulation commands act upon.
pub trait Host {
    /// Whether privileged commands are currently allowed.
    fn elevated_mode(&self) -> bool;

    fn pawns(&self) -> Vec<PawnInfo>;

    fn things(&self) -> Vec<ThingInfo>;

    fn zones(&self) -> Vec<ZoneInfo> {
        Vec::new()
    }

    fn factions(&self) -> Vec<FactionInfo>;

    fn world_objects(&self) -> Vec<WorldObjectInfo> {
        Vec::new()
    }

    /// Apply a state change.
    fn apply(&mut self, effect: Effect) -> Result<EffectOutcome, HostError>;
}

/// Player-facing message sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _message: &str) {}
}

/// Relationship standing that gates definition-driven commands.
pub trait ReputationGate: Send + Sync {
    /// Check that `action` may run at `min_required` standing. The error
    /// text is shown to the caller.
    fn check(&self, action: &str, min_required: f32) -> Result<(), String>;

    /// Deduct `cost` after a successful run.
    fn charge(&self, _action: &str, _cost: f32) {}
}

/// Gate that admits everything and charges nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl ReputationGate for OpenGate {
    fn check(&self, _action: &str, _min_required: f32) -> Result<(), String> {
        Ok(())
    }
}
