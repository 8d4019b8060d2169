//! Teams, unit types and per-unit state.

use std::collections::HashSet;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::game::{ActionClass, ActivityState, MapLocation};

/// Unique identifier for a unit. Assigned in ascending order.
pub type UnitId = u32;

/// Team affiliation.
///
/// `Neutral` never owns units; it only owns map-placed mines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// First player.
    A,
    /// Second player.
    B,
    /// Map-owned objects.
    Neutral,
}

impl Team {
    /// The two playing teams.
    pub const PLAYERS: [Team; 2] = [Team::A, Team::B];

    /// The opposing team. Neutral is its own opponent.
    #[must_use]
    pub const fn opponent(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
            Team::Neutral => Team::Neutral,
        }
    }

    const fn slot(self) -> usize {
        match self {
            Team::A => 0,
            Team::B => 1,
            Team::Neutral => 2,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Team::A => "A",
            Team::B => "B",
            Team::Neutral => "neutral",
        };
        f.write_str(name)
    }
}

/// One value per team, including the neutral slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerTeam<T> {
    slots: [T; 3],
}

impl<T> PerTeam<T> {
    /// Build each slot from its team.
    pub fn from_fn(mut f: impl FnMut(Team) -> T) -> Self {
        Self {
            slots: [f(Team::A), f(Team::B), f(Team::Neutral)],
        }
    }
}

impl<T> Index<Team> for PerTeam<T> {
    type Output = T;

    fn index(&self, team: Team) -> &T {
        &self.slots[team.slot()]
    }
}

impl<T> IndexMut<Team> for PerTeam<T> {
    fn index_mut(&mut self, team: Team) -> &mut T {
        &mut self.slots[team.slot()]
    }
}

/// What a unit type is allowed to do.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// May issue `move_to`.
    pub can_move: bool,
    /// May issue `spawn`.
    pub can_spawn: bool,
    /// May issue `research_upgrade`.
    pub can_research: bool,
    /// May issue `capture_encampment`.
    pub can_capture: bool,
    /// May lay, defuse and scan for mines.
    pub can_lay_mines: bool,
    /// May issue `attack_square`.
    pub can_attack_square: bool,
    /// May write team memory.
    pub can_write_memory: bool,
    /// Occupies an encampment cell once built.
    pub is_encampment: bool,
}

impl Capabilities {
    const NONE: Capabilities = Capabilities {
        can_move: false,
        can_spawn: false,
        can_research: false,
        can_capture: false,
        can_lay_mines: false,
        can_attack_square: false,
        can_write_memory: false,
        is_encampment: false,
    };
}

/// The closed set of unit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    /// Headquarters: spawns soldiers and researches upgrades.
    Hq,
    /// Mobile unit: moves, captures encampments, works mines, fights in melee.
    Soldier,
    /// Encampment that bombards a target square.
    Artillery,
    /// Encampment that adds team income.
    Generator,
    /// Encampment that shortens spawn delay.
    Supplier,
    /// Encampment that heals nearby allies.
    Medbay,
    /// Encampment that grants nearby allies shields.
    Shields,
}

impl UnitType {
    /// Every unit type.
    pub const ALL: [UnitType; 7] = [
        UnitType::Hq,
        UnitType::Soldier,
        UnitType::Artillery,
        UnitType::Generator,
        UnitType::Supplier,
        UnitType::Medbay,
        UnitType::Shields,
    ];

    /// Capability flags for this type.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            UnitType::Hq => Capabilities {
                can_spawn: true,
                can_research: true,
                can_write_memory: true,
                ..Capabilities::NONE
            },
            UnitType::Soldier => Capabilities {
                can_move: true,
                can_capture: true,
                can_lay_mines: true,
                can_write_memory: true,
                ..Capabilities::NONE
            },
            UnitType::Artillery => Capabilities {
                can_attack_square: true,
                is_encampment: true,
                ..Capabilities::NONE
            },
            UnitType::Generator | UnitType::Supplier | UnitType::Medbay | UnitType::Shields => {
                Capabilities {
                    is_encampment: true,
                    ..Capabilities::NONE
                }
            }
        }
    }

    /// Whether this type is built by capturing an encampment.
    #[must_use]
    pub const fn is_encampment(self) -> bool {
        self.capabilities().is_encampment
    }
}

/// A live unit, owned by the world.
#[derive(Debug, Clone)]
pub struct Unit {
    /// Identifier.
    pub id: UnitId,
    /// Owning team (never neutral).
    pub team: Team,
    /// Type.
    pub unit_type: UnitType,
    /// Current cell.
    pub location: MapLocation,
    /// Health; the unit dies at zero.
    pub energon: f64,
    /// Absorbs damage before energon.
    pub shields: f64,
    /// Cooldown counters.
    pub activity: ActivityState,
    /// Whether the unit broadcast this round.
    pub broadcasted: bool,
    /// Round the unit entered the world.
    pub spawned_round: u32,
    /// Cells whose terrain this unit has observed.
    observed: HashSet<MapLocation>,
}

impl Unit {
    /// Create a fresh unit with full energon and idle counters.
    #[must_use]
    pub fn new(
        id: UnitId,
        team: Team,
        unit_type: UnitType,
        location: MapLocation,
        energon: f64,
        spawned_round: u32,
    ) -> Self {
        Self {
            id,
            team,
            unit_type,
            location,
            energon,
            shields: 0.0,
            activity: ActivityState::default(),
            broadcasted: false,
            spawned_round,
            observed: HashSet::new(),
        }
    }

    /// Record that the unit has seen these cells.
    pub fn observe(&mut self, cells: impl IntoIterator<Item = MapLocation>) {
        self.observed.extend(cells);
    }

    /// Whether the unit has ever observed a cell.
    #[must_use]
    pub fn has_observed(&self, loc: MapLocation) -> bool {
        self.observed.contains(&loc)
    }

    /// Apply damage, draining shields first. Returns the energon lost.
    pub fn take_damage(&mut self, amount: f64) -> f64 {
        if amount <= 0.0 {
            return 0.0;
        }
        let absorbed = amount.min(self.shields);
        self.shields -= absorbed;
        let through = amount - absorbed;
        self.energon -= through;
        through
    }

    /// Whether accumulated damage has killed the unit.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.energon <= 0.0
    }

    /// Snapshot of what another unit may learn by sensing this one.
    #[must_use]
    pub fn info(&self) -> UnitInfo {
        UnitInfo {
            id: self.id,
            team: self.team,
            unit_type: self.unit_type,
            location: self.location,
            energon: self.energon,
            shields: self.shields,
            rounds_until_movement_idle: self.activity.remaining(ActionClass::Movement),
            rounds_until_attack_idle: self.activity.remaining(ActionClass::Attack),
        }
    }
}

/// Sensed view of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnitInfo {
    /// Identifier.
    pub id: UnitId,
    /// Owning team.
    pub team: Team,
    /// Type.
    pub unit_type: UnitType,
    /// Location at sensing time.
    pub location: MapLocation,
    /// Current energon.
    pub energon: f64,
    /// Current shields.
    pub shields: f64,
    /// Movement cooldown remaining.
    pub rounds_until_movement_idle: u32,
    /// Attack cooldown remaining.
    pub rounds_until_attack_idle: u32,
}
