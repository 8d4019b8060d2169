//! World state: the canonical entity database for one match.
//!
//! Every mutation of units, encampments and mines goes through a method here
//! so that the occupancy index and encampment bookkeeping stay consistent.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{
    sensing, Balance, BroadcastBoard, GameMap, MapLocation, PerTeam, ResourcePool, Team,
    TeamMemory, Unit, UnitId, UnitType, UpgradeBook,
};

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    /// An HQ was destroyed.
    HqDestroyed,
    /// A team resigned.
    Resigned,
    /// A team completed the Nuke.
    Nuke,
    /// The round limit was reached and the tiebreak decided.
    RoundLimit,
}

/// The decided result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    /// The winning team.
    pub winner: Team,
    /// How the match was decided.
    pub reason: EndReason,
}

/// Ownership state of an encampment cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncampmentState {
    /// Nobody owns or is capturing it.
    Unclaimed,
    /// A soldier is converting it.
    Capturing {
        /// Capturing team.
        team: Team,
        /// Capturing soldier.
        unit: UnitId,
        /// Encampment type to build.
        kind: UnitType,
        /// Rounds left.
        remaining: u32,
    },
    /// An encampment unit stands on it.
    Captured {
        /// Owning team.
        team: Team,
        /// The encampment unit.
        unit: UnitId,
    },
}

/// What a pending mine work does on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MineWorkKind {
    /// Lay a mine on the origin cell.
    Lay,
    /// Remove the mine at the target.
    Defuse {
        /// Cell to clear.
        target: MapLocation,
    },
}

/// A lay or defuse in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MineWork {
    /// Working unit.
    pub unit: UnitId,
    /// Working unit's team.
    pub team: Team,
    /// Where the unit stood when it started.
    pub origin: MapLocation,
    /// Lay or defuse.
    pub kind: MineWorkKind,
    /// Rounds left.
    pub remaining: u32,
}

/// Error building a world from a map description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SetupError {
    /// A feature sits off the map or on void.
    #[error("{feature} at {location} is not on passable ground")]
    Blocked {
        /// Which feature.
        feature: &'static str,
        /// Where.
        location: MapLocation,
    },
    /// Two features share a cell that must be exclusive.
    #[error("{feature} at {location} overlaps another feature")]
    Overlap {
        /// Which feature.
        feature: &'static str,
        /// Where.
        location: MapLocation,
    },
}

/// Everything a map contributes to a fresh world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSetup {
    /// Terrain.
    pub map: GameMap,
    /// Team A's HQ.
    pub hq_a: MapLocation,
    /// Team B's HQ.
    pub hq_b: MapLocation,
    /// Capturable cells.
    pub encampments: Vec<MapLocation>,
    /// Mines placed by the map.
    pub neutral_mines: Vec<MapLocation>,
}

impl MapSetup {
    /// Check that every feature lies on passable ground and HQs are exclusive.
    ///
    /// # Errors
    ///
    /// Returns the first offending feature.
    pub fn validate(&self) -> Result<(), SetupError> {
        let passable = |feature, location| {
            if self.map.is_passable(location) {
                Ok(())
            } else {
                Err(SetupError::Blocked { feature, location })
            }
        };
        passable("HQ", self.hq_a)?;
        passable("HQ", self.hq_b)?;
        if self.hq_a == self.hq_b {
            return Err(SetupError::Overlap {
                feature: "HQ",
                location: self.hq_b,
            });
        }
        for &loc in &self.encampments {
            passable("encampment", loc)?;
            if loc == self.hq_a || loc == self.hq_b {
                return Err(SetupError::Overlap {
                    feature: "encampment",
                    location: loc,
                });
            }
        }
        for &loc in &self.neutral_mines {
            passable("mine", loc)?;
        }
        Ok(())
    }
}

/// Canonical state of one match.
#[derive(Debug, Clone)]
pub struct WorldState {
    map: GameMap,
    balance: Balance,
    seed: u64,
    round: u32,
    next_id: UnitId,
    units: BTreeMap<UnitId, Unit>,
    occupancy: HashMap<MapLocation, UnitId>,
    hq_locations: [MapLocation; 2],
    encampments: BTreeMap<MapLocation, EncampmentState>,
    mines: BTreeMap<MapLocation, Team>,
    known_mines: PerTeam<BTreeSet<MapLocation>>,
    mine_works: Vec<MineWork>,
    pools: PerTeam<ResourcePool>,
    upgrades: PerTeam<UpgradeBook>,
    board: BroadcastBoard,
    memory: PerTeam<TeamMemory>,
    outcome: Option<MatchOutcome>,
}

impl WorldState {
    /// Build a world with both HQs placed and everything else empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the setup places features on blocked cells.
    pub fn new(setup: MapSetup, balance: Balance, seed: u64) -> Result<Self, SetupError> {
        setup.validate()?;
        let memory_length = balance.team_memory_length;
        let mut world = Self {
            map: setup.map,
            balance,
            seed,
            round: 0,
            next_id: 1,
            units: BTreeMap::new(),
            occupancy: HashMap::new(),
            hq_locations: [setup.hq_a, setup.hq_b],
            encampments: setup
                .encampments
                .iter()
                .map(|&loc| (loc, EncampmentState::Unclaimed))
                .collect(),
            mines: setup
                .neutral_mines
                .iter()
                .map(|&loc| (loc, Team::Neutral))
                .collect(),
            known_mines: PerTeam::default(),
            mine_works: Vec::new(),
            pools: PerTeam::default(),
            upgrades: PerTeam::default(),
            board: BroadcastBoard::default(),
            memory: PerTeam::from_fn(|_| TeamMemory::from_snapshot(memory_length, None)),
            outcome: None,
        };
        for team in Team::PLAYERS {
            let loc = world.hq_locations[player_index(team)];
            if world.add_unit(team, UnitType::Hq, loc).is_none() {
                return Err(SetupError::Overlap {
                    feature: "HQ",
                    location: loc,
                });
            }
        }
        Ok(world)
    }

    /// Load a team's memory snapshot from the previous match.
    pub fn install_memory(&mut self, team: Team, snapshot: Option<Vec<i64>>) {
        self.memory[team] = TeamMemory::from_snapshot(self.balance.team_memory_length, snapshot);
    }

    /// Terrain.
    #[must_use]
    pub const fn map(&self) -> &GameMap {
        &self.map
    }

    /// Numeric constants.
    #[must_use]
    pub const fn balance(&self) -> &Balance {
        &self.balance
    }

    /// Match seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Current round, starting at 0.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Start the next round.
    pub fn advance_round(&mut self) {
        self.round += 1;
    }

    /// How the match ended, once decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Record the winner. The first decision stands.
    pub fn declare_winner(&mut self, winner: Team, reason: EndReason) {
        if self.outcome.is_none() {
            tracing::info!(round = self.round, %winner, ?reason, "match decided");
            self.outcome = Some(MatchOutcome { winner, reason });
        }
    }

    /// Whether the match is over.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    // ---- units ----

    /// Place a new unit at full energon. Returns `None` if the cell is blocked
    /// or taken.
    pub fn add_unit(&mut self, team: Team, unit_type: UnitType, location: MapLocation) -> Option<UnitId> {
        if team == Team::Neutral || !self.is_free(location) {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        let energon = self.balance.stats(unit_type).max_energon;
        let mut unit = Unit::new(id, team, unit_type, location, energon, self.round);
        unit.observe(self.map.locations_within(location, self.sensor_radius_squared(team, unit_type)));
        self.occupancy.insert(location, id);
        self.units.insert(id, unit);
        Some(id)
    }

    /// Remove a unit and release whatever it held.
    ///
    /// Freed encampments revert to unclaimed. Removing an HQ decides the match
    /// for the opponent unless it is already decided.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        if self.occupancy.get(&unit.location) == Some(&id) {
            self.occupancy.remove(&unit.location);
        }
        for state in self.encampments.values_mut() {
            let held = match *state {
                EncampmentState::Capturing { unit, .. } | EncampmentState::Captured { unit, .. } => {
                    unit == id
                }
                EncampmentState::Unclaimed => false,
            };
            if held {
                *state = EncampmentState::Unclaimed;
            }
        }
        self.mine_works.retain(|work| work.unit != id);
        if unit.unit_type == UnitType::Hq {
            self.declare_winner(unit.team.opponent(), EndReason::HqDestroyed);
        }
        Some(unit)
    }

    /// Move a unit to a free passable cell. Returns `false` and changes
    /// nothing otherwise.
    pub fn move_unit(&mut self, id: UnitId, to: MapLocation) -> bool {
        if !self.is_free(to) {
            return false;
        }
        let radius = match self.units.get(&id) {
            Some(unit) => self.sensor_radius_squared(unit.team, unit.unit_type),
            None => return false,
        };
        let seen: Vec<MapLocation> = self.map.locations_within(to, radius).collect();
        let Some(unit) = self.units.get_mut(&id) else {
            return false;
        };
        self.occupancy.remove(&unit.location);
        self.occupancy.insert(to, id);
        unit.location = to;
        unit.observe(seen);
        true
    }

    /// Look up a live unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Mutable access to a live unit.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// All live units in ascending id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Mutable iteration over live units in ascending id order.
    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }

    /// Ids of all live units, ascending.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// The unit standing on a cell.
    #[must_use]
    pub fn unit_at(&self, loc: MapLocation) -> Option<&Unit> {
        self.occupancy.get(&loc).and_then(|id| self.units.get(id))
    }

    /// Whether a cell is on the map, passable and unoccupied.
    #[must_use]
    pub fn is_free(&self, loc: MapLocation) -> bool {
        self.map.is_passable(loc) && !self.occupancy.contains_key(&loc)
    }

    /// A team's live HQ.
    #[must_use]
    pub fn hq(&self, team: Team) -> Option<&Unit> {
        self.units
            .values()
            .find(|u| u.team == team && u.unit_type == UnitType::Hq)
    }

    /// Where a team's HQ was placed. `None` for the neutral team.
    #[must_use]
    pub fn hq_location(&self, team: Team) -> Option<MapLocation> {
        match team {
            Team::A | Team::B => Some(self.hq_locations[player_index(team)]),
            Team::Neutral => None,
        }
    }

    /// Live units of a team and type.
    #[must_use]
    pub fn count_units(&self, team: Team, unit_type: UnitType) -> usize {
        self.units
            .values()
            .filter(|u| u.team == team && u.unit_type == unit_type)
            .count()
    }

    /// Sensor radius² of a unit type for a team, including the Vision bonus.
    #[must_use]
    pub fn sensor_radius_squared(&self, team: Team, unit_type: UnitType) -> i32 {
        sensing::sensor_radius_squared(&self.balance, &self.upgrades[team], unit_type)
    }

    // ---- encampments ----

    /// State of the encampment on a cell, `None` if the cell is not one.
    #[must_use]
    pub fn encampment(&self, loc: MapLocation) -> Option<EncampmentState> {
        self.encampments.get(&loc).copied()
    }

    /// Every encampment cell and its state.
    pub fn encampments(&self) -> impl Iterator<Item = (MapLocation, EncampmentState)> + '_ {
        self.encampments.iter().map(|(&loc, &state)| (loc, state))
    }

    /// Replace an encampment's state. Ignored for non-encampment cells.
    pub fn set_encampment(&mut self, loc: MapLocation, state: EncampmentState) {
        if let Some(slot) = self.encampments.get_mut(&loc) {
            *slot = state;
        }
    }

    /// Encampments a team owns.
    #[must_use]
    pub fn owned_encampments(&self, team: Team) -> usize {
        self.encampments
            .values()
            .filter(|s| matches!(s, EncampmentState::Captured { team: t, .. } if *t == team))
            .count()
    }

    /// Captures a team has under way.
    #[must_use]
    pub fn captures_in_progress(&self, team: Team) -> usize {
        self.encampments
            .values()
            .filter(|s| matches!(s, EncampmentState::Capturing { team: t, .. } if *t == team))
            .count()
    }

    // ---- mines ----

    /// Owner of the mine on a cell.
    #[must_use]
    pub fn mine_at(&self, loc: MapLocation) -> Option<Team> {
        self.mines.get(&loc).copied()
    }

    /// Every mine and its owner.
    pub fn mines(&self) -> impl Iterator<Item = (MapLocation, Team)> + '_ {
        self.mines.iter().map(|(&loc, &team)| (loc, team))
    }

    /// Place a mine. An existing mine is left alone; returns whether one was laid.
    pub fn lay_mine(&mut self, loc: MapLocation, team: Team) -> bool {
        if !self.map.is_passable(loc) || self.mines.contains_key(&loc) {
            return false;
        }
        self.mines.insert(loc, team);
        true
    }

    /// Remove a mine from the world and from every team's knowledge.
    pub fn clear_mine(&mut self, loc: MapLocation) -> Option<Team> {
        let owner = self.mines.remove(&loc)?;
        for team in Team::PLAYERS {
            self.known_mines[team].remove(&loc);
        }
        Some(owner)
    }

    /// Enemy mine locations a team has revealed.
    #[must_use]
    pub fn known_mines(&self, team: Team) -> &BTreeSet<MapLocation> {
        &self.known_mines[team]
    }

    /// Reveal an enemy mine to a team. Own and missing mines are ignored.
    pub fn reveal_mine(&mut self, team: Team, loc: MapLocation) {
        if self.mines.get(&loc).is_some_and(|&owner| owner == team.opponent()) {
            self.known_mines[team].insert(loc);
        }
    }

    /// Pending lay and defuse works.
    #[must_use]
    pub fn mine_works(&self) -> &[MineWork] {
        &self.mine_works
    }

    /// Start a mine work.
    pub fn push_mine_work(&mut self, work: MineWork) {
        self.mine_works.push(work);
    }

    /// Take every pending mine work, leaving none.
    pub fn take_mine_works(&mut self) -> Vec<MineWork> {
        std::mem::take(&mut self.mine_works)
    }

    // ---- team resources ----

    /// A team's power pool.
    #[must_use]
    pub fn pool(&self, team: Team) -> &ResourcePool {
        &self.pools[team]
    }

    /// Mutable access to a team's power pool.
    pub fn pool_mut(&mut self, team: Team) -> &mut ResourcePool {
        &mut self.pools[team]
    }

    /// A team's research.
    #[must_use]
    pub fn upgrades(&self, team: Team) -> &UpgradeBook {
        &self.upgrades[team]
    }

    /// Mutable access to a team's research.
    pub fn upgrades_mut(&mut self, team: Team) -> &mut UpgradeBook {
        &mut self.upgrades[team]
    }

    /// The radio board.
    #[must_use]
    pub const fn board(&self) -> &BroadcastBoard {
        &self.board
    }

    /// Mutable radio board.
    pub fn board_mut(&mut self) -> &mut BroadcastBoard {
        &mut self.board
    }

    /// A team's memory.
    #[must_use]
    pub fn memory(&self, team: Team) -> &TeamMemory {
        &self.memory[team]
    }

    /// Mutable team memory.
    pub fn memory_mut(&mut self, team: Team) -> &mut TeamMemory {
        &mut self.memory[team]
    }

    /// Decide a drawn position: HQ energon, then encampments, then power,
    /// then a coin flip derived from the match seed.
    #[must_use]
    pub fn tiebreak_winner(&self) -> Team {
        let hq_energon = |team| self.hq(team).map_or(0.0, |hq| hq.energon);
        let keys = Team::PLAYERS.map(|team| {
            (
                hq_energon(team),
                self.owned_encampments(team),
                self.pools[team].power(),
            )
        });
        let [a, b] = keys;
        let order = a
            .0
            .total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.total_cmp(&b.2));
        match order {
            Ordering::Greater => return Team::A,
            Ordering::Less => return Team::B,
            Ordering::Equal => {}
        }
        if mix(self.seed) & 1 == 0 { Team::A } else { Team::B }
    }
}

const fn player_index(team: Team) -> usize {
    match team {
        Team::B => 1,
        Team::A | Team::Neutral => 0,
    }
}

/// Deterministic seed scrambler for the coin flip.
fn mix(seed: u64) -> u64 {
    let mut x = seed;
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}
