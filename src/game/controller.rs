//! The action gateway handed to a unit's program each turn.
//!
//! Every mutating verb follows the same contract:
//!
//! 1. check the unit's capability, the class counter, the team's power and the
//!    target, failing with a [`GameActionError`] and changing nothing
//! 2. debit the cost
//! 3. set the class counter and push a [`Signal`]
//!
//! Spatial and ownership changes happen only when the round resolves.
//! Queries are read-only and respect team vision.

use crate::error::{ActionResult, ErrorKind, GameActionError};
use crate::game::economy::{capture_cost, spawn_delay, unused_compute_reward};
use crate::game::{
    sensing, ActionClass, Direction, EncampmentState, EndReason, MapLocation, MineOp,
    SenseFilter, Signal, SignalQueue, Team, Terrain, Unit, UnitId, UnitInfo, UnitType, Upgrade,
    WorldState,
};

/// Per-unit facade over the world for one turn.
pub struct RobotController<'a> {
    world: &'a mut WorldState,
    queue: &'a mut SignalQueue,
    unit: UnitId,
    team: Team,
    unit_type: UnitType,
    ended: bool,
}

impl std::fmt::Debug for RobotController<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotController")
            .field("unit", &self.unit)
            .field("team", &self.team)
            .field("unit_type", &self.unit_type)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

fn error(kind: ErrorKind, reason: impl Into<String>) -> GameActionError {
    GameActionError::new(kind, reason)
}

impl<'a> RobotController<'a> {
    /// Bind a controller to a live unit. Returns `None` if the unit is gone.
    pub fn new(world: &'a mut WorldState, queue: &'a mut SignalQueue, unit: UnitId) -> Option<Self> {
        let (team, unit_type) = world.unit(unit).map(|u| (u.team, u.unit_type))?;
        Some(Self {
            world,
            queue,
            unit,
            team,
            unit_type,
            ended: false,
        })
    }

    /// Whether the unit resigned or self-destructed this turn.
    #[must_use]
    pub const fn turn_ended(&self) -> bool {
        self.ended
    }

    fn me(&self) -> ActionResult<&Unit> {
        self.world
            .unit(self.unit)
            .ok_or_else(|| error(ErrorKind::InvalidTarget, "unit no longer exists"))
    }

    fn me_mut(&mut self) -> ActionResult<&mut Unit> {
        self.world
            .unit_mut(self.unit)
            .ok_or_else(|| error(ErrorKind::InvalidTarget, "unit no longer exists"))
    }

    fn require(&self, allowed: bool, verb: &str) -> ActionResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(error(
                ErrorKind::InvalidActionForType,
                format!("{:?} cannot {verb}", self.unit_type),
            ))
        }
    }

    fn ensure_idle(&self, class: ActionClass) -> ActionResult<()> {
        self.me()?.activity.ensure_idle(class)
    }

    fn activate(&mut self, class: ActionClass, delay: u32) -> ActionResult<()> {
        self.me_mut()?.activity.activate(class, delay);
        Ok(())
    }

    fn checked<T>(
        &mut self,
        verb: &'static str,
        action: impl FnOnce(&mut Self) -> ActionResult<T>,
    ) -> ActionResult<T> {
        let result = action(self);
        if let Err(err) = &result {
            tracing::debug!(unit = self.unit, team = %self.team, verb, %err, "action rejected");
        }
        result
    }

    // ---- identity ----

    /// This unit's id.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.unit
    }

    /// This unit's team.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// This unit's type.
    #[must_use]
    pub const fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    /// Current location, `None` after suicide.
    #[must_use]
    pub fn location(&self) -> Option<MapLocation> {
        self.me().ok().map(|u| u.location)
    }

    /// Current energon.
    #[must_use]
    pub fn energon(&self) -> f64 {
        self.me().map_or(0.0, |u| u.energon)
    }

    /// Current shields.
    #[must_use]
    pub fn shields(&self) -> f64 {
        self.me().map_or(0.0, |u| u.shields)
    }

    /// Current round.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.world.round()
    }

    /// Team power.
    #[must_use]
    pub fn team_power(&self) -> f64 {
        self.world.pool(self.team).power()
    }

    /// Instructions allowed per turn.
    #[must_use]
    pub fn bytecode_limit(&self) -> u32 {
        self.world.balance().bytecode_limit
    }

    /// Map width.
    #[must_use]
    pub fn map_width(&self) -> i32 {
        self.world.map().width()
    }

    /// Map height.
    #[must_use]
    pub fn map_height(&self) -> i32 {
        self.world.map().height()
    }

    /// Rounds until both movement and attack are idle.
    #[must_use]
    pub fn rounds_until_active(&self) -> u32 {
        self.me().map_or(0, |u| u.activity.rounds_until_active())
    }

    /// Rounds until the given class accepts an action.
    #[must_use]
    pub fn rounds_until_idle(&self, class: ActionClass) -> u32 {
        self.me().map_or(0, |u| u.activity.remaining(class))
    }

    /// Whether the class accepts an action now.
    #[must_use]
    pub fn is_idle(&self, class: ActionClass) -> bool {
        self.rounds_until_idle(class) == 0
    }

    /// Whether the team has an upgrade.
    #[must_use]
    pub fn has_upgrade(&self, upgrade: Upgrade) -> bool {
        self.world.upgrades(self.team).has(upgrade)
    }

    /// Whether this unit broadcast this round.
    #[must_use]
    pub fn has_broadcasted(&self) -> bool {
        self.me().is_ok_and(|u| u.broadcasted)
    }

    // ---- movement and production ----

    /// Whether `move_to(dir)` would pass its target checks.
    #[must_use]
    pub fn can_move(&self, dir: Direction) -> bool {
        self.unit_type.capabilities().can_move
            && dir.is_compass()
            && self
                .me()
                .is_ok_and(|u| self.world.is_free(u.location.add(dir)))
    }

    /// Step one cell.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType`, `AlreadyActive`, `InvalidTarget` for a
    /// non-compass direction, or `DestinationOccupiedOrBlocked`.
    pub fn move_to(&mut self, dir: Direction) -> ActionResult<()> {
        self.checked("move_to", |rc| {
            rc.require(rc.unit_type.capabilities().can_move, "move")?;
            rc.ensure_idle(ActionClass::Movement)?;
            if !dir.is_compass() {
                return Err(error(ErrorKind::InvalidTarget, format!("cannot move {dir:?}")));
            }
            let from = rc.me()?.location;
            let to = from.add(dir);
            if !rc.world.is_free(to) {
                return Err(error(
                    ErrorKind::DestinationOccupiedOrBlocked,
                    format!("{to} is blocked or occupied"),
                ));
            }
            let stats = rc.world.balance().stats(rc.unit_type);
            let delay = if dir.is_diagonal() {
                stats.move_delay_diagonal
            } else {
                stats.move_delay_orthogonal
            };
            rc.activate(ActionClass::Movement, delay)?;
            rc.queue.push(Signal::Movement {
                unit: rc.unit,
                from,
                to,
            });
            Ok(())
        })
    }

    /// Produce a soldier on an adjacent cell.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType`, `AlreadyActive`, `InvalidTarget`,
    /// `DestinationOccupiedOrBlocked` or `InsufficientResource`.
    pub fn spawn(&mut self, dir: Direction) -> ActionResult<()> {
        self.checked("spawn", |rc| {
            rc.require(rc.unit_type.capabilities().can_spawn, "spawn")?;
            rc.ensure_idle(ActionClass::Movement)?;
            if !dir.is_compass() {
                return Err(error(ErrorKind::InvalidTarget, format!("cannot spawn {dir:?}")));
            }
            let location = rc.me()?.location.add(dir);
            if !rc.world.is_free(location) {
                return Err(error(
                    ErrorKind::DestinationOccupiedOrBlocked,
                    format!("{location} is blocked or occupied"),
                ));
            }
            let balance = rc.world.balance();
            let cost = balance.stats(UnitType::Soldier).spawn_cost;
            let suppliers = rc.world.count_units(rc.team, UnitType::Supplier);
            let delay = spawn_delay(balance, suppliers);
            rc.world.pool_mut(rc.team).try_debit(cost)?;
            rc.activate(ActionClass::Movement, delay)?;
            rc.queue.push(Signal::Spawn {
                parent: rc.unit,
                team: rc.team,
                unit_type: UnitType::Soldier,
                location,
            });
            Ok(())
        })
    }

    // ---- encampments ----

    /// What the next capture would cost this team right now.
    #[must_use]
    pub fn sense_capture_cost(&self) -> f64 {
        let in_progress =
            self.world.captures_in_progress(self.team) + self.queue.queued_captures(self.team);
        capture_cost(
            self.world.balance(),
            in_progress,
            self.world.owned_encampments(self.team),
        )
    }

    /// Start converting the encampment under this soldier into `kind`.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType`, `InvalidTarget` (not an encampment type, not on
    /// an unclaimed encampment, or contested), `AlreadyActive` or
    /// `InsufficientResource`.
    pub fn capture_encampment(&mut self, kind: UnitType) -> ActionResult<()> {
        self.checked("capture_encampment", |rc| {
            rc.require(rc.unit_type.capabilities().can_capture, "capture")?;
            if !kind.is_encampment() {
                return Err(error(
                    ErrorKind::InvalidTarget,
                    format!("{kind:?} is not an encampment type"),
                ));
            }
            rc.ensure_idle(ActionClass::Capture)?;
            let location = rc.me()?.location;
            match rc.world.encampment(location) {
                Some(EncampmentState::Unclaimed) => {}
                Some(_) => {
                    return Err(error(
                        ErrorKind::InvalidTarget,
                        format!("encampment at {location} is already claimed"),
                    ));
                }
                None => {
                    return Err(error(
                        ErrorKind::InvalidTarget,
                        format!("{location} is not an encampment"),
                    ));
                }
            }
            if rc.queue.capture_queued_at(location) {
                return Err(error(
                    ErrorKind::InvalidTarget,
                    format!("encampment at {location} is contested"),
                ));
            }
            let cost = rc.sense_capture_cost();
            rc.world.pool_mut(rc.team).try_debit(cost)?;
            let delay = rc.world.balance().capture_delay;
            rc.activate(ActionClass::Capture, delay)?;
            rc.queue.push(Signal::Capture {
                unit: rc.unit,
                team: rc.team,
                location,
                kind,
            });
            Ok(())
        })
    }

    // ---- research ----

    /// Spend one round researching `upgrade`.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType`, `AlreadyActive`, `InvalidTarget` if already
    /// unlocked, or `InsufficientResource`.
    pub fn research_upgrade(&mut self, upgrade: Upgrade) -> ActionResult<()> {
        self.checked("research_upgrade", |rc| {
            rc.require(rc.unit_type.capabilities().can_research, "research")?;
            rc.ensure_idle(ActionClass::Movement)?;
            if rc.has_upgrade(upgrade) {
                return Err(error(
                    ErrorKind::InvalidTarget,
                    format!("{upgrade:?} is already researched"),
                ));
            }
            let cost = rc.world.balance().research_cost;
            rc.world.pool_mut(rc.team).try_debit(cost)?;
            rc.activate(ActionClass::Movement, 1)?;
            rc.queue.push(Signal::Research {
                team: rc.team,
                upgrade,
            });
            Ok(())
        })
    }

    /// Rounds of research the team has invested in `upgrade`.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType` unless this unit can research.
    pub fn check_research_progress(&self, upgrade: Upgrade) -> ActionResult<u32> {
        self.require(self.unit_type.capabilities().can_research, "check research")?;
        Ok(self.world.upgrades(self.team).progress(upgrade))
    }

    /// Rounds of Nuke research the enemy has invested.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType` unless this unit is an HQ.
    pub fn sense_enemy_nuke_progress(&self) -> ActionResult<u32> {
        self.require(self.unit_type == UnitType::Hq, "sense nuke progress")?;
        Ok(self
            .world
            .upgrades(self.team.opponent())
            .progress(Upgrade::Nuke))
    }

    // ---- mines ----

    /// Start laying a mine on this cell.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType`, `AlreadyActive` or `InvalidTarget` if the cell
    /// already holds a mine.
    pub fn lay_mine(&mut self) -> ActionResult<()> {
        self.checked("lay_mine", |rc| {
            rc.require(rc.unit_type.capabilities().can_lay_mines, "lay mines")?;
            rc.ensure_idle(ActionClass::Mine)?;
            let origin = rc.me()?.location;
            if rc.world.mine_at(origin).is_some() {
                return Err(error(
                    ErrorKind::InvalidTarget,
                    format!("{origin} already holds a mine"),
                ));
            }
            let delay = rc.world.balance().mine_lay_delay;
            rc.activate(ActionClass::Mine, delay)?;
            rc.queue.push(Signal::Mine {
                unit: rc.unit,
                team: rc.team,
                origin,
                op: MineOp::Lay,
            });
            Ok(())
        })
    }

    /// Start removing the mine at `target`.
    ///
    /// Reach is the base defuse radius, or the full sensor radius with Defusion.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType`, `AlreadyActive`, `InvalidTarget` if off the map,
    /// or `OutOfSensorRange`.
    pub fn defuse_mine(&mut self, target: MapLocation) -> ActionResult<()> {
        self.checked("defuse_mine", |rc| {
            rc.require(rc.unit_type.capabilities().can_lay_mines, "defuse mines")?;
            rc.ensure_idle(ActionClass::Mine)?;
            if !rc.world.map().in_bounds(target) {
                return Err(error(ErrorKind::InvalidTarget, format!("{target} is off the map")));
            }
            let origin = rc.me()?.location;
            let balance = rc.world.balance();
            let defusion = rc.has_upgrade(Upgrade::Defusion);
            let (reach, delay) = if defusion {
                (
                    rc.world.sensor_radius_squared(rc.team, rc.unit_type),
                    balance.mine_defuse_defusion_delay,
                )
            } else {
                (balance.base_defuse_radius_squared, balance.mine_defuse_delay)
            };
            if origin.distance_squared_to(target) > reach {
                return Err(error(
                    ErrorKind::OutOfSensorRange,
                    format!("{target} is beyond defuse reach"),
                ));
            }
            rc.activate(ActionClass::Mine, delay)?;
            rc.queue.push(Signal::Mine {
                unit: rc.unit,
                team: rc.team,
                origin,
                op: MineOp::Defuse { target, delay },
            });
            Ok(())
        })
    }

    /// Reveal enemy mines within sensor range when the round resolves.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType`, `MissingUpgrade` without the mine detector, or
    /// `InsufficientResource`.
    pub fn scan_mines(&mut self) -> ActionResult<()> {
        self.checked("scan_mines", |rc| {
            rc.require(rc.unit_type.capabilities().can_lay_mines, "scan for mines")?;
            if !rc.has_upgrade(Upgrade::MineDetector) {
                return Err(error(ErrorKind::MissingUpgrade, "scanning needs MineDetector"));
            }
            let origin = rc.me()?.location;
            let cost = rc.world.balance().scan_cost;
            rc.world.pool_mut(rc.team).try_debit(cost)?;
            rc.queue.push(Signal::Mine {
                unit: rc.unit,
                team: rc.team,
                origin,
                op: MineOp::Scan,
            });
            Ok(())
        })
    }

    // ---- combat ----

    /// Whether `attack_square(loc)` would pass its range check.
    #[must_use]
    pub fn can_attack_square(&self, loc: MapLocation) -> bool {
        self.unit_type.capabilities().can_attack_square
            && self.world.map().in_bounds(loc)
            && self.me().is_ok_and(|u| {
                u.location.distance_squared_to(loc)
                    <= self.world.balance().stats(self.unit_type).attack_radius_squared
            })
    }

    /// Bombard a cell and its neighbours when the round resolves.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType`, `AlreadyActive`, `InvalidTarget` if off the map,
    /// or `OutOfAttackRange`.
    pub fn attack_square(&mut self, target: MapLocation) -> ActionResult<()> {
        self.checked("attack_square", |rc| {
            rc.require(rc.unit_type.capabilities().can_attack_square, "attack a square")?;
            rc.ensure_idle(ActionClass::Attack)?;
            if !rc.world.map().in_bounds(target) {
                return Err(error(ErrorKind::InvalidTarget, format!("{target} is off the map")));
            }
            let stats = *rc.world.balance().stats(rc.unit_type);
            if rc.me()?.location.distance_squared_to(target) > stats.attack_radius_squared {
                return Err(error(
                    ErrorKind::OutOfAttackRange,
                    format!("{target} is out of attack range"),
                ));
            }
            rc.activate(ActionClass::Attack, stats.attack_delay)?;
            rc.queue.push(Signal::Attack {
                unit: rc.unit,
                target,
            });
            Ok(())
        })
    }

    // ---- radio ----

    fn channel(&self, channel: i64) -> ActionResult<u32> {
        if !self.world.balance().channel_in_range(channel) {
            return Err(error(
                ErrorKind::ChannelOutOfRange,
                format!(
                    "channel {channel} outside 0..{}",
                    self.world.balance().broadcast_max_channels
                ),
            ));
        }
        u32::try_from(channel)
            .map_err(|_| error(ErrorKind::ChannelOutOfRange, format!("channel {channel}")))
    }

    /// Write a channel. The value is committed when the round resolves.
    ///
    /// # Errors
    ///
    /// `ChannelOutOfRange` (checked before any charge) or `InsufficientResource`.
    pub fn broadcast(&mut self, channel: i64, value: i64) -> ActionResult<()> {
        self.checked("broadcast", |rc| {
            let channel = rc.channel(channel)?;
            rc.me()?;
            let cost = rc.world.balance().broadcast_send_cost;
            rc.world.pool_mut(rc.team).try_debit(cost)?;
            rc.me_mut()?.broadcasted = true;
            rc.queue.push(Signal::Broadcast {
                unit: rc.unit,
                channel,
                value,
            });
            Ok(())
        })
    }

    /// Read a channel.
    ///
    /// Returns this unit's own write from earlier in the round if there is one,
    /// otherwise the committed value.
    ///
    /// # Errors
    ///
    /// `ChannelOutOfRange` (checked before any charge) or `InsufficientResource`.
    pub fn read_broadcast(&mut self, channel: i64) -> ActionResult<i64> {
        self.checked("read_broadcast", |rc| {
            let channel = rc.channel(channel)?;
            rc.me()?;
            let cost = rc.world.balance().broadcast_read_cost;
            rc.world.pool_mut(rc.team).try_debit(cost)?;
            Ok(rc
                .queue
                .pending_broadcast(rc.unit, channel)
                .unwrap_or_else(|| rc.world.board().read(channel)))
        })
    }

    // ---- team memory ----

    /// Overwrite a team memory entry.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType` or `InvalidTarget` for a bad index.
    pub fn set_team_memory(&mut self, index: usize, value: i64) -> ActionResult<()> {
        self.set_team_memory_masked(index, value, -1)
    }

    /// Replace the bits of a team memory entry selected by `mask`.
    ///
    /// # Errors
    ///
    /// `InvalidActionForType` or `InvalidTarget` for a bad index.
    pub fn set_team_memory_masked(&mut self, index: usize, value: i64, mask: i64) -> ActionResult<()> {
        self.checked("set_team_memory", |rc| {
            rc.require(rc.unit_type.capabilities().can_write_memory, "write team memory")?;
            rc.me()?;
            rc.world.memory(rc.team).check_index(index)?;
            rc.queue.push(Signal::TeamMemory {
                team: rc.team,
                index,
                value,
                mask,
            });
            Ok(())
        })
    }

    /// An entry as it stood at the end of the previous match.
    ///
    /// # Errors
    ///
    /// `InvalidTarget` for a bad index.
    pub fn team_memory(&self, index: usize) -> ActionResult<i64> {
        self.world.memory(self.team).read_previous(index)
    }

    // ---- leaving ----

    /// Concede the match. Every unit of the team is removed now.
    pub fn resign(&mut self) {
        tracing::info!(team = %self.team, round = self.world.round(), "team resigned");
        self.world.declare_winner(self.team.opponent(), EndReason::Resigned);
        let doomed: Vec<UnitId> = self
            .world
            .units()
            .filter(|u| u.team == self.team)
            .map(|u| u.id)
            .collect();
        for id in doomed {
            self.world.remove_unit(id);
        }
        self.ended = true;
    }

    /// Remove this unit now. Its turn ends.
    pub fn suicide(&mut self) {
        tracing::debug!(unit = self.unit, "unit self-destructed");
        self.world.remove_unit(self.unit);
        self.ended = true;
    }

    /// Credit unused compute and end the turn. Returns the power credited.
    pub(crate) fn yield_turn(&mut self, limit: u32, consumed: u32) -> f64 {
        let reward = unused_compute_reward(self.world.balance(), limit, consumed);
        self.world.pool_mut(self.team).credit(reward);
        reward
    }

    // ---- sensing ----

    /// Whether the team can see a cell.
    #[must_use]
    pub fn can_sense_square(&self, loc: MapLocation) -> bool {
        self.me()
            .is_ok_and(|me| sensing::unit_can_sense(self.world, me, loc))
    }

    fn assert_can_sense(&self, loc: MapLocation) -> ActionResult<&Unit> {
        let me = self.me()?;
        if sensing::unit_can_sense(self.world, me, loc) {
            Ok(me)
        } else {
            Err(error(
                ErrorKind::OutOfSensorRange,
                format!("{loc} is not within sensor range"),
            ))
        }
    }

    /// The unit on a cell.
    ///
    /// # Errors
    ///
    /// `InvalidTarget` if the cell is off the map, `OutOfSensorRange` if the
    /// team cannot see it.
    pub fn sense_object_at(&self, loc: MapLocation) -> ActionResult<Option<UnitInfo>> {
        if !self.world.map().in_bounds(loc) {
            return Err(error(ErrorKind::InvalidTarget, format!("{loc} is off the map")));
        }
        self.assert_can_sense(loc)?;
        Ok(self.world.unit_at(loc).map(Unit::info))
    }

    /// Sensible units other than this one that pass the filter.
    #[must_use]
    pub fn sense_nearby_units(&self, filter: SenseFilter) -> Vec<UnitInfo> {
        match self.me() {
            Ok(me) => sensing::nearby_units(self.world, me, filter)
                .map(Unit::info)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Details of a unit by id.
    ///
    /// # Errors
    ///
    /// `InvalidTarget` if the unit is gone or unseen; the two are
    /// indistinguishable so ids leak nothing through the fog.
    pub fn sense_unit_info(&self, id: UnitId) -> ActionResult<UnitInfo> {
        let me = self.me()?;
        self.world
            .unit(id)
            .filter(|target| sensing::unit_can_sense(self.world, me, target.location))
            .map(Unit::info)
            .ok_or_else(|| error(ErrorKind::InvalidTarget, format!("no sensible unit {id}")))
    }

    /// This team's HQ location.
    #[must_use]
    pub fn sense_hq_location(&self) -> Option<MapLocation> {
        self.world.hq_location(self.team)
    }

    /// The enemy HQ location.
    #[must_use]
    pub fn sense_enemy_hq_location(&self) -> Option<MapLocation> {
        self.world.hq_location(self.team.opponent())
    }

    /// Terrain this unit remembers seeing. `None` if never observed.
    #[must_use]
    pub fn sense_terrain(&self, loc: MapLocation) -> Option<Terrain> {
        let me = self.me().ok()?;
        if me.has_observed(loc) {
            self.world.map().terrain(loc)
        } else {
            None
        }
    }

    /// Every encampment cell on the map.
    #[must_use]
    pub fn sense_all_encampments(&self) -> Vec<MapLocation> {
        self.world.encampments().map(|(loc, _)| loc).collect()
    }

    /// Encampments this team owns.
    #[must_use]
    pub fn sense_allied_encampments(&self) -> Vec<MapLocation> {
        self.world
            .encampments()
            .filter(|(_, state)| {
                matches!(state, EncampmentState::Captured { team, .. } if *team == self.team)
            })
            .map(|(loc, _)| loc)
            .collect()
    }

    /// Whether a cell is an encampment.
    #[must_use]
    pub fn sense_encampment_square(&self, loc: MapLocation) -> bool {
        self.world.encampment(loc).is_some()
    }

    /// Owner of the mine on a cell, if this team may know it.
    #[must_use]
    pub fn sense_mine(&self, loc: MapLocation) -> Option<Team> {
        let me = self.me().ok()?;
        sensing::visible_mine(self.world, me, loc)
    }

    /// Enemy mines this team has revealed.
    #[must_use]
    pub fn sense_all_enemy_mine_locations(&self) -> Vec<MapLocation> {
        self.world.known_mines(self.team).iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Balance, GameMap, MapSetup};

    fn world() -> WorldState {
        let setup = MapSetup {
            map: GameMap::new(20, 20).unwrap(),
            hq_a: MapLocation::new(2, 2),
            hq_b: MapLocation::new(17, 17),
            encampments: vec![MapLocation::new(5, 5), MapLocation::new(6, 5)],
            neutral_mines: Vec::new(),
        };
        WorldState::new(setup, Balance::default(), 3).unwrap()
    }

    fn hq(world: &WorldState, team: Team) -> UnitId {
        world.hq(team).unwrap().id
    }

    #[test]
    fn test_soldier_cannot_spawn() {
        let mut world = world();
        let soldier = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(4, 4)).unwrap();
        world.pool_mut(Team::A).credit(100.0);
        let mut queue = SignalQueue::new();
        let mut rc = RobotController::new(&mut world, &mut queue, soldier).unwrap();
        let err = rc.spawn(Direction::North).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidActionForType);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_spawn_charges_and_sets_delay() {
        let mut world = world();
        world.pool_mut(Team::A).credit(100.0);
        let hq = hq(&world, Team::A);
        let mut queue = SignalQueue::new();
        {
            let mut rc = RobotController::new(&mut world, &mut queue, hq).unwrap();
            rc.spawn(Direction::East).unwrap();
            let err = rc.spawn(Direction::South).unwrap_err();
            assert_eq!(err.kind, ErrorKind::AlreadyActive);
        }
        assert_eq!(queue.len(), 1);
        assert!((world.pool(Team::A).power() - 90.0).abs() < 1e-9);
        assert_eq!(
            world.unit(hq).unwrap().activity.remaining(ActionClass::Movement),
            spawn_delay(world.balance(), 0)
        );
    }

    #[test]
    fn test_spawn_without_power_changes_nothing() {
        let mut world = world();
        let hq = hq(&world, Team::A);
        let mut queue = SignalQueue::new();
        let mut rc = RobotController::new(&mut world, &mut queue, hq).unwrap();
        let err = rc.spawn(Direction::East).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientResource);
        assert!(rc.is_idle(ActionClass::Movement));
        drop(rc);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_move_into_occupied_cell_rejected() {
        let mut world = world();
        let soldier = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(3, 2)).unwrap();
        world.pool_mut(Team::A).credit(50.0);
        let mut queue = SignalQueue::new();
        let mut rc = RobotController::new(&mut world, &mut queue, soldier).unwrap();
        let err = rc.move_to(Direction::West).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DestinationOccupiedOrBlocked);
        assert!(rc.is_idle(ActionClass::Movement));
        assert!((rc.team_power() - 50.0).abs() < 1e-9);

        rc.move_to(Direction::NorthEast).unwrap();
        assert_eq!(
            rc.rounds_until_idle(ActionClass::Movement),
            Balance::default().soldier.move_delay_diagonal
        );
    }

    #[test]
    fn test_capture_cost_grows_with_queued_captures() {
        let mut world = world();
        world.pool_mut(Team::A).credit(100.0);
        let first = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(5, 5)).unwrap();
        let second = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(6, 5)).unwrap();
        let base = world.balance().capture_cost;
        let mut queue = SignalQueue::new();

        RobotController::new(&mut world, &mut queue, first)
            .unwrap()
            .capture_encampment(UnitType::Generator)
            .unwrap();
        assert!((world.pool(Team::A).power() - (100.0 - base)).abs() < 1e-9);

        RobotController::new(&mut world, &mut queue, second)
            .unwrap()
            .capture_encampment(UnitType::Supplier)
            .unwrap();
        assert!((world.pool(Team::A).power() - (100.0 - 3.0 * base)).abs() < 1e-9);
    }

    #[test]
    fn test_capture_rejects_non_encampment_kind_and_cell() {
        let mut world = world();
        world.pool_mut(Team::A).credit(100.0);
        let off = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(8, 8)).unwrap();
        let mut queue = SignalQueue::new();
        let mut rc = RobotController::new(&mut world, &mut queue, off).unwrap();
        assert_eq!(
            rc.capture_encampment(UnitType::Soldier).unwrap_err().kind,
            ErrorKind::InvalidTarget
        );
        assert_eq!(
            rc.capture_encampment(UnitType::Medbay).unwrap_err().kind,
            ErrorKind::InvalidTarget
        );
        assert!((rc.team_power() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_broadcast_channel_checked_before_charge() {
        let mut world = world();
        let hq = hq(&world, Team::A);
        let mut queue = SignalQueue::new();
        let mut rc = RobotController::new(&mut world, &mut queue, hq).unwrap();
        // No power at all: range is still reported first.
        assert_eq!(
            rc.read_broadcast(-1).unwrap_err().kind,
            ErrorKind::ChannelOutOfRange
        );
        assert_eq!(
            rc.broadcast(70_000, 1).unwrap_err().kind,
            ErrorKind::ChannelOutOfRange
        );
        assert_eq!(
            rc.broadcast(1, 1).unwrap_err().kind,
            ErrorKind::InsufficientResource
        );
    }

    #[test]
    fn test_writer_reads_own_pending_write() {
        let mut world = world();
        world.pool_mut(Team::A).credit(100.0);
        let hq = hq(&world, Team::A);
        let mut queue = SignalQueue::new();
        let mut rc = RobotController::new(&mut world, &mut queue, hq).unwrap();
        rc.broadcast(7, 1234).unwrap();
        assert!(rc.has_broadcasted());
        assert_eq!(rc.read_broadcast(7).unwrap(), 1234);
        let spent = world.balance().broadcast_send_cost + world.balance().broadcast_read_cost;
        assert!((world.pool(Team::A).power() - (100.0 - spent)).abs() < 1e-9);
    }

    #[test]
    fn test_defuse_reach() {
        let mut world = world();
        let soldier = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(10, 10)).unwrap();
        let mut queue = SignalQueue::new();
        let mut rc = RobotController::new(&mut world, &mut queue, soldier).unwrap();
        assert_eq!(
            rc.defuse_mine(MapLocation::new(12, 10)).unwrap_err().kind,
            ErrorKind::OutOfSensorRange
        );
        rc.defuse_mine(MapLocation::new(11, 11)).unwrap();
        assert_eq!(
            rc.rounds_until_idle(ActionClass::Mine),
            Balance::default().mine_defuse_delay
        );
    }

    #[test]
    fn test_scan_requires_detector() {
        let mut world = world();
        world.pool_mut(Team::A).credit(100.0);
        let soldier = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(10, 10)).unwrap();
        let mut queue = SignalQueue::new();
        {
            let mut rc = RobotController::new(&mut world, &mut queue, soldier).unwrap();
            assert_eq!(rc.scan_mines().unwrap_err().kind, ErrorKind::MissingUpgrade);
        }
        world.upgrades_mut(Team::A).grant(Upgrade::MineDetector);
        let mut rc = RobotController::new(&mut world, &mut queue, soldier).unwrap();
        rc.scan_mines().unwrap();
        assert!((rc.team_power() - (100.0 - Balance::default().scan_cost)).abs() < 1e-9);
    }

    #[test]
    fn test_team_memory_permissions_and_reads() {
        let mut world = world();
        world.install_memory(Team::A, Some(vec![42]));
        let hq = hq(&world, Team::A);
        let medbay = world.add_unit(Team::A, UnitType::Medbay, MapLocation::new(9, 9)).unwrap();
        let mut queue = SignalQueue::new();
        {
            let mut rc = RobotController::new(&mut world, &mut queue, medbay).unwrap();
            assert_eq!(
                rc.set_team_memory(0, 1).unwrap_err().kind,
                ErrorKind::InvalidActionForType
            );
            assert_eq!(rc.team_memory(0).unwrap(), 42);
        }
        let mut rc = RobotController::new(&mut world, &mut queue, hq).unwrap();
        rc.set_team_memory(0, 7).unwrap();
        assert_eq!(rc.team_memory(0).unwrap(), 42);
        assert_eq!(
            rc.set_team_memory(10_000, 7).unwrap_err().kind,
            ErrorKind::InvalidTarget
        );
    }

    #[test]
    fn test_suicide_ends_turn_and_later_calls_fail() {
        let mut world = world();
        let soldier = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(10, 10)).unwrap();
        let mut queue = SignalQueue::new();
        let mut rc = RobotController::new(&mut world, &mut queue, soldier).unwrap();
        rc.suicide();
        assert!(rc.turn_ended());
        assert!(rc.location().is_none());
        assert_eq!(rc.lay_mine().unwrap_err().kind, ErrorKind::InvalidTarget);
        drop(rc);
        assert!(world.unit(soldier).is_none());
    }

    #[test]
    fn test_resign_removes_team_and_decides_match() {
        let mut world = world();
        world.add_unit(Team::B, UnitType::Soldier, MapLocation::new(15, 15)).unwrap();
        let hq_b = hq(&world, Team::B);
        let mut queue = SignalQueue::new();
        RobotController::new(&mut world, &mut queue, hq_b)
            .unwrap()
            .resign();
        assert_eq!(world.units().filter(|u| u.team == Team::B).count(), 0);
        let outcome = world.outcome().unwrap();
        assert_eq!(outcome.winner, Team::A);
        assert_eq!(outcome.reason, EndReason::Resigned);
    }

    #[test]
    fn test_yield_credit() {
        let mut world = world();
        let hq = hq(&world, Team::A);
        let mut queue = SignalQueue::new();
        let mut rc = RobotController::new(&mut world, &mut queue, hq).unwrap();
        let rate = Balance::default().power_per_unused_bytecode;
        let reward = rc.yield_turn(100, 40);
        assert!((reward - rate * 60.0).abs() < 1e-12);
        assert!(rc.yield_turn(100, 100).abs() < 1e-12);
        assert!(rc.yield_turn(100, 150).abs() < 1e-12);
    }

    #[test]
    fn test_research_only_hq() {
        let mut world = world();
        let hq = hq(&world, Team::A);
        let soldier = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(10, 10)).unwrap();
        let mut queue = SignalQueue::new();
        {
            let mut rc = RobotController::new(&mut world, &mut queue, soldier).unwrap();
            assert_eq!(
                rc.research_upgrade(Upgrade::Fusion).unwrap_err().kind,
                ErrorKind::InvalidActionForType
            );
            assert!(rc.sense_enemy_nuke_progress().is_err());
        }
        world.upgrades_mut(Team::A).grant(Upgrade::Vision);
        let mut rc = RobotController::new(&mut world, &mut queue, hq).unwrap();
        assert_eq!(
            rc.research_upgrade(Upgrade::Vision).unwrap_err().kind,
            ErrorKind::InvalidTarget
        );
        rc.research_upgrade(Upgrade::Fusion).unwrap();
        assert_eq!(rc.sense_enemy_nuke_progress().unwrap(), 0);
    }

    #[test]
    fn test_sensing_far_off_map_cell_is_rejected() {
        let mut world = world();
        let hq = hq(&world, Team::A);
        let mut queue = SignalQueue::new();
        let rc = RobotController::new(&mut world, &mut queue, hq).unwrap();
        let far = MapLocation::new(60_000, 0);
        assert_eq!(rc.sense_object_at(far).unwrap_err().kind, ErrorKind::InvalidTarget);
        assert!(!rc.can_sense_square(far));
        assert!(!rc.can_sense_square(MapLocation::new(i32::MIN, i32::MAX)));
    }

    #[test]
    fn test_unseen_and_missing_units_look_the_same() {
        let mut world = world();
        let hq = hq(&world, Team::A);
        let hidden = world.add_unit(Team::B, UnitType::Soldier, MapLocation::new(15, 15)).unwrap();
        let seen = world.add_unit(Team::B, UnitType::Soldier, MapLocation::new(3, 3)).unwrap();
        let mut queue = SignalQueue::new();
        let rc = RobotController::new(&mut world, &mut queue, hq).unwrap();

        let unseen = rc.sense_unit_info(hidden).unwrap_err();
        let missing = rc.sense_unit_info(9999).unwrap_err();
        assert_eq!(unseen.kind, ErrorKind::InvalidTarget);
        assert_eq!(unseen.kind, missing.kind);
        assert_eq!(rc.sense_unit_info(seen).unwrap().location, MapLocation::new(3, 3));
    }
}
