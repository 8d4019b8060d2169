//! Round resolution.
//!
//! At the round boundary queued signals are applied in class order
//! (spawn, movement, attack, capture, research, mine, commit), keeping emission
//! order within a class. Every spatial signal is re-checked against the world
//! as it is *now*; a signal whose target went stale is dropped without refund.
//!
//! After signals, [`end_round`] runs the passive phase:
//!
//! ```text
//! melee → mines → medbay/shields → deaths → works → economy → deaths → tick
//! ```

use crate::game::combat::{artillery_strike, mine_damage, remove_dead, soldier_melee, support_effects};
use crate::game::economy::{apply_round_economy, TeamHoldings};
use crate::game::{
    Direction, EncampmentState, EndReason, MapLocation, MineOp, MineWork, MineWorkKind, PerTeam,
    Signal, SignalQueue, Team, UnitId, UnitType, Upgrade, WorldState,
};

/// What happened while resolving a round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Signals that took effect.
    pub applied: usize,
    /// Signals dropped because their target went stale.
    pub stale: usize,
    /// Units created by spawn signals, per team.
    pub spawned: PerTeam<u32>,
    /// Encampments completed this round.
    pub captures_completed: usize,
    /// Units removed at the round boundary.
    pub deaths: usize,
}

/// Apply one signal. Returns `false` if it went stale.
pub fn apply_signal(world: &mut WorldState, signal: Signal, report: &mut RoundReport) -> bool {
    match signal {
        Signal::Spawn {
            team,
            unit_type,
            location,
            ..
        } => apply_spawn(world, team, unit_type, location, report),
        Signal::Movement { unit, from, to } => apply_movement(world, unit, from, to),
        Signal::Attack { unit, target } => {
            if world.unit(unit).is_none() {
                return false;
            }
            artillery_strike(world, unit, target);
            true
        }
        Signal::Capture {
            unit,
            team,
            location,
            kind,
        } => apply_capture(world, unit, team, location, kind),
        Signal::Research { team, upgrade } => {
            apply_research(world, team, upgrade);
            true
        }
        Signal::Mine {
            unit,
            team,
            origin,
            op,
        } => apply_mine(world, unit, team, origin, op),
        Signal::Broadcast { channel, value, .. } => {
            world.board_mut().commit(channel, value);
            true
        }
        Signal::TeamMemory {
            team,
            index,
            value,
            mask,
        } => {
            world.memory_mut(team).write_masked(index, value, mask);
            true
        }
    }
}

fn apply_spawn(
    world: &mut WorldState,
    team: Team,
    unit_type: UnitType,
    location: MapLocation,
    report: &mut RoundReport,
) -> bool {
    if world.add_unit(team, unit_type, location).is_none() {
        return false;
    }
    report.spawned[team] += 1;
    true
}

fn apply_movement(world: &mut WorldState, unit: UnitId, from: MapLocation, to: MapLocation) -> bool {
    let still_there = world.unit(unit).is_some_and(|u| u.location == from);
    still_there && world.move_unit(unit, to)
}

fn apply_capture(
    world: &mut WorldState,
    unit: UnitId,
    team: Team,
    location: MapLocation,
    kind: UnitType,
) -> bool {
    let on_cell = world.unit(unit).is_some_and(|u| u.location == location);
    if !on_cell || world.encampment(location) != Some(EncampmentState::Unclaimed) {
        return false;
    }
    let remaining = world.balance().capture_delay;
    world.set_encampment(
        location,
        EncampmentState::Capturing {
            team,
            unit,
            kind,
            remaining,
        },
    );
    true
}

fn apply_research(world: &mut WorldState, team: Team, upgrade: Upgrade) {
    let required = world.balance().research_rounds(upgrade);
    if world.upgrades_mut(team).advance(upgrade, required) {
        tracing::info!(%team, ?upgrade, round = world.round(), "upgrade researched");
        if upgrade == Upgrade::Nuke {
            world.declare_winner(team, EndReason::Nuke);
        }
    }
}

fn apply_mine(world: &mut WorldState, unit: UnitId, team: Team, origin: MapLocation, op: MineOp) -> bool {
    let Some(worker) = world.unit(unit) else {
        return false;
    };
    let scan_center = worker.location;
    let scan_radius = world.sensor_radius_squared(team, worker.unit_type);
    if worker.location != origin && op != MineOp::Scan {
        return false;
    }
    match op {
        MineOp::Lay => {
            let remaining = world.balance().mine_lay_delay;
            world.push_mine_work(MineWork {
                unit,
                team,
                origin,
                kind: MineWorkKind::Lay,
                remaining,
            });
        }
        MineOp::Defuse { target, delay } => world.push_mine_work(MineWork {
            unit,
            team,
            origin,
            kind: MineWorkKind::Defuse { target },
            remaining: delay,
        }),
        MineOp::Scan => {
            let found: Vec<MapLocation> = world
                .mines()
                .filter(|&(loc, owner)| {
                    owner == team.opponent() && scan_center.distance_squared_to(loc) <= scan_radius
                })
                .map(|(loc, _)| loc)
                .collect();
            for loc in found {
                world.reveal_mine(team, loc);
            }
        }
    }
    true
}

/// Apply every queued signal in resolution order and empty the queue.
pub fn resolve_signals(world: &mut WorldState, queue: &mut SignalQueue, report: &mut RoundReport) {
    for signal in queue.drain_ordered() {
        if apply_signal(world, signal, report) {
            tracing::trace!(?signal, "signal applied");
            report.applied += 1;
        } else {
            tracing::debug!(?signal, "stale signal dropped");
            report.stale += 1;
        }
    }
}

/// Count down captures. Interrupted captures revert; finished ones replace
/// the soldier with an encampment unit. Returns how many finished.
pub fn advance_captures(world: &mut WorldState) -> usize {
    let captures: Vec<(MapLocation, EncampmentState)> = world
        .encampments()
        .filter(|(_, s)| matches!(s, EncampmentState::Capturing { .. }))
        .collect();
    let mut completed = 0;
    for (location, state) in captures {
        let EncampmentState::Capturing {
            team,
            unit,
            kind,
            remaining,
        } = state
        else {
            continue;
        };
        let on_cell = world.unit(unit).is_some_and(|u| u.location == location);
        if !on_cell {
            world.set_encampment(location, EncampmentState::Unclaimed);
            continue;
        }
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            world.set_encampment(
                location,
                EncampmentState::Capturing {
                    team,
                    unit,
                    kind,
                    remaining,
                },
            );
            continue;
        }
        world.remove_unit(unit);
        match world.add_unit(team, kind, location) {
            Some(id) => {
                tracing::info!(%team, ?kind, %location, round = world.round(), "encampment captured");
                world.set_encampment(location, EncampmentState::Captured { team, unit: id });
                completed += 1;
            }
            None => world.set_encampment(location, EncampmentState::Unclaimed),
        }
    }
    completed
}

/// Count down lay and defuse works, completing those that reach zero while
/// their unit still stands on its origin cell.
pub fn advance_mine_works(world: &mut WorldState) {
    let mut still_running = Vec::new();
    for mut work in world.take_mine_works() {
        let in_place = world.unit(work.unit).is_some_and(|u| u.location == work.origin);
        if !in_place {
            continue;
        }
        work.remaining = work.remaining.saturating_sub(1);
        if work.remaining > 0 {
            still_running.push(work);
            continue;
        }
        match work.kind {
            MineWorkKind::Lay => {
                world.lay_mine(work.origin, work.team);
                if world.upgrades(work.team).has(Upgrade::Pickaxe) {
                    for dir in [Direction::North, Direction::East, Direction::South, Direction::West] {
                        world.lay_mine(work.origin.add(dir), work.team);
                    }
                }
            }
            MineWorkKind::Defuse { target } => {
                world.clear_mine(target);
            }
        }
    }
    for work in still_running {
        world.push_mine_work(work);
    }
}

fn advance_economy(world: &mut WorldState) {
    let unpowered_loss = world.balance().unpowered_energon_loss;
    for team in Team::PLAYERS {
        let holdings = TeamHoldings {
            hq_alive: world.hq(team).is_some(),
            generators: world.count_units(team, UnitType::Generator),
            upkeep_units: world
                .units()
                .filter(|u| u.team == team && u.unit_type != UnitType::Hq)
                .count(),
            fusion: world.upgrades(team).has(Upgrade::Fusion),
        };
        let balance = *world.balance();
        let result = apply_round_economy(&balance, world.pool_mut(team), holdings);
        if !result.upkeep_paid {
            tracing::debug!(%team, upkeep = result.upkeep, "upkeep unpaid");
            for unit in world.units_mut() {
                if unit.team == team && unit.unit_type != UnitType::Hq {
                    unit.energon -= unpowered_loss;
                }
            }
        }
    }
}

/// Resolve the round: signals, passives, works, economy, counters.
///
/// The queue is left empty and the round number advanced.
pub fn end_round(world: &mut WorldState, queue: &mut SignalQueue) -> RoundReport {
    let mut report = RoundReport::default();
    resolve_signals(world, queue, &mut report);

    soldier_melee(world);
    mine_damage(world);
    support_effects(world);
    report.deaths += remove_dead(world);

    report.captures_completed = advance_captures(world);
    advance_mine_works(world);

    advance_economy(world);
    report.deaths += remove_dead(world);

    for unit in world.units_mut() {
        unit.activity.tick();
        unit.broadcasted = false;
    }
    world.advance_round();
    report
}
