//! Damage, healing and death.
//!
//! Artillery strikes are signals; everything else here is a passive effect
//! applied once per round after signals resolve. Damage always drains shields
//! before energon.

use crate::game::{EndReason, MapLocation, Team, UnitId, UnitType, WorldState};

/// Artillery strike: full power on the target cell, splash on its neighbours.
///
/// Hits whatever stands there now, friend or foe. Returns the number of units hit.
pub fn artillery_strike(world: &mut WorldState, attacker: UnitId, target: MapLocation) -> usize {
    let Some(unit) = world.unit(attacker) else {
        return 0;
    };
    let power = world.balance().stats(unit.unit_type).attack_power;
    let splash = power * world.balance().artillery_splash_ratio;

    let mut hits = Vec::with_capacity(9);
    if let Some(victim) = world.unit_at(target) {
        hits.push((victim.id, power));
    }
    for cell in target.neighbours() {
        if let Some(victim) = world.unit_at(cell) {
            hits.push((victim.id, splash));
        }
    }
    let count = hits.len();
    apply_damage(world, &hits);
    count
}

fn apply_damage(world: &mut WorldState, hits: &[(UnitId, f64)]) {
    for &(id, amount) in hits {
        if let Some(unit) = world.unit_mut(id) {
            unit.take_damage(amount);
        }
    }
}

/// Soldiers split their attack power evenly among adjacent enemies.
///
/// Damage is computed from positions before any of it lands, so the order of
/// soldiers does not matter.
pub fn soldier_melee(world: &mut WorldState) {
    let stats = *world.balance().stats(UnitType::Soldier);
    let mut hits = Vec::new();
    for soldier in world.units().filter(|u| u.unit_type == UnitType::Soldier) {
        let enemies: Vec<UnitId> = world
            .units()
            .filter(|u| {
                u.team == soldier.team.opponent()
                    && soldier.location.distance_squared_to(u.location) <= stats.attack_radius_squared
            })
            .map(|u| u.id)
            .collect();
        if enemies.is_empty() {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let share = stats.attack_power / enemies.len() as f64;
        hits.extend(enemies.into_iter().map(|id| (id, share)));
    }
    apply_damage(world, &hits);
}

/// Units standing on a mine their team does not own take mine damage.
pub fn mine_damage(world: &mut WorldState) {
    let damage = world.balance().mine_damage;
    let hits: Vec<(UnitId, f64)> = world
        .units()
        .filter(|u| world.mine_at(u.location).is_some_and(|owner| owner != u.team))
        .map(|u| (u.id, damage))
        .collect();
    apply_damage(world, &hits);
}

/// Medbays heal allies in range; shields encampments top up allied shields.
pub fn support_effects(world: &mut WorldState) {
    let balance = *world.balance();
    let sources: Vec<(UnitType, Team, MapLocation)> = world
        .units()
        .filter(|u| matches!(u.unit_type, UnitType::Medbay | UnitType::Shields))
        .map(|u| (u.unit_type, u.team, u.location))
        .collect();

    for (kind, team, center) in sources {
        for unit in world.units_mut() {
            if unit.team != team {
                continue;
            }
            let dist = center.distance_squared_to(unit.location);
            match kind {
                UnitType::Medbay if dist <= balance.medbay_radius_squared => {
                    let max = balance.stats(unit.unit_type).max_energon;
                    unit.energon = (unit.energon + balance.medbay_heal).min(max);
                }
                UnitType::Shields if dist <= balance.shields_radius_squared => {
                    unit.shields = (unit.shields + balance.shields_regen).min(balance.max_shields);
                }
                _ => {}
            }
        }
    }
}

/// Remove every unit at or below zero energon. Returns how many died.
///
/// If both HQs fall together the tiebreak picks the winner.
pub fn remove_dead(world: &mut WorldState) -> usize {
    let dead: Vec<(UnitId, UnitType)> = world
        .units()
        .filter(|u| u.is_dead())
        .map(|u| (u.id, u.unit_type))
        .collect();
    let hqs_lost = dead.iter().filter(|(_, t)| *t == UnitType::Hq).count();
    if hqs_lost == Team::PLAYERS.len() {
        let winner = world.tiebreak_winner();
        world.declare_winner(winner, EndReason::HqDestroyed);
    }
    for &(id, unit_type) in &dead {
        tracing::debug!(unit = id, ?unit_type, round = world.round(), "unit destroyed");
        world.remove_unit(id);
    }
    dead.len()
}
