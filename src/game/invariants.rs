//! World invariants - sanity checks that detect bugs.
//!
//! These should NEVER trigger after a round resolves. If they do, some
//! mutation bypassed the world's bookkeeping.

use std::collections::HashSet;

use crate::game::{EncampmentState, Team, UnitType, WorldState};

/// Sanity bound: no pool should ever hold more than this.
pub const SANITY_MAX_POWER: f64 = 1e12;

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

fn violation(message: String) -> InvariantViolation {
    InvariantViolation { message }
}

/// Check all world invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(world: &WorldState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for team in Team::PLAYERS {
        let power = world.pool(team).power();
        if !power.is_finite() || power < 0.0 || power > SANITY_MAX_POWER {
            violations.push(violation(format!("Team {team} power {power} out of range")));
        }
    }

    // Units: placement, health and occupancy
    let mut cells = HashSet::new();
    for unit in world.units() {
        if !world.map().is_passable(unit.location) {
            violations.push(violation(format!(
                "Unit {} stands on impassable {}",
                unit.id, unit.location
            )));
        }
        if !cells.insert(unit.location) {
            violations.push(violation(format!("Two units share {}", unit.location)));
        }
        if world.unit_at(unit.location).map(|u| u.id) != Some(unit.id) {
            violations.push(violation(format!(
                "Occupancy index disagrees for unit {} at {}",
                unit.id, unit.location
            )));
        }
        if !(unit.energon.is_finite() && unit.energon > 0.0) {
            violations.push(violation(format!(
                "Unit {} survived with energon {}",
                unit.id, unit.energon
            )));
        }
        if unit.shields < 0.0 || unit.shields > world.balance().max_shields {
            violations.push(violation(format!(
                "Unit {} has shields {}",
                unit.id, unit.shields
            )));
        }
        if unit.team == Team::Neutral {
            violations.push(violation(format!("Unit {} belongs to the neutral team", unit.id)));
        }
    }

    // Known mines must be real enemy mines
    for team in Team::PLAYERS {
        for &loc in world.known_mines(team) {
            if world.mine_at(loc) != Some(team.opponent()) {
                violations.push(violation(format!(
                    "Team {team} knows a mine at {loc} that is not an enemy mine"
                )));
            }
        }
    }

    // Encampment bookkeeping
    for (loc, state) in world.encampments() {
        match state {
            EncampmentState::Unclaimed => {
                if world.unit_at(loc).is_some_and(|u| u.unit_type.is_encampment()) {
                    violations.push(violation(format!(
                        "Unclaimed encampment at {loc} holds an encampment unit"
                    )));
                }
            }
            EncampmentState::Capturing { unit, team, .. } => {
                let ok = world
                    .unit(unit)
                    .is_some_and(|u| u.team == team && u.unit_type == UnitType::Soldier);
                if !ok {
                    violations.push(violation(format!(
                        "Capture at {loc} is held by a missing or wrong unit {unit}"
                    )));
                }
            }
            EncampmentState::Captured { unit, team } => {
                let ok = world.unit(unit).is_some_and(|u| {
                    u.team == team && u.location == loc && u.unit_type.is_encampment()
                });
                if !ok {
                    violations.push(violation(format!(
                        "Captured encampment at {loc} has no matching unit {unit}"
                    )));
                }
            }
        }
    }

    violations
}

/// Assert all world invariants hold, panicking if any are violated.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with detailed message if any invariant is violated.
#[cfg(debug_assertions)]
pub fn assert_invariants(world: &WorldState) {
    let violations = check_invariants(world);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        panic!("World invariant violations:\n  - {}", messages.join("\n  - "));
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_invariants(_world: &WorldState) {}
