//! Built-in strategies.
//!
//! Small reference players used by the CLI, the benches and the integration
//! tests:
//!
//! | Name | Plan |
//! |------|------|
//! | `idle` | every unit yields at once |
//! | `rush` | the HQ floods soldiers that march on the enemy HQ |
//! | `turtle` | a mined perimeter around the HQ while it researches Nuke |
//! | `expand` | soldiers claim encampments over the radio, then rush |

use crate::error::ErrorKind;
use crate::game::{
    ActionClass, Direction, MapLocation, RobotController, SenseFilter, Team, UnitInfo, UnitType,
    Upgrade,
};
use crate::scheduler::{RobotProgram, Step, Strategy};

/// Names accepted by [`builtin`].
pub const BUILTIN_NAMES: [&str; 4] = ["idle", "rush", "turtle", "expand"];

/// Look up a built-in strategy by name.
#[must_use]
pub fn builtin(name: &str) -> Option<Box<dyn Strategy>> {
    match name {
        "idle" => Some(Box::new(Idle)),
        "rush" => Some(Box::new(Rush)),
        "turtle" => Some(Box::new(Turtle)),
        "expand" => Some(Box::new(Expand)),
        _ => None,
    }
}

/// Instructions charged for a cheap decision.
const LIGHT: u32 = 50;
/// Instructions charged for a step that scanned the surroundings.
const HEAVY: u32 = 400;

fn yield_now(_rc: &mut RobotController<'_>) -> Step {
    Step::Yield(1)
}

/// Try `dir` and its neighbours, nearest first.
fn fan(dir: Direction) -> [Direction; 5] {
    [
        dir,
        dir.rotate_left(),
        dir.rotate_right(),
        dir.rotate_left().rotate_left(),
        dir.rotate_right().rotate_right(),
    ]
}

/// Take one step toward `target`, skipping cells with mines this team fears.
fn step_toward(rc: &mut RobotController<'_>, target: MapLocation) -> bool {
    let Some(here) = rc.location() else {
        return false;
    };
    if here == target || !rc.is_idle(ActionClass::Movement) {
        return false;
    }
    let team = rc.team();
    for dir in fan(here.direction_to(target)) {
        let next = here.add(dir);
        let hostile_mine = rc.sense_mine(next).is_some_and(|owner| owner != team);
        if !hostile_mine && rc.can_move(dir) && rc.move_to(dir).is_ok() {
            return true;
        }
    }
    false
}

/// Spawn a soldier facing `toward` if possible.
fn spawn_toward(rc: &mut RobotController<'_>, toward: Option<MapLocation>) -> bool {
    let Some(here) = rc.location() else {
        return false;
    };
    if !rc.is_idle(ActionClass::Movement) {
        return false;
    }
    let facing = toward.map_or(Direction::East, |t| here.direction_to(t));
    let facing = if facing.is_compass() { facing } else { Direction::East };
    let behind = facing.opposite();
    let mut dirs = fan(facing).to_vec();
    dirs.extend([behind.rotate_left(), behind.rotate_right(), behind]);
    dirs.into_iter().any(|dir| rc.spawn(dir).is_ok())
}

fn own_soldiers(rc: &RobotController<'_>) -> usize {
    rc.sense_nearby_units(SenseFilter::default().team(rc.team()).of_type(UnitType::Soldier))
        .len()
}

/// Research the first missing upgrade of `plan`.
fn research_next(rc: &mut RobotController<'_>, plan: &[Upgrade]) -> bool {
    plan.iter()
        .find(|&&up| !rc.has_upgrade(up))
        .is_some_and(|&up| rc.research_upgrade(up).is_ok())
}

/// Every unit yields immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl Strategy for Idle {
    fn name(&self) -> &str {
        "idle"
    }

    fn program_for(&self, _unit: &UnitInfo) -> Box<dyn RobotProgram> {
        Box::new(yield_now)
    }
}

/// Soldiers marching on the enemy HQ.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rush;

fn rush_soldier(rc: &mut RobotController<'_>) -> Step {
    if let Some(target) = rc.sense_enemy_hq_location() {
        step_toward(rc, target);
    }
    Step::Yield(LIGHT)
}

impl Strategy for Rush {
    fn name(&self) -> &str {
        "rush"
    }

    fn program_for(&self, unit: &UnitInfo) -> Box<dyn RobotProgram> {
        match unit.unit_type {
            UnitType::Hq => Box::new(|rc: &mut RobotController<'_>| {
                let enemy = rc.sense_enemy_hq_location();
                spawn_toward(rc, enemy);
                Step::Yield(LIGHT)
            }),
            UnitType::Soldier => Box::new(rush_soldier),
            _ => Box::new(yield_now),
        }
    }
}

/// A mined ring around the HQ while Nuke is researched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Turtle;

/// Soldiers kept at home.
const TURTLE_GARRISON: usize = 6;
/// Power kept back before spawning.
const TURTLE_RESERVE: f64 = 20.0;
/// Research order.
const TURTLE_PLAN: [Upgrade; 3] = [Upgrade::Fusion, Upgrade::Pickaxe, Upgrade::Nuke];

fn turtle_soldier(rc: &mut RobotController<'_>) -> Step {
    let (Some(here), Some(home)) = (rc.location(), rc.sense_hq_location()) else {
        return Step::Yield(LIGHT);
    };
    let distance = here.distance_squared_to(home);
    if distance < 5 {
        let away = home.direction_to(here);
        step_toward(rc, here.add(away).add(away));
    } else if distance > 13 {
        step_toward(rc, home);
    } else if rc.sense_mine(here) != Some(rc.team()) && rc.is_idle(ActionClass::Mine) {
        let _ = rc.lay_mine();
    } else {
        // Walk the ring clockwise
        let along = home.direction_to(here).rotate_right().rotate_right();
        step_toward(rc, here.add(along));
    }
    Step::Yield(LIGHT)
}

impl Strategy for Turtle {
    fn name(&self) -> &str {
        "turtle"
    }

    fn program_for(&self, unit: &UnitInfo) -> Box<dyn RobotProgram> {
        match unit.unit_type {
            UnitType::Hq => Box::new(|rc: &mut RobotController<'_>| {
                if own_soldiers(rc) < TURTLE_GARRISON && rc.team_power() >= TURTLE_RESERVE {
                    let enemy = rc.sense_enemy_hq_location();
                    if spawn_toward(rc, enemy) {
                        return Step::Yield(HEAVY);
                    }
                }
                research_next(rc, &TURTLE_PLAN);
                Step::Yield(HEAVY)
            }),
            UnitType::Soldier => Box::new(turtle_soldier),
            _ => Box::new(yield_now),
        }
    }
}

/// Soldiers claiming encampments, coordinated over the radio.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expand;

/// Soldiers the HQ keeps producing before it turns to research.
const EXPAND_ARMY: usize = 10;

/// Radio channel holding the claim on encampment `index`.
fn claim_channel(team: Team, index: usize) -> i64 {
    let base = if team == Team::B { 20_000 } else { 10_000 };
    base + i64::try_from(index).unwrap_or(0)
}

/// Encampment type to build on the `index`th encampment.
fn expand_kind(index: usize) -> UnitType {
    match index % 3 {
        2 => UnitType::Supplier,
        _ => UnitType::Generator,
    }
}

/// Whether an encampment still looks free from this team's point of view.
fn looks_free(rc: &RobotController<'_>, loc: MapLocation, me: MapLocation) -> bool {
    if loc == me {
        return true;
    }
    !matches!(rc.sense_object_at(loc), Ok(Some(_)))
}

/// Pick the nearest encampment nobody else has claimed and claim it.
fn claim_target(rc: &mut RobotController<'_>) -> Option<(usize, MapLocation)> {
    let here = rc.location()?;
    let allied = rc.sense_allied_encampments();
    let mut candidates: Vec<(usize, MapLocation)> = rc
        .sense_all_encampments()
        .into_iter()
        .enumerate()
        .filter(|(_, loc)| !allied.contains(loc) && looks_free(rc, *loc, here))
        .collect();
    candidates.sort_by_key(|(i, loc)| (here.distance_squared_to(*loc), *i));
    let me = i64::from(rc.id());
    let team = rc.team();
    for (index, loc) in candidates.into_iter().take(4) {
        let channel = claim_channel(team, index);
        match rc.read_broadcast(channel) {
            Ok(owner) if owner == 0 || owner == me => {
                if owner == 0 && rc.broadcast(channel, me).is_err() {
                    return None;
                }
                return Some((index, loc));
            }
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    None
}

impl Strategy for Expand {
    fn name(&self) -> &str {
        "expand"
    }

    fn program_for(&self, unit: &UnitInfo) -> Box<dyn RobotProgram> {
        match unit.unit_type {
            UnitType::Hq => Box::new(|rc: &mut RobotController<'_>| {
                if own_soldiers(rc) < EXPAND_ARMY {
                    let enemy = rc.sense_enemy_hq_location();
                    if spawn_toward(rc, enemy) {
                        return Step::Yield(HEAVY);
                    }
                }
                if rc.team_power() > 100.0 {
                    research_next(rc, &[Upgrade::Fusion, Upgrade::Nuke]);
                }
                Step::Yield(HEAVY)
            }),
            UnitType::Soldier => {
                let mut target: Option<(usize, MapLocation)> = None;
                let mut searched = false;
                Box::new(move |rc: &mut RobotController<'_>| {
                    if target.is_none() && !searched {
                        searched = true;
                        target = claim_target(rc);
                        return Step::Continue(HEAVY);
                    }
                    let Some((index, loc)) = target else {
                        return rush_soldier(rc);
                    };
                    if rc.location() == Some(loc) {
                        if rc.is_idle(ActionClass::Capture) {
                            match rc.capture_encampment(expand_kind(index)) {
                                // Claimed or contested by someone else
                                Err(e) if e.kind == ErrorKind::InvalidTarget => {
                                    target = None;
                                    searched = false;
                                }
                                _ => {}
                            }
                        }
                    } else if !looks_free(rc, loc, rc.location().unwrap_or(loc)) {
                        target = None;
                        searched = false;
                    } else {
                        step_toward(rc, loc);
                    }
                    Step::Yield(LIGHT)
                })
            }
            _ => Box::new(yield_now),
        }
    }
}
