//! Turn scheduler.
//!
//! Each round every live unit gets one turn, in ascending id order, with a
//! fixed compute budget. A unit's program is a step function: the scheduler
//! calls it repeatedly, charging each step to the [`ComputeMeter`], until the
//! program yields, the budget runs out, or the unit leaves the game.
//!
//! - **Yield**: unused budget is converted into team power.
//! - **Suspension**: the budget ran out; actions already taken stand but
//!   nothing is credited.
//!
//! After all turns the round is resolved by [`end_round`].

mod meter;

pub use meter::{ComputeMeter, MeterReading, StepMeter};

use std::collections::BTreeMap;

use crate::game::{
    end_round, PerTeam, RobotController, RoundReport, SignalQueue, Team, UnitId, UnitInfo,
    WorldState,
};

/// What a program step reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep running; the step cost this many instructions.
    Continue(u32),
    /// End the turn early; the step cost this many instructions.
    Yield(u32),
}

/// A unit's behaviour, called step by step during its turn.
pub trait RobotProgram {
    /// Run one step against the gateway.
    fn step(&mut self, rc: &mut RobotController<'_>) -> Step;
}

impl<F> RobotProgram for F
where
    F: FnMut(&mut RobotController<'_>) -> Step,
{
    fn step(&mut self, rc: &mut RobotController<'_>) -> Step {
        self(rc)
    }
}

/// Builds programs for one team's units.
pub trait Strategy: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    /// Program for a newly seen unit.
    fn program_for(&self, unit: &UnitInfo) -> Box<dyn RobotProgram>;
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnEnd {
    /// The program yielded and this much power was credited.
    Yielded {
        /// Power credited for unused compute.
        credited: f64,
    },
    /// The budget ran out.
    Suspended,
    /// The unit resigned or self-destructed.
    Left,
}

/// Result of one unit's turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnOutcome {
    /// Instructions charged.
    pub consumed: u32,
    /// How it ended.
    pub end: TurnEnd,
}

/// Per-team totals accumulated across turns.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamTurnStats {
    /// Instructions charged.
    pub instructions: u64,
    /// Turns cut off by the budget.
    pub suspensions: u32,
    /// Power credited by yields.
    pub yield_credit: f64,
}

/// Run one turn for `unit`. Returns `None` if the unit is not alive.
pub fn run_turn(
    world: &mut WorldState,
    queue: &mut SignalQueue,
    meter: &mut dyn ComputeMeter,
    program: &mut dyn RobotProgram,
    unit: UnitId,
) -> Option<TurnOutcome> {
    let limit = world.balance().bytecode_limit;
    let mut rc = RobotController::new(world, queue, unit)?;
    meter.begin_turn(limit);
    loop {
        let (instructions, yielding) = match program.step(&mut rc) {
            Step::Continue(n) => (n, false),
            Step::Yield(n) => (n, true),
        };
        let reading = if yielding {
            meter.record_yield(instructions)
        } else {
            meter.record(instructions)
        };
        if rc.turn_ended() {
            return Some(TurnOutcome {
                consumed: reading.consumed,
                end: TurnEnd::Left,
            });
        }
        if reading.exhausted {
            tracing::debug!(unit, consumed = reading.consumed, limit, "turn suspended");
            return Some(TurnOutcome {
                consumed: reading.consumed,
                end: TurnEnd::Suspended,
            });
        }
        if yielding {
            let credited = rc.yield_turn(limit, reading.consumed);
            return Some(TurnOutcome {
                consumed: reading.consumed,
                end: TurnEnd::Yielded { credited },
            });
        }
    }
}

/// Drives rounds for a match: owns the per-unit programs and the meter.
pub struct Scheduler<'s> {
    strategies: [&'s dyn Strategy; 2],
    programs: BTreeMap<UnitId, Box<dyn RobotProgram>>,
    meter: Box<dyn ComputeMeter>,
    queue: SignalQueue,
    stats: PerTeam<TeamTurnStats>,
}

impl std::fmt::Debug for Scheduler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("strategies", &[self.strategies[0].name(), self.strategies[1].name()])
            .field("programs", &self.programs.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<'s> Scheduler<'s> {
    /// Create a scheduler using the default [`StepMeter`].
    #[must_use]
    pub fn new(strategies: [&'s dyn Strategy; 2]) -> Self {
        Self::with_meter(strategies, Box::new(StepMeter::new()))
    }

    /// Create a scheduler with a custom meter.
    #[must_use]
    pub fn with_meter(strategies: [&'s dyn Strategy; 2], meter: Box<dyn ComputeMeter>) -> Self {
        Self {
            strategies,
            programs: BTreeMap::new(),
            meter,
            queue: SignalQueue::new(),
            stats: PerTeam::default(),
        }
    }

    /// Totals for a team so far.
    #[must_use]
    pub fn stats(&self, team: Team) -> TeamTurnStats {
        self.stats[team]
    }

    fn strategy_for(&self, team: Team) -> &'s dyn Strategy {
        match team {
            Team::B => self.strategies[1],
            Team::A | Team::Neutral => self.strategies[0],
        }
    }

    /// Give every live unit its turn, then resolve the round.
    pub fn run_round(&mut self, world: &mut WorldState) -> RoundReport {
        for id in world.unit_ids() {
            if world.is_over() {
                break;
            }
            let Some(info) = world.unit(id).map(|u| u.info()) else {
                continue;
            };
            let strategy = self.strategy_for(info.team);
            let program = self
                .programs
                .entry(id)
                .or_insert_with(|| strategy.program_for(&info));
            let Some(outcome) =
                run_turn(world, &mut self.queue, self.meter.as_mut(), program.as_mut(), id)
            else {
                continue;
            };
            let stats = &mut self.stats[info.team];
            stats.instructions += u64::from(outcome.consumed);
            match outcome.end {
                TurnEnd::Yielded { credited } => stats.yield_credit += credited,
                TurnEnd::Suspended => stats.suspensions += 1,
                TurnEnd::Left => {}
            }
        }

        let report = end_round(world, &mut self.queue);
        self.programs.retain(|id, _| world.unit(*id).is_some());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Balance, Direction, GameMap, MapLocation, MapSetup};

    struct Idle;

    impl Strategy for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn program_for(&self, _unit: &UnitInfo) -> Box<dyn RobotProgram> {
            Box::new(|_rc: &mut RobotController<'_>| Step::Yield(0))
        }
    }

    struct Spinner;

    impl Strategy for Spinner {
        fn name(&self) -> &str {
            "spinner"
        }

        fn program_for(&self, _unit: &UnitInfo) -> Box<dyn RobotProgram> {
            Box::new(|_rc: &mut RobotController<'_>| Step::Continue(7))
        }
    }

    struct Quitter;

    impl Strategy for Quitter {
        fn name(&self) -> &str {
            "quitter"
        }

        fn program_for(&self, _unit: &UnitInfo) -> Box<dyn RobotProgram> {
            Box::new(|rc: &mut RobotController<'_>| {
                rc.resign();
                Step::Yield(0)
            })
        }
    }

    fn world(balance: &Balance) -> WorldState {
        let setup = MapSetup {
            map: GameMap::new(10, 10).unwrap(),
            hq_a: MapLocation::new(1, 1),
            hq_b: MapLocation::new(8, 8),
            encampments: Vec::new(),
            neutral_mines: Vec::new(),
        };
        WorldState::new(setup, *balance, 9).unwrap()
    }

    #[test]
    fn test_yield_credits_unused_budget() {
        let balance = Balance {
            bytecode_limit: 100,
            power_per_unused_bytecode: 0.5,
            ..Balance::default()
        };
        let mut world = world(&balance);
        let hq = world.hq(Team::A).unwrap().id;
        let mut queue = SignalQueue::new();
        let mut meter = StepMeter::new();
        let mut calls = 0;
        let mut program = |_rc: &mut RobotController<'_>| {
            calls += 1;
            if calls == 1 {
                Step::Continue(30)
            } else {
                Step::Yield(10)
            }
        };
        let outcome = run_turn(&mut world, &mut queue, &mut meter, &mut program, hq).unwrap();
        assert_eq!(outcome.consumed, 40);
        assert_eq!(outcome.end, TurnEnd::Yielded { credited: 30.0 });
        assert!((world.pool(Team::A).power() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_overrun_suspends_without_credit() {
        let balance = Balance {
            bytecode_limit: 20,
            power_per_unused_bytecode: 1.0,
            ..Balance::default()
        };
        let mut world = world(&balance);
        let hq = world.hq(Team::A).unwrap().id;
        let mut queue = SignalQueue::new();
        let mut meter = StepMeter::new();
        let mut program = |_rc: &mut RobotController<'_>| Step::Yield(25);
        let outcome = run_turn(&mut world, &mut queue, &mut meter, &mut program, hq).unwrap();
        assert_eq!(outcome.end, TurnEnd::Suspended);
        assert!(world.pool(Team::A).power().abs() < 1e-9);
    }

    #[test]
    fn test_actions_before_suspension_stand() {
        let balance = Balance {
            bytecode_limit: 10,
            ..Balance::default()
        };
        let mut world = world(&balance);
        world.pool_mut(Team::A).credit(50.0);
        let hq = world.hq(Team::A).unwrap().id;
        let mut queue = SignalQueue::new();
        let mut meter = StepMeter::new();
        let mut program = |rc: &mut RobotController<'_>| {
            let _ = rc.spawn(Direction::East);
            Step::Continue(4)
        };
        let outcome = run_turn(&mut world, &mut queue, &mut meter, &mut program, hq).unwrap();
        assert_eq!(outcome.end, TurnEnd::Suspended);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_run_round_counts_suspensions_and_spawns_programs() {
        let mut world = world(&Balance::default());
        let idle = Idle;
        let spinner = Spinner;
        let mut scheduler = Scheduler::new([&idle, &spinner]);
        let report = scheduler.run_round(&mut world);
        assert_eq!(report.applied, 0);
        assert_eq!(world.round(), 1);
        assert_eq!(scheduler.stats(Team::A).suspensions, 0);
        assert_eq!(scheduler.stats(Team::B).suspensions, 1);
        assert!(scheduler.stats(Team::A).yield_credit > 0.0);
        assert!(scheduler.stats(Team::B).instructions >= u64::from(Balance::default().bytecode_limit));
    }

    #[test]
    fn test_yield_after_forty_credits_sixty() {
        let balance = Balance {
            bytecode_limit: 100,
            power_per_unused_bytecode: 1.0,
            ..Balance::default()
        };
        let mut world = world(&balance);
        let hq = world.hq(Team::A).unwrap().id;
        let mut queue = SignalQueue::new();
        let mut meter = StepMeter::new();
        let mut steps = [Step::Continue(40), Step::Yield(0)].into_iter();
        let mut program = |_rc: &mut RobotController<'_>| steps.next().unwrap_or(Step::Yield(0));
        let outcome = run_turn(&mut world, &mut queue, &mut meter, &mut program, hq).unwrap();
        assert_eq!(outcome.consumed, 40);
        assert_eq!(outcome.end, TurnEnd::Yielded { credited: 60.0 });
        assert!((world.pool(Team::A).power() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_immediate_yield_credits_whole_budget() {
        let balance = Balance {
            bytecode_limit: 100,
            power_per_unused_bytecode: 0.25,
            ..Balance::default()
        };
        let mut world = world(&balance);
        let hq = world.hq(Team::A).unwrap().id;
        let mut queue = SignalQueue::new();
        let mut meter = StepMeter::new();
        let mut program = |_rc: &mut RobotController<'_>| Step::Yield(0);
        let outcome = run_turn(&mut world, &mut queue, &mut meter, &mut program, hq).unwrap();
        assert_eq!(outcome.consumed, 0);
        assert_eq!(outcome.end, TurnEnd::Yielded { credited: 25.0 });
    }

    #[test]
    fn test_spending_exactly_the_budget_then_yielding_is_not_suspension() {
        let balance = Balance {
            bytecode_limit: 100,
            ..Balance::default()
        };
        let mut world = world(&balance);
        let hq = world.hq(Team::A).unwrap().id;
        let mut queue = SignalQueue::new();
        let mut meter = StepMeter::new();
        let mut program = |_rc: &mut RobotController<'_>| Step::Yield(100);
        let outcome = run_turn(&mut world, &mut queue, &mut meter, &mut program, hq).unwrap();
        assert_eq!(outcome.end, TurnEnd::Yielded { credited: 0.0 });
    }

    #[test]
    fn test_decided_match_stops_remaining_turns() {
        let mut world = world(&Balance::default());
        let quitter = Quitter;
        let spinner = Spinner;
        let mut scheduler = Scheduler::new([&quitter, &spinner]);
        scheduler.run_round(&mut world);
        assert!(world.is_over());
        assert_eq!(scheduler.stats(Team::B).instructions, 0);
        assert_eq!(scheduler.stats(Team::B).suspensions, 0);
    }
}
