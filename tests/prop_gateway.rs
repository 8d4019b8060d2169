//! Property-based tests for the action gateway and round resolution.
//!
//! Run with: cargo test --release prop_gateway

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use bytewar::game::invariants::check_invariants;
use bytewar::game::{
    end_round, unused_compute_reward, ActionClass, Balance, Direction, GameMap, MapLocation,
    MapSetup, RobotController, SignalQueue, Team, UnitType, Upgrade, WorldState,
};
use bytewar::{ActionResult, ErrorKind};

/// One gateway call.
#[derive(Debug, Clone)]
enum Call {
    Move(usize),
    Spawn(usize),
    Capture(usize),
    Research(usize),
    LayMine,
    Defuse(i32, i32),
    Scan,
    Broadcast(i64, i64),
    Read(i64),
    Memory(usize, i64),
}

fn call_strategy() -> impl Strategy<Value = Call> {
    prop_oneof![
        (0usize..8).prop_map(Call::Move),
        (0usize..8).prop_map(Call::Spawn),
        (0usize..UnitType::ALL.len()).prop_map(Call::Capture),
        (0usize..Upgrade::ALL.len()).prop_map(Call::Research),
        Just(Call::LayMine),
        (-3i32..4, -3i32..4).prop_map(|(dx, dy)| Call::Defuse(dx, dy)),
        Just(Call::Scan),
        (-5i64..70_000, any::<i64>()).prop_map(|(c, v)| Call::Broadcast(c, v)),
        (-5i64..70_000).prop_map(Call::Read),
        (0usize..40, any::<i64>()).prop_map(|(i, v)| Call::Memory(i, v)),
    ]
}

fn apply(rc: &mut RobotController<'_>, call: &Call) -> ActionResult<()> {
    match *call {
        Call::Move(d) => rc.move_to(Direction::COMPASS[d]),
        Call::Spawn(d) => rc.spawn(Direction::COMPASS[d]),
        Call::Capture(k) => rc.capture_encampment(UnitType::ALL[k]),
        Call::Research(u) => rc.research_upgrade(Upgrade::ALL[u]),
        Call::LayMine => rc.lay_mine(),
        Call::Defuse(dx, dy) => {
            let here = rc.location().unwrap();
            rc.defuse_mine(MapLocation::new(here.x + dx, here.y + dy))
        }
        Call::Scan => rc.scan_mines(),
        Call::Broadcast(c, v) => rc.broadcast(c, v),
        Call::Read(c) => rc.read_broadcast(c).map(|_| ()),
        Call::Memory(i, v) => rc.set_team_memory(i, v),
    }
}

fn world(seed: u64) -> WorldState {
    let mut map = GameMap::new(12, 12).unwrap();
    map.set_terrain(MapLocation::new(6, 5), bytewar::game::Terrain::Void);
    map.set_terrain(MapLocation::new(5, 6), bytewar::game::Terrain::Void);
    let setup = MapSetup {
        map,
        hq_a: MapLocation::new(1, 1),
        hq_b: MapLocation::new(10, 10),
        encampments: vec![MapLocation::new(3, 3), MapLocation::new(8, 8)],
        neutral_mines: vec![MapLocation::new(4, 4), MapLocation::new(7, 7)],
    };
    let mut world = WorldState::new(setup, Balance::default(), seed).unwrap();
    world.pool_mut(Team::A).credit(60.0);
    world.pool_mut(Team::B).credit(60.0);
    for (team, x, y) in [(Team::A, 3, 3), (Team::A, 2, 4), (Team::B, 8, 8), (Team::B, 9, 7)] {
        world.add_unit(team, UnitType::Soldier, MapLocation::new(x, y));
    }
    world
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A rejected call never touches the team pool or the queue.
    #[test]
    fn prop_rejection_is_side_effect_free(
        seed in any::<u64>(),
        calls in prop::collection::vec((0usize..6, call_strategy()), 1..40)
    ) {
        let mut world = world(seed);
        let mut queue = SignalQueue::new();
        for (pick, call) in &calls {
            let ids = world.unit_ids();
            let id = ids[pick % ids.len()];
            let team = world.unit(id).unwrap().team;
            let power_before = world.pool(team).power();
            let queued_before = queue.len();
            let mut rc = RobotController::new(&mut world, &mut queue, id).unwrap();
            let result = apply(&mut rc, call);
            if result.is_err() {
                prop_assert!((world.pool(team).power() - power_before).abs() < 1e-9);
                prop_assert_eq!(queue.len(), queued_before);
            } else {
                prop_assert!(world.pool(team).power() <= power_before + 1e-9);
            }
        }
    }

    /// Movement is accepted iff the movement counter is zero, and sets it.
    #[test]
    fn prop_movement_counter_gates_moves(
        dirs in prop::collection::vec(0usize..8, 1..20),
        rounds_between in prop::collection::vec(0usize..4, 1..20)
    ) {
        let mut world = world(3);
        let mut queue = SignalQueue::new();
        let id = world.unit_at(MapLocation::new(2, 4)).unwrap().id;
        let stats = *world.balance().stats(UnitType::Soldier);
        for (d, wait) in dirs.iter().zip(rounds_between.iter().cycle()) {
            let Some(unit) = world.unit(id) else { break };
            let idle = unit.activity.is_idle(ActionClass::Movement);
            let dir = Direction::COMPASS[*d];
            let mut rc = RobotController::new(&mut world, &mut queue, id).unwrap();
            match rc.move_to(dir) {
                Ok(()) => {
                    prop_assert!(idle);
                    let expected = if dir.is_diagonal() {
                        stats.move_delay_diagonal
                    } else {
                        stats.move_delay_orthogonal
                    };
                    prop_assert_eq!(rc.rounds_until_idle(ActionClass::Movement), expected);
                }
                Err(e) if !idle => prop_assert_eq!(e.kind, ErrorKind::AlreadyActive),
                Err(_) => {}
            }
            for _ in 0..*wait {
                end_round(&mut world, &mut queue);
            }
        }
    }

    /// Yield credit is the rate times the unused budget and never negative.
    #[test]
    fn prop_yield_credit(limit in 0u32..100_000, consumed in 0u32..200_000, rate in 0.0f64..1.0) {
        let balance = Balance {
            power_per_unused_bytecode: rate,
            ..Balance::default()
        };
        let credit = unused_compute_reward(&balance, limit, consumed);
        prop_assert!(credit >= 0.0);
        let expected = rate * f64::from(limit.saturating_sub(consumed));
        prop_assert!((credit - expected).abs() < 1e-6);
    }

    /// Random play never breaks the world's bookkeeping.
    #[test]
    fn prop_rounds_preserve_invariants(
        seed in any::<u64>(),
        rounds in prop::collection::vec(
            prop::collection::vec((0usize..8, call_strategy()), 0..12),
            1..8
        )
    ) {
        let mut world = world(seed);
        let mut queue = SignalQueue::new();
        for calls in &rounds {
            for (pick, call) in calls {
                let ids = world.unit_ids();
                if ids.is_empty() {
                    break;
                }
                let id = ids[pick % ids.len()];
                if let Some(mut rc) = RobotController::new(&mut world, &mut queue, id) {
                    let _ = apply(&mut rc, call);
                }
            }
            end_round(&mut world, &mut queue);
            let violations = check_invariants(&world);
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }
    }

    /// Team vision is the union of every teammate's sensor disc.
    #[test]
    fn prop_team_vision_is_union(x in 0i32..12, y in 0i32..12) {
        let mut world = world(9);
        let mut queue = SignalQueue::new();
        let loc = MapLocation::new(x, y);
        let expected = world.units().filter(|u| u.team == Team::A).any(|u| {
            u.location.distance_squared_to(loc) <= world.sensor_radius_squared(Team::A, u.unit_type)
        });
        let hq = world.hq(Team::A).unwrap().id;
        let rc = RobotController::new(&mut world, &mut queue, hq).unwrap();
        prop_assert_eq!(rc.can_sense_square(loc), expected);
    }
}
