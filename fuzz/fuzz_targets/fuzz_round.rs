#![no_main]

//! Round resolution fuzzer.
//!
//! Drives random gateway calls from random units over several rounds and
//! checks the world invariants after every resolution:
//! 1. Validate and charge each call
//! 2. Resolve signals in class order
//! 3. Melee, mines, support effects and deaths
//! 4. Works in progress and the economy

use arbitrary::Arbitrary;
use bytewar::game::invariants::check_invariants;
use bytewar::game::{
    end_round, Balance, Direction, GameMap, MapLocation, MapSetup, RobotController, SignalQueue,
    Team, Terrain, UnitType, Upgrade, WorldState,
};
use libfuzzer_sys::fuzz_target;

/// A fuzzer-generated gateway call.
#[derive(Arbitrary, Debug, Clone)]
enum FuzzCall {
    Move { dir: u8 },
    Spawn { dir: u8 },
    Capture { kind: u8 },
    Research { upgrade: u8 },
    LayMine,
    Defuse { dx: i8, dy: i8 },
    Scan,
    Attack { dx: i8, dy: i8 },
    Broadcast { channel: i32, value: i64 },
    Read { channel: i32 },
    Memory { index: u8, value: i64, mask: i64 },
    Suicide,
}

/// Structured input for round fuzzing.
#[derive(Arbitrary, Debug)]
struct RoundInput {
    /// Void cells on a 12x12 map.
    voids: Vec<(u8, u8)>,
    /// Extra units per team.
    units: Vec<(bool, u8, u8, u8)>,
    /// Starting power per team.
    power: [u16; 2],
    /// Calls per round: (unit pick, call).
    rounds: Vec<Vec<(u8, FuzzCall)>>,
    /// World seed.
    seed: u64,
}

fn compass(dir: u8) -> Direction {
    Direction::COMPASS[usize::from(dir) % 8]
}

fn apply(rc: &mut RobotController<'_>, call: &FuzzCall) {
    let here = rc.location().unwrap_or(MapLocation::new(0, 0));
    let offset = |dx: i8, dy: i8| MapLocation::new(here.x + i32::from(dx), here.y + i32::from(dy));
    let _ = match *call {
        FuzzCall::Move { dir } => rc.move_to(compass(dir)),
        FuzzCall::Spawn { dir } => rc.spawn(compass(dir)),
        FuzzCall::Capture { kind } => {
            rc.capture_encampment(UnitType::ALL[usize::from(kind) % UnitType::ALL.len()])
        }
        FuzzCall::Research { upgrade } => {
            rc.research_upgrade(Upgrade::ALL[usize::from(upgrade) % Upgrade::ALL.len()])
        }
        FuzzCall::LayMine => rc.lay_mine(),
        FuzzCall::Defuse { dx, dy } => rc.defuse_mine(offset(dx, dy)),
        FuzzCall::Scan => rc.scan_mines(),
        FuzzCall::Attack { dx, dy } => rc.attack_square(offset(dx, dy)),
        FuzzCall::Broadcast { channel, value } => rc.broadcast(i64::from(channel), value),
        FuzzCall::Read { channel } => rc.read_broadcast(i64::from(channel)).map(|_| ()),
        FuzzCall::Memory { index, value, mask } => {
            rc.set_team_memory_masked(usize::from(index), value, mask)
        }
        FuzzCall::Suicide => {
            rc.suicide();
            Ok(())
        }
    };
}

fuzz_target!(|input: RoundInput| {
    let Some(mut map) = GameMap::new(12, 12) else {
        return;
    };
    let hq_a = MapLocation::new(1, 1);
    let hq_b = MapLocation::new(10, 10);
    for &(x, y) in input.voids.iter().take(30) {
        let loc = MapLocation::new(i32::from(x % 12), i32::from(y % 12));
        if loc != hq_a && loc != hq_b {
            map.set_terrain(loc, Terrain::Void);
        }
    }
    let setup = MapSetup {
        map,
        hq_a,
        hq_b,
        encampments: vec![MapLocation::new(4, 4), MapLocation::new(7, 7)],
        neutral_mines: vec![MapLocation::new(5, 6)],
    };
    let Ok(mut world) = WorldState::new(setup, Balance::default(), input.seed) else {
        return;
    };
    world.pool_mut(Team::A).credit(f64::from(input.power[0]));
    world.pool_mut(Team::B).credit(f64::from(input.power[1]));
    for &(b, kind, x, y) in input.units.iter().take(12) {
        let team = if b { Team::B } else { Team::A };
        let unit_type = UnitType::ALL[usize::from(kind) % UnitType::ALL.len()];
        let loc = MapLocation::new(i32::from(x % 12), i32::from(y % 12));
        if unit_type != UnitType::Hq {
            let _ = world.add_unit(team, unit_type, loc);
        }
    }

    let mut queue = SignalQueue::new();
    for calls in input.rounds.iter().take(20) {
        if world.is_over() {
            break;
        }
        for (pick, call) in calls.iter().take(16) {
            let ids = world.unit_ids();
            if ids.is_empty() {
                break;
            }
            let id = ids[usize::from(*pick) % ids.len()];
            if let Some(mut rc) = RobotController::new(&mut world, &mut queue, id) {
                apply(&mut rc, call);
            }
        }
        end_round(&mut world, &mut queue);

        let violations = check_invariants(&world);
        assert!(violations.is_empty(), "invariant violations: {violations:?}");
    }
});
