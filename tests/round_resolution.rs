//! Round-resolution scenarios driven through the public gateway.
//!
//! Each test sets up a small world, issues gateway calls for one or more
//! units, ends the round and checks the resolved state.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use bytewar::game::invariants::check_invariants;
use bytewar::game::{
    end_round, ActionClass, Balance, Direction, EncampmentState, EndReason, GameMap,
    MapLocation, MapSetup, ResearchRounds, RobotController, SignalQueue, Team, UnitId, UnitStats,
    UnitType, Upgrade, WorldState,
};
use bytewar::ErrorKind;

fn setup(encampments: Vec<MapLocation>) -> MapSetup {
    MapSetup {
        map: GameMap::new(16, 16).unwrap(),
        hq_a: MapLocation::new(1, 1),
        hq_b: MapLocation::new(14, 14),
        encampments,
        neutral_mines: Vec::new(),
    }
}

fn world(balance: &Balance) -> WorldState {
    WorldState::new(setup(vec![MapLocation::new(6, 6)]), *balance, 42).unwrap()
}

/// Run `f` as the turn of `unit`.
fn turn<R>(
    world: &mut WorldState,
    queue: &mut SignalQueue,
    unit: UnitId,
    f: impl FnOnce(&mut RobotController<'_>) -> R,
) -> R {
    let mut rc = RobotController::new(world, queue, unit).unwrap();
    f(&mut rc)
}

fn soldier(world: &mut WorldState, team: Team, x: i32, y: i32) -> UnitId {
    world
        .add_unit(team, UnitType::Soldier, MapLocation::new(x, y))
        .unwrap()
}

#[test]
fn test_contested_move_first_in_order_wins() {
    let mut world = world(&Balance::default());
    let first = soldier(&mut world, Team::A, 4, 4);
    let second = soldier(&mut world, Team::A, 6, 4);
    let mut queue = SignalQueue::new();

    turn(&mut world, &mut queue, first, |rc| rc.move_to(Direction::East)).unwrap();
    turn(&mut world, &mut queue, second, |rc| rc.move_to(Direction::West)).unwrap();
    let report = end_round(&mut world, &mut queue);

    assert_eq!(world.unit(first).unwrap().location, MapLocation::new(5, 4));
    assert_eq!(world.unit(second).unwrap().location, MapLocation::new(6, 4));
    assert_eq!(report.stale, 1);
    // The loser still paid its cooldown
    let loser = world.unit(second).unwrap();
    assert!(loser.activity.remaining(ActionClass::Movement) > 0);
    assert!(check_invariants(&world).is_empty());
}

#[test]
fn test_move_into_occupied_cell_rejected_without_charge() {
    let mut world = world(&Balance::default());
    let mover = soldier(&mut world, Team::A, 4, 4);
    soldier(&mut world, Team::B, 5, 4);
    world.pool_mut(Team::A).credit(30.0);
    let mut queue = SignalQueue::new();

    let err = turn(&mut world, &mut queue, mover, |rc| rc.move_to(Direction::East)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DestinationOccupiedOrBlocked);
    assert!((world.pool(Team::A).power() - 30.0).abs() < 1e-9);
    assert!(queue.is_empty());
}

#[test]
fn test_spawn_appears_after_resolution() {
    let mut world = world(&Balance::default());
    world.pool_mut(Team::A).credit(50.0);
    let hq = world.hq(Team::A).unwrap().id;
    let mut queue = SignalQueue::new();

    turn(&mut world, &mut queue, hq, |rc| rc.spawn(Direction::SouthEast)).unwrap();
    assert!(world.unit_at(MapLocation::new(2, 2)).is_none());
    let report = end_round(&mut world, &mut queue);

    assert_eq!(report.spawned[Team::A], 1);
    let spawned = world.unit_at(MapLocation::new(2, 2)).unwrap();
    assert_eq!(spawned.unit_type, UnitType::Soldier);
    assert_eq!(spawned.team, Team::A);
}

#[test]
fn test_second_concurrent_capture_costs_double() {
    let balance = Balance {
        capture_cost: 10.0,
        ..Balance::default()
    };
    let mut world = WorldState::new(
        setup(vec![MapLocation::new(6, 6), MapLocation::new(9, 9)]),
        balance,
        1,
    )
    .unwrap();
    let a = soldier(&mut world, Team::A, 6, 6);
    let b = soldier(&mut world, Team::A, 9, 9);
    world.pool_mut(Team::A).credit(100.0);
    let mut queue = SignalQueue::new();

    turn(&mut world, &mut queue, a, |rc| rc.capture_encampment(UnitType::Generator)).unwrap();
    assert!((world.pool(Team::A).power() - 90.0).abs() < 1e-9);
    turn(&mut world, &mut queue, b, |rc| rc.capture_encampment(UnitType::Supplier)).unwrap();
    assert!((world.pool(Team::A).power() - 70.0).abs() < 1e-9);

    end_round(&mut world, &mut queue);
    assert!(matches!(
        world.encampment(MapLocation::new(6, 6)),
        Some(EncampmentState::Capturing { team: Team::A, .. })
    ));
}

#[test]
fn test_capture_completes_into_encampment_unit() {
    let balance = Balance {
        capture_delay: 3,
        ..Balance::default()
    };
    let mut world = world(&balance);
    let capturer = soldier(&mut world, Team::A, 6, 6);
    world.pool_mut(Team::A).credit(50.0);
    let mut queue = SignalQueue::new();

    turn(&mut world, &mut queue, capturer, |rc| {
        rc.capture_encampment(UnitType::Generator)
    })
    .unwrap();
    end_round(&mut world, &mut queue);
    end_round(&mut world, &mut queue);
    assert!(world.unit(capturer).is_some());
    let report = end_round(&mut world, &mut queue);

    assert_eq!(report.captures_completed, 1);
    assert!(world.unit(capturer).is_none());
    let generator = world.unit_at(MapLocation::new(6, 6)).unwrap();
    assert_eq!(generator.unit_type, UnitType::Generator);
    assert_eq!(world.owned_encampments(Team::A), 1);
    assert!(check_invariants(&world).is_empty());
}

#[test]
fn test_broadcast_visible_to_writer_then_everyone() {
    let balance = Balance {
        broadcast_send_cost: 2.0,
        broadcast_read_cost: 1.0,
        ..Balance::default()
    };
    let mut world = world(&balance);
    let writer = soldier(&mut world, Team::A, 4, 4);
    let reader = soldier(&mut world, Team::B, 10, 10);
    world.pool_mut(Team::A).credit(10.0);
    world.pool_mut(Team::B).credit(10.0);
    let mut queue = SignalQueue::new();

    let own = turn(&mut world, &mut queue, writer, |rc| {
        rc.broadcast(77, 1234).unwrap();
        rc.read_broadcast(77).unwrap()
    });
    assert_eq!(own, 1234);
    assert!((world.pool(Team::A).power() - 7.0).abs() < 1e-9);
    let before = turn(&mut world, &mut queue, reader, |rc| rc.read_broadcast(77).unwrap());
    assert_eq!(before, 0);

    end_round(&mut world, &mut queue);
    let b_power = world.pool(Team::B).power();
    let after = turn(&mut world, &mut queue, reader, |rc| rc.read_broadcast(77).unwrap());
    assert_eq!(after, 1234);
    assert!((world.pool(Team::B).power() - (b_power - 1.0)).abs() < 1e-9);
}

#[test]
fn test_out_of_range_channel_charges_nothing() {
    let mut world = world(&Balance::default());
    let unit = soldier(&mut world, Team::A, 4, 4);
    world.pool_mut(Team::A).credit(50.0);
    let mut queue = SignalQueue::new();

    let err = turn(&mut world, &mut queue, unit, |rc| rc.read_broadcast(-1)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ChannelOutOfRange);
    let err = turn(&mut world, &mut queue, unit, |rc| rc.broadcast(1_000_000, 5)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ChannelOutOfRange);
    assert!((world.pool(Team::A).power() - 50.0).abs() < 1e-9);
}

#[test]
fn test_enemy_mine_hidden_until_scanned() {
    let balance = Balance {
        scan_cost: 0.0,
        ..Balance::default()
    };
    let mut world = world(&balance);
    let scout = soldier(&mut world, Team::A, 4, 4);
    world.lay_mine(MapLocation::new(5, 5), Team::B);
    world.upgrades_mut(Team::A).grant(Upgrade::MineDetector);
    let mut queue = SignalQueue::new();

    let seen = turn(&mut world, &mut queue, scout, |rc| rc.sense_mine(MapLocation::new(5, 5)));
    assert_eq!(seen, None);

    turn(&mut world, &mut queue, scout, |rc| rc.scan_mines()).unwrap();
    end_round(&mut world, &mut queue);
    let seen = turn(&mut world, &mut queue, scout, |rc| rc.sense_mine(MapLocation::new(5, 5)));
    assert_eq!(seen, Some(Team::B));
}

#[test]
fn test_hq_destroyed_ends_match() {
    let balance = Balance {
        hq: UnitStats {
            max_energon: 5.0,
            ..Balance::default().hq
        },
        ..Balance::default()
    };
    let mut world = world(&balance);
    soldier(&mut world, Team::A, 13, 13);
    let mut queue = SignalQueue::new();

    end_round(&mut world, &mut queue);
    let outcome = world.outcome().unwrap();
    assert_eq!((outcome.winner, outcome.reason), (Team::A, EndReason::HqDestroyed));
    assert!(world.hq(Team::B).is_none());
}

#[test]
fn test_nuke_research_wins() {
    let balance = Balance {
        research_rounds: ResearchRounds {
            nuke: 2,
            ..Default::default()
        },
        ..Balance::default()
    };
    let mut world = world(&balance);
    let hq = world.hq(Team::B).unwrap().id;
    let mut queue = SignalQueue::new();

    for _ in 0..2 {
        turn(&mut world, &mut queue, hq, |rc| rc.research_upgrade(Upgrade::Nuke)).unwrap();
        end_round(&mut world, &mut queue);
    }
    let outcome = world.outcome().unwrap();
    assert_eq!(outcome.winner, Team::B);
    assert_eq!(outcome.reason, EndReason::Nuke);
}
