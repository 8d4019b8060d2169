//! Fog of war.
//!
//! Vision is shared by a team: a cell is sensible by a unit when any live
//! teammate (the unit included) is within the *querying* unit's sensor radius
//! of it. Distances are squared Euclidean with no occlusion.
//!
//! Some information is global regardless of vision: both HQ locations, every
//! encampment cell, a team's own mines, and enemy mines the team has revealed.

use crate::game::{Balance, MapLocation, Team, Unit, UnitType, Upgrade, UpgradeBook, WorldState};

/// Sensor radius² for a unit type given a team's research.
#[must_use]
pub fn sensor_radius_squared(balance: &Balance, upgrades: &UpgradeBook, unit_type: UnitType) -> i32 {
    let base = balance.stats(unit_type).sensor_radius_squared;
    if upgrades.has(Upgrade::Vision) {
        base + balance.vision_bonus
    } else {
        base
    }
}

/// Whether `team` can see `loc` using `radius_squared` around each teammate.
#[must_use]
pub fn team_can_sense(world: &WorldState, team: Team, radius_squared: i32, loc: MapLocation) -> bool {
    world.map().in_bounds(loc)
        && world
            .units()
            .any(|u| u.team == team && u.location.distance_squared_to(loc) <= radius_squared)
}

/// Whether a particular unit can sense `loc`.
#[must_use]
pub fn unit_can_sense(world: &WorldState, viewer: &Unit, loc: MapLocation) -> bool {
    if !world.map().in_bounds(loc) {
        return false;
    }
    let radius = world.sensor_radius_squared(viewer.team, viewer.unit_type);
    viewer.location.distance_squared_to(loc) <= radius || team_can_sense(world, viewer.team, radius, loc)
}

/// What a team may learn about the mine on a cell.
///
/// Own mines and revealed enemy mines are always visible. Neutral mines need
/// vision. Unrevealed enemy mines are never visible.
#[must_use]
pub fn visible_mine(world: &WorldState, viewer: &Unit, loc: MapLocation) -> Option<Team> {
    let owner = world.mine_at(loc)?;
    if owner == viewer.team {
        return Some(owner);
    }
    if owner == Team::Neutral {
        return unit_can_sense(world, viewer, loc).then_some(owner);
    }
    world.known_mines(viewer.team).contains(&loc).then_some(owner)
}

/// Predicate for nearby-unit queries.
///
/// Every field narrows the result; the default matches every sensible unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenseFilter {
    /// Only units within this squared distance of the viewer.
    pub radius_squared: Option<i32>,
    /// Only units of this team.
    pub team: Option<Team>,
    /// Only units of this type.
    pub unit_type: Option<UnitType>,
    /// Only units that are encampments (`true`) or are not (`false`).
    pub encampment: Option<bool>,
}

impl SenseFilter {
    /// Restrict to a radius.
    #[must_use]
    pub const fn within(mut self, radius_squared: i32) -> Self {
        self.radius_squared = Some(radius_squared);
        self
    }

    /// Restrict to a team.
    #[must_use]
    pub const fn team(mut self, team: Team) -> Self {
        self.team = Some(team);
        self
    }

    /// Restrict to a unit type.
    #[must_use]
    pub const fn of_type(mut self, unit_type: UnitType) -> Self {
        self.unit_type = Some(unit_type);
        self
    }

    /// Restrict to encampments or non-encampments.
    #[must_use]
    pub const fn encampments(mut self, encampment: bool) -> Self {
        self.encampment = Some(encampment);
        self
    }

    /// Whether `unit` passes the filter when seen from `origin`.
    #[must_use]
    pub fn matches(&self, origin: MapLocation, unit: &Unit) -> bool {
        self.radius_squared
            .is_none_or(|r| origin.distance_squared_to(unit.location) <= r)
            && self.team.is_none_or(|t| unit.team == t)
            && self.unit_type.is_none_or(|t| unit.unit_type == t)
            && self
                .encampment
                .is_none_or(|e| unit.unit_type.is_encampment() == e)
    }
}

/// Units other than the viewer that it can sense and that pass the filter,
/// in ascending id order.
pub fn nearby_units<'w>(
    world: &'w WorldState,
    viewer: &'w Unit,
    filter: SenseFilter,
) -> impl Iterator<Item = &'w Unit> + 'w {
    world.units().filter(move |u| {
        u.id != viewer.id && filter.matches(viewer.location, u) && unit_can_sense(world, viewer, u.location)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameMap, MapSetup};

    fn world() -> WorldState {
        let setup = MapSetup {
            map: GameMap::new(40, 40).unwrap(),
            hq_a: MapLocation::new(0, 0),
            hq_b: MapLocation::new(39, 39),
            encampments: Vec::new(),
            neutral_mines: vec![MapLocation::new(20, 20)],
        };
        WorldState::new(setup, Balance::default(), 7).unwrap()
    }

    #[test]
    fn test_vision_bonus() {
        let balance = Balance::default();
        let mut book = UpgradeBook::default();
        let base = sensor_radius_squared(&balance, &book, UnitType::Soldier);
        book.grant(Upgrade::Vision);
        assert_eq!(
            sensor_radius_squared(&balance, &book, UnitType::Soldier),
            base + balance.vision_bonus
        );
    }

    #[test]
    fn test_team_vision_is_union() {
        let mut world = world();
        let near = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(1, 0)).unwrap();
        let target = MapLocation::new(20, 18);
        let viewer = world.unit(near).unwrap().clone();
        assert!(!unit_can_sense(&world, &viewer, target));

        world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(20, 17)).unwrap();
        let viewer = world.unit(near).unwrap().clone();
        assert!(unit_can_sense(&world, &viewer, target));
    }

    #[test]
    fn test_off_map_cells_are_never_sensible() {
        let world = world();
        let hq = world.hq(Team::A).unwrap().clone();
        assert!(!unit_can_sense(&world, &hq, MapLocation::new(60_000, 0)));
        assert!(!unit_can_sense(&world, &hq, MapLocation::new(-1, 0)));
        assert!(!team_can_sense(&world, Team::A, i32::MAX, MapLocation::new(i32::MIN, 0)));
    }

    #[test]
    fn test_unknown_enemy_mine_hidden_even_adjacent() {
        let mut world = world();
        let soldier = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(10, 10)).unwrap();
        let mine = MapLocation::new(10, 11);
        world.lay_mine(mine, Team::B);

        let viewer = world.unit(soldier).unwrap().clone();
        assert_eq!(visible_mine(&world, &viewer, mine), None);

        world.reveal_mine(Team::A, mine);
        assert_eq!(visible_mine(&world, &viewer, mine), Some(Team::B));
    }

    #[test]
    fn test_neutral_mine_needs_vision() {
        let mut world = world();
        let far = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(2, 2)).unwrap();
        let viewer = world.unit(far).unwrap().clone();
        assert_eq!(visible_mine(&world, &viewer, MapLocation::new(20, 20)), None);

        world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(19, 19)).unwrap();
        let viewer = world.unit(far).unwrap().clone();
        assert_eq!(
            visible_mine(&world, &viewer, MapLocation::new(20, 20)),
            Some(Team::Neutral)
        );
    }

    #[test]
    fn test_filter_and_nearby_units() {
        let mut world = world();
        let me = world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(5, 5)).unwrap();
        world.add_unit(Team::B, UnitType::Soldier, MapLocation::new(6, 6)).unwrap();
        world.add_unit(Team::A, UnitType::Soldier, MapLocation::new(5, 7)).unwrap();
        world.add_unit(Team::B, UnitType::Soldier, MapLocation::new(30, 30)).unwrap();

        let viewer = world.unit(me).unwrap().clone();
        let all: Vec<_> = nearby_units(&world, &viewer, SenseFilter::default()).collect();
        // HQ A at (0, 0), ally, enemy; the far enemy is out of vision.
        assert_eq!(all.len(), 3);

        let enemies: Vec<_> =
            nearby_units(&world, &viewer, SenseFilter::default().team(Team::B)).collect();
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].location, MapLocation::new(6, 6));

        let close: Vec<_> = nearby_units(&world, &viewer, SenseFilter::default().within(2)).collect();
        assert_eq!(close.len(), 1);
    }
}
