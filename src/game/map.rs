//! Map locations, directions and terrain.

use serde::{Deserialize, Serialize};

/// A cell on the map.
///
/// Coordinates are signed so that stepping off the edge produces a location
/// that [`GameMap::in_bounds`] rejects rather than wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapLocation {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl MapLocation {
    /// Create a new location.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another location, saturating at `i32::MAX`.
    #[must_use]
    pub const fn distance_squared_to(self, other: MapLocation) -> i32 {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// The adjacent location in the given direction.
    ///
    /// `None` and `Omni` return the location itself.
    #[must_use]
    pub const fn add(self, dir: Direction) -> MapLocation {
        let (dx, dy) = dir.delta();
        MapLocation::new(self.x + dx, self.y + dy)
    }

    /// The compass direction that best approaches `target`.
    ///
    /// Returns [`Direction::Omni`] when `target` is this location.
    #[must_use]
    pub fn direction_to(self, target: MapLocation) -> Direction {
        let dx = (target.x - self.x).signum();
        let dy = (target.y - self.y).signum();
        Direction::from_delta(dx, dy)
    }

    /// The eight neighbouring locations (may lie off the map).
    #[must_use]
    pub fn neighbours(self) -> [MapLocation; 8] {
        Direction::COMPASS.map(|d| self.add(d))
    }
}

impl std::fmt::Display for MapLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A compass direction, plus the two non-moving pseudo-directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards negative y.
    North,
    /// Towards negative y, positive x.
    NorthEast,
    /// Towards positive x.
    East,
    /// Towards positive y, positive x.
    SouthEast,
    /// Towards positive y.
    South,
    /// Towards positive y, negative x.
    SouthWest,
    /// Towards negative x.
    West,
    /// Towards negative y, negative x.
    NorthWest,
    /// No direction.
    None,
    /// Every direction at once.
    Omni,
}

impl Direction {
    /// The eight movement directions in clockwise order starting north.
    pub const COMPASS: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Offset applied by [`MapLocation::add`].
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
            Direction::None | Direction::Omni => (0, 0),
        }
    }

    fn from_delta(dx: i32, dy: i32) -> Direction {
        match (dx, dy) {
            (0, -1) => Direction::North,
            (1, -1) => Direction::NorthEast,
            (1, 0) => Direction::East,
            (1, 1) => Direction::SouthEast,
            (0, 1) => Direction::South,
            (-1, 1) => Direction::SouthWest,
            (-1, 0) => Direction::West,
            (-1, -1) => Direction::NorthWest,
            _ => Direction::Omni,
        }
    }

    /// Whether this direction moves along both axes.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NorthEast | Direction::SouthEast | Direction::SouthWest | Direction::NorthWest
        )
    }

    /// Whether this is one of the eight movement directions.
    #[must_use]
    pub const fn is_compass(self) -> bool {
        !matches!(self, Direction::None | Direction::Omni)
    }

    /// Rotate 45 degrees clockwise. Pseudo-directions are unchanged.
    #[must_use]
    pub fn rotate_right(self) -> Direction {
        self.rotate(1)
    }

    /// Rotate 45 degrees counter-clockwise. Pseudo-directions are unchanged.
    #[must_use]
    pub fn rotate_left(self) -> Direction {
        self.rotate(7)
    }

    /// The opposite direction.
    #[must_use]
    pub fn opposite(self) -> Direction {
        self.rotate(4)
    }

    fn rotate(self, steps: usize) -> Direction {
        match Self::COMPASS.iter().position(|&d| d == self) {
            Some(idx) => Self::COMPASS[(idx + steps) % 8],
            None => self,
        }
    }
}

/// Static terrain of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Walkable ground.
    Land,
    /// Impassable off-map style void.
    Void,
}

impl Terrain {
    /// Whether units may stand here.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        matches!(self, Terrain::Land)
    }
}

/// The static terrain grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMap {
    width: i32,
    height: i32,
    /// Terrain in row-major order.
    terrain: Vec<Terrain>,
}

impl GameMap {
    /// Create a map filled with land.
    ///
    /// Returns `None` if either dimension is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Option<Self> {
        if width <= 0 || height <= 0 {
            return None;
        }
        let size = usize::try_from(width).ok()? * usize::try_from(height).ok()?;
        Some(Self {
            width,
            height,
            terrain: vec![Terrain::Land; size],
        })
    }

    /// Map width in cells.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Map height in cells.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Whether a location lies on the map.
    #[must_use]
    pub const fn in_bounds(&self, loc: MapLocation) -> bool {
        loc.x >= 0 && loc.y >= 0 && loc.x < self.width && loc.y < self.height
    }

    fn index(&self, loc: MapLocation) -> Option<usize> {
        if !self.in_bounds(loc) {
            return None;
        }
        usize::try_from(loc.y * self.width + loc.x).ok()
    }

    /// Terrain at a location, `None` when off the map.
    #[must_use]
    pub fn terrain(&self, loc: MapLocation) -> Option<Terrain> {
        self.index(loc).map(|idx| self.terrain[idx])
    }

    /// Set terrain at a location. Returns `false` if off the map.
    pub fn set_terrain(&mut self, loc: MapLocation, terrain: Terrain) -> bool {
        match self.index(loc) {
            Some(idx) => {
                self.terrain[idx] = terrain;
                true
            }
            None => false,
        }
    }

    /// Whether a location is on the map and walkable.
    #[must_use]
    pub fn is_passable(&self, loc: MapLocation) -> bool {
        self.terrain(loc).is_some_and(Terrain::is_passable)
    }

    /// Iterate over every location and its terrain.
    pub fn iter(&self) -> impl Iterator<Item = (MapLocation, Terrain)> + '_ {
        let width = self.width;
        self.terrain.iter().zip(0..).map(move |(&terrain, idx): (&Terrain, i32)| {
            (MapLocation::new(idx % width, idx / width), terrain)
        })
    }

    /// Every on-map location within `radius_squared` of `center`.
    pub fn locations_within(
        &self,
        center: MapLocation,
        radius_squared: i32,
    ) -> impl Iterator<Item = MapLocation> + '_ {
        let reach = isqrt(radius_squared);
        (center.y - reach..=center.y + reach)
            .flat_map(move |y| (center.x - reach..=center.x + reach).map(move |x| MapLocation::new(x, y)))
            .filter(move |&loc| self.in_bounds(loc) && center.distance_squared_to(loc) <= radius_squared)
    }
}

/// Integer square root, floored.
fn isqrt(value: i32) -> i32 {
    if value <= 0 {
        return 0;
    }
    let mut root = 0;
    while (root + 1) * (root + 1) <= value {
        root += 1;
    }
    root
}
