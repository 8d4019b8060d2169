//! Deterministic map generation and JSON map loading.

// Map generation uses intentional casts for coordinate/RNG operations
#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{GameMap, MapLocation, MapSetup, Team, Terrain};

/// Smallest side length the generator accepts.
pub const MIN_MAP_SIDE: i32 = 8;

/// Largest side length the generator accepts.
pub const MAX_MAP_SIDE: i32 = 256;

/// Deterministic PRNG using xorshift64.
#[derive(Debug, Clone, Copy)]
struct Rng {
    state: u64,
}

impl Rng {
    /// Create a new RNG with the given seed.
    const fn new(seed: u64) -> Self {
        // Ensure non-zero state
        let state = if seed == 0 { 0x5555_5555_5555_5555 } else { seed };
        Self { state }
    }

    /// Generate next random u64.
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate random i32 in [0, max).
    fn below(&mut self, max: i32) -> i32 {
        let Ok(max) = u64::try_from(max) else {
            return 0;
        };
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max) as i32
    }

    /// Generate random f64 in [0, 1).
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }
}

/// Error building a map.
#[derive(Debug, Error)]
pub enum MapGenError {
    /// Width or height outside the accepted range.
    #[error("invalid map dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
    },
    /// A row of a map description has the wrong length.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Row index.
        row: usize,
        /// Cells found.
        found: usize,
        /// Cells expected.
        expected: usize,
    },
    /// Unknown cell character.
    #[error("unknown cell {cell:?} at {location}")]
    UnknownCell {
        /// The character.
        cell: char,
        /// Where.
        location: MapLocation,
    },
    /// A team has no HQ or more than one.
    #[error("team {team} must have exactly one HQ, found {found}")]
    HqCount {
        /// The team.
        team: Team,
        /// HQs found.
        found: usize,
    },
    /// The two HQs cannot reach each other.
    #[error("HQs are not connected by passable ground")]
    Disconnected,
    /// Reading a map file failed.
    #[error("failed to read map: {0}")]
    Io(#[from] std::io::Error),
    /// A map file is not valid JSON.
    #[error("failed to parse map: {0}")]
    Json(#[from] serde_json::Error),
}

/// Map description as stored on disk.
///
/// Each row is a string of cells:
/// - `.` land
/// - `#` void
/// - `A` / `B` team HQ
/// - `E` encampment
/// - `M` neutral mine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDescription {
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Rows from top to bottom.
    pub rows: Vec<String>,
}

impl MapDescription {
    /// Render a setup back into rows.
    #[must_use]
    pub fn from_setup(setup: &MapSetup) -> Self {
        let encampments: BTreeSet<_> = setup.encampments.iter().copied().collect();
        let mines: BTreeSet<_> = setup.neutral_mines.iter().copied().collect();
        let rows = (0..setup.map.height())
            .map(|y| {
                (0..setup.map.width())
                    .map(|x| {
                        let loc = MapLocation::new(x, y);
                        if loc == setup.hq_a {
                            'A'
                        } else if loc == setup.hq_b {
                            'B'
                        } else if encampments.contains(&loc) {
                            'E'
                        } else if mines.contains(&loc) {
                            'M'
                        } else if setup.map.is_passable(loc) {
                            '.'
                        } else {
                            '#'
                        }
                    })
                    .collect()
            })
            .collect();
        Self { name: None, rows }
    }

    /// Build a setup from the rows.
    ///
    /// # Errors
    ///
    /// Returns an error for ragged rows, unknown cells, a missing or doubled
    /// HQ, or HQs that cannot reach each other.
    pub fn to_setup(&self) -> Result<MapSetup, MapGenError> {
        let height = self.rows.len();
        let width = self.rows.first().map_or(0, |row| row.chars().count());
        let invalid = || MapGenError::InvalidDimensions {
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
        };
        let w = i32::try_from(width).map_err(|_| invalid())?;
        let h = i32::try_from(height).map_err(|_| invalid())?;
        let mut map = GameMap::new(w, h).ok_or_else(invalid)?;

        let mut hqs: [Vec<MapLocation>; 2] = [Vec::new(), Vec::new()];
        let mut encampments = Vec::new();
        let mut neutral_mines = Vec::new();
        for (row, (line, y)) in self.rows.iter().zip(0..).enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(MapGenError::RaggedRow {
                    row,
                    found,
                    expected: width,
                });
            }
            for (x, cell) in (0..).zip(line.chars()) {
                let location = MapLocation::new(x, y);
                match cell {
                    '.' => {}
                    '#' => {
                        map.set_terrain(location, Terrain::Void);
                    }
                    'A' => hqs[0].push(location),
                    'B' => hqs[1].push(location),
                    'E' => encampments.push(location),
                    'M' => neutral_mines.push(location),
                    _ => return Err(MapGenError::UnknownCell { cell, location }),
                }
            }
        }

        let [hq_a, hq_b] = [Team::A, Team::B].map(|team| {
            let found = &hqs[usize::from(team == Team::B)];
            match found.as_slice() {
                [loc] => Ok(*loc),
                _ => Err(MapGenError::HqCount {
                    team,
                    found: found.len(),
                }),
            }
        });
        let (hq_a, hq_b) = (hq_a?, hq_b?);
        if !connected(&map, hq_a, hq_b) {
            return Err(MapGenError::Disconnected);
        }
        Ok(MapSetup {
            map,
            hq_a,
            hq_b,
            encampments,
            neutral_mines,
        })
    }
}

/// Parse a JSON map description.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or the map is invalid.
pub fn parse_map_json(json: &str) -> Result<MapSetup, MapGenError> {
    let description: MapDescription = serde_json::from_str(json)?;
    description.to_setup()
}

/// Load a JSON map description from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not describe a valid map.
pub fn load_map_file(path: impl AsRef<Path>) -> Result<MapSetup, MapGenError> {
    let json = std::fs::read_to_string(path)?;
    parse_map_json(&json)
}

/// Generate a point-symmetric map with both HQs, encampments and mines.
///
/// # Arguments
///
/// * `seed` - Random seed for deterministic generation
/// * `width` - Map width in cells
/// * `height` - Map height in cells
///
/// # Errors
///
/// Returns an error if dimensions are out of range.
pub fn generate_map(seed: u64, width: i32, height: i32) -> Result<MapSetup, MapGenError> {
    let range = MIN_MAP_SIDE..=MAX_MAP_SIDE;
    if !range.contains(&width) || !range.contains(&height) {
        return Err(MapGenError::InvalidDimensions { width, height });
    }
    let mut rng = Rng::new(seed);
    let mut map =
        GameMap::new(width, height).ok_or(MapGenError::InvalidDimensions { width, height })?;
    let mirror = |loc: MapLocation| MapLocation::new(width - 1 - loc.x, height - 1 - loc.y);

    // HQ in the top-left fifth, mirrored for B
    let hq_a = MapLocation::new(
        1 + rng.below((width / 5).max(1)),
        1 + rng.below((height / 5).max(1)),
    );
    let hq_b = mirror(hq_a);

    // Cells near an HQ stay clear of every feature
    let reserved = |loc: MapLocation| {
        loc.distance_squared_to(hq_a) <= 8 || loc.distance_squared_to(hq_b) <= 8
    };

    generate_void(&mut map, &mut rng, &reserved, mirror);
    if !connected(&map, hq_a, hq_b) {
        for (loc, _) in map.iter().collect::<Vec<_>>() {
            map.set_terrain(loc, Terrain::Land);
        }
    }

    let mut taken: BTreeSet<MapLocation> = [hq_a, hq_b].into_iter().collect();
    let area = width * height;
    let encampments = place_pairs(&map, &mut rng, area / 40, &reserved, mirror, &mut taken);
    let neutral_mines = place_pairs(&map, &mut rng, area / 30, &reserved, mirror, &mut taken);

    Ok(MapSetup {
        map,
        hq_a,
        hq_b,
        encampments,
        neutral_mines,
    })
}

/// Scatter void on ~8% of the first half of the map, mirrored.
fn generate_void(
    map: &mut GameMap,
    rng: &mut Rng,
    reserved: &impl Fn(MapLocation) -> bool,
    mirror: impl Fn(MapLocation) -> MapLocation,
) {
    let half: Vec<MapLocation> = map
        .iter()
        .map(|(loc, _)| loc)
        .filter(|&loc| loc <= mirror(loc))
        .collect();
    for loc in half {
        if !reserved(loc) && rng.next_f64() < 0.08 {
            map.set_terrain(loc, Terrain::Void);
            map.set_terrain(mirror(loc), Terrain::Void);
        }
    }
}

/// Pick up to `pairs` symmetric pairs of free land cells.
fn place_pairs(
    map: &GameMap,
    rng: &mut Rng,
    pairs: i32,
    reserved: &impl Fn(MapLocation) -> bool,
    mirror: impl Fn(MapLocation) -> MapLocation,
    taken: &mut BTreeSet<MapLocation>,
) -> Vec<MapLocation> {
    let mut placed = Vec::new();
    let mut attempts = pairs * 8;
    let mut remaining = pairs;
    while remaining > 0 && attempts > 0 {
        attempts -= 1;
        let loc = MapLocation::new(rng.below(map.width()), rng.below(map.height()));
        let twin = mirror(loc);
        if loc == twin
            || reserved(loc)
            || !map.is_passable(loc)
            || taken.contains(&loc)
            || taken.contains(&twin)
        {
            continue;
        }
        taken.insert(loc);
        taken.insert(twin);
        placed.push(loc);
        placed.push(twin);
        remaining -= 1;
    }
    placed
}

/// Whether `to` is reachable from `from` over passable cells.
fn connected(map: &GameMap, from: MapLocation, to: MapLocation) -> bool {
    if !map.is_passable(from) || !map.is_passable(to) {
        return false;
    }
    let mut seen = BTreeSet::from([from]);
    let mut frontier = VecDeque::from([from]);
    while let Some(loc) = frontier.pop_front() {
        if loc == to {
            return true;
        }
        for next in loc.neighbours() {
            if map.is_passable(next) && seen.insert(next) {
                frontier.push_back(next);
            }
        }
    }
    false
}
