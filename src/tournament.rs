//! Match runner for bytewar.
//!
//! Provides a pure function interface: `(seed, strategies) -> MatchResult`
//!
//! The runner handles:
//! - Deterministic map generation (or an explicit map)
//! - Team memory load and save around the match
//! - Round scheduling until a win condition or the round limit
//! - Parallel series of matches with rayon

// Match statistics use intentional casts
#![allow(clippy::cast_precision_loss)]

mod mapgen;

pub use mapgen::{
    generate_map, load_map_file, parse_map_json, MapDescription, MapGenError, MAX_MAP_SIDE,
    MIN_MAP_SIDE,
};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::game::{
    Balance, BalanceError, EndReason, InMemoryStore, MapSetup, MemoryStoreError, PerTeam,
    SetupError, Team, TeamMemoryStore, WorldState,
};
use crate::scheduler::{Scheduler, Strategy};

/// Configuration for a match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    /// Rounds before the tiebreak decides.
    pub max_rounds: u32,
    /// Generated map width.
    pub map_width: i32,
    /// Generated map height.
    pub map_height: i32,
    /// Game constants.
    pub balance: Balance,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_rounds: 2000,
            map_width: 40,
            map_height: 40,
            balance: Balance::default(),
        }
    }
}

/// Statistics for a single team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TeamStats {
    /// Instructions charged across all turns.
    pub instructions_used: u64,
    /// Turns cut off by the compute budget.
    pub suspensions: u32,
    /// Power credited by yielding early.
    pub yield_credit: f64,
    /// Soldiers that entered play.
    pub units_spawned: u32,
    /// Power left at the end.
    pub final_power: f64,
}

/// Final result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    /// The seed used for this match.
    pub seed: u64,
    /// The winning team.
    pub winner: Team,
    /// How the match ended.
    pub reason: EndReason,
    /// Rounds played.
    pub rounds: u32,
    /// Per-team statistics, A then B.
    pub stats: [TeamStats; 2],
}

/// Error type for match setup.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Map generation or parsing failed.
    #[error("map generation failed: {0}")]
    MapGen(#[from] MapGenError),
    /// The map could not be turned into a world.
    #[error("invalid map: {0}")]
    Setup(#[from] SetupError),
    /// Loading or saving team memory failed.
    #[error("team memory store failed: {0}")]
    MemoryStore(#[from] MemoryStoreError),
    /// The balance table is inconsistent.
    #[error("invalid balance: {0}")]
    Balance(#[from] BalanceError),
}

/// Run a complete match on a generated map.
///
/// This is the main entry point - a pure function from inputs to result.
///
/// # Arguments
///
/// * `seed` - Random seed for map generation and the final coin flip
/// * `strategies` - Strategies for team A and team B
/// * `config` - Match configuration
///
/// # Determinism
///
/// Given the same seed and strategies, this function always produces
/// the same `MatchResult`.
///
/// # Errors
///
/// Returns an error if the balance is invalid or map generation fails.
pub fn run_match(
    seed: u64,
    strategies: [&dyn Strategy; 2],
    config: &MatchConfig,
) -> Result<MatchResult, MatchError> {
    let setup = generate_map(seed, config.map_width, config.map_height)?;
    run_match_with(seed, strategies, config, setup, &InMemoryStore::default())
}

/// Run a complete match on an explicit map with a team memory store.
///
/// Memory saved by a previous match is loaded before round 0 and the
/// final memory is saved once the match is decided.
///
/// # Errors
///
/// Returns an error if the balance or map is invalid, or the store fails.
pub fn run_match_with(
    seed: u64,
    strategies: [&dyn Strategy; 2],
    config: &MatchConfig,
    setup: MapSetup,
    store: &dyn TeamMemoryStore,
) -> Result<MatchResult, MatchError> {
    config.balance.validate()?;
    let mut runner = MatchRunner::new(seed, strategies, config, setup)?;
    for team in Team::PLAYERS {
        runner.world.install_memory(team, store.load(team)?);
    }
    let result = runner.run();
    for team in Team::PLAYERS {
        store.save(team, runner.world.memory(team).current())?;
    }
    Ok(result)
}

/// Aggregate over a series of matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeriesSummary {
    /// Matches that completed.
    pub games_played: u64,
    /// Matches that failed to set up.
    pub games_failed: u64,
    /// Wins for team A then team B.
    pub wins: [u64; 2],
    /// Wins by end reason, in `HqDestroyed, Resigned, Nuke, RoundLimit` order.
    pub by_reason: [u64; 4],
    /// Sum of rounds over completed matches.
    pub total_rounds: u64,
    /// Sum of per-team statistics.
    pub totals: [TeamStats; 2],
}

impl SeriesSummary {
    /// Fold one match result in.
    pub fn add_result(&mut self, result: &MatchResult) {
        self.games_played += 1;
        self.wins[usize::from(result.winner == Team::B)] += 1;
        self.by_reason[reason_index(result.reason)] += 1;
        self.total_rounds += u64::from(result.rounds);
        for (total, stats) in self.totals.iter_mut().zip(&result.stats) {
            total.instructions_used += stats.instructions_used;
            total.suspensions += stats.suspensions;
            total.yield_credit += stats.yield_credit;
            total.units_spawned += stats.units_spawned;
            total.final_power += stats.final_power;
        }
    }

    /// Merge another partial summary.
    pub fn merge(&mut self, other: &Self) {
        self.games_played += other.games_played;
        self.games_failed += other.games_failed;
        self.total_rounds += other.total_rounds;
        for i in 0..2 {
            self.wins[i] += other.wins[i];
            let (total, stats) = (&mut self.totals[i], &other.totals[i]);
            total.instructions_used += stats.instructions_used;
            total.suspensions += stats.suspensions;
            total.yield_credit += stats.yield_credit;
            total.units_spawned += stats.units_spawned;
            total.final_power += stats.final_power;
        }
        for (a, b) in self.by_reason.iter_mut().zip(other.by_reason) {
            *a += b;
        }
    }

    /// Fraction of completed matches won by a team.
    #[must_use]
    pub fn win_rate(&self, team: Team) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        self.wins[usize::from(team == Team::B)] as f64 / self.games_played as f64
    }

    /// Average match length in rounds.
    #[must_use]
    pub fn average_rounds(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        self.total_rounds as f64 / self.games_played as f64
    }
}

const fn reason_index(reason: EndReason) -> usize {
    match reason {
        EndReason::HqDestroyed => 0,
        EndReason::Resigned => 1,
        EndReason::Nuke => 2,
        EndReason::RoundLimit => 3,
    }
}

/// Run `games` matches with seeds `base_seed, base_seed + 1, ...` in parallel.
#[must_use]
pub fn run_series(
    base_seed: u64,
    games: u64,
    strategies: [&dyn Strategy; 2],
    config: &MatchConfig,
) -> SeriesSummary {
    run_series_with(base_seed, games, strategies, config, |_| {})
}

/// Like [`run_series`], calling `on_done` after every match.
pub fn run_series_with(
    base_seed: u64,
    games: u64,
    strategies: [&dyn Strategy; 2],
    config: &MatchConfig,
    on_done: impl Fn(Option<&MatchResult>) + Sync,
) -> SeriesSummary {
    // Each thread folds into its own summary; merged at the end
    (0..games)
        .into_par_iter()
        .fold(SeriesSummary::default, |mut local, i| {
            let seed = base_seed.wrapping_add(i);
            match run_match(seed, strategies, config) {
                Ok(result) => {
                    local.add_result(&result);
                    on_done(Some(&result));
                }
                Err(e) => {
                    tracing::warn!(seed, error = %e, "match failed");
                    local.games_failed += 1;
                    on_done(None);
                }
            }
            local
        })
        .reduce(SeriesSummary::default, |mut a, b| {
            a.merge(&b);
            a
        })
}

/// Drives one match from round 0 to a decision.
struct MatchRunner<'s> {
    /// World state.
    world: WorldState,
    /// Per-unit programs and turn statistics.
    scheduler: Scheduler<'s>,
    /// Round limit.
    max_rounds: u32,
    /// Original seed.
    seed: u64,
    /// Soldiers spawned per team.
    spawned: PerTeam<u32>,
}

impl<'s> MatchRunner<'s> {
    fn new(
        seed: u64,
        strategies: [&'s dyn Strategy; 2],
        config: &MatchConfig,
        setup: MapSetup,
    ) -> Result<Self, MatchError> {
        let world = WorldState::new(setup, config.balance, seed)?;
        tracing::info!(
            seed,
            a = strategies[0].name(),
            b = strategies[1].name(),
            width = world.map().width(),
            height = world.map().height(),
            "match started"
        );
        Ok(Self {
            world,
            scheduler: Scheduler::new(strategies),
            max_rounds: config.max_rounds,
            seed,
            spawned: PerTeam::default(),
        })
    }

    /// Run the match to completion.
    fn run(&mut self) -> MatchResult {
        while !self.world.is_over() {
            if self.world.round() >= self.max_rounds {
                let winner = self.world.tiebreak_winner();
                self.world.declare_winner(winner, EndReason::RoundLimit);
                break;
            }
            let report = self.scheduler.run_round(&mut self.world);
            for team in Team::PLAYERS {
                self.spawned[team] += report.spawned[team];
            }
        }
        let result = self.build_result();
        tracing::info!(
            seed = self.seed,
            winner = %result.winner,
            reason = ?result.reason,
            rounds = result.rounds,
            "match finished"
        );
        result
    }

    /// Build the final match result.
    fn build_result(&self) -> MatchResult {
        let outcome = self.world.outcome();
        let (winner, reason) = match outcome {
            Some(outcome) => (outcome.winner, outcome.reason),
            None => (self.world.tiebreak_winner(), EndReason::RoundLimit),
        };
        let stats = Team::PLAYERS.map(|team| {
            let turns = self.scheduler.stats(team);
            TeamStats {
                instructions_used: turns.instructions,
                suspensions: turns.suspensions,
                yield_credit: turns.yield_credit,
                units_spawned: self.spawned[team],
                final_power: self.world.pool(team).power(),
            }
        });
        MatchResult {
            seed: self.seed,
            winner,
            reason,
            rounds: self.world.round(),
            stats,
        }
    }
}
