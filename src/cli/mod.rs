//! CLI command implementations for bytewar.

pub(crate) mod map;
pub(crate) mod run;
pub(crate) mod tournament;

mod output;

use bytewar::game::Balance;
use bytewar::strategies::{builtin, BUILTIN_NAMES};
use bytewar::tournament::MatchConfig;
use bytewar::Strategy;
use clap::ValueEnum;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Output format for the `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Output format for the `tournament` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum TournamentFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
    /// CSV format.
    Csv,
}

/// Match options shared by `run` and `tournament`.
#[derive(Debug, Clone)]
pub(crate) struct MatchOptions {
    /// Strategy name for team A.
    pub(crate) team_a: String,
    /// Strategy name for team B.
    pub(crate) team_b: String,
    /// Seed, random when absent.
    pub(crate) seed: Option<u64>,
    /// Round limit.
    pub(crate) rounds: u32,
    /// Generated map width.
    pub(crate) width: i32,
    /// Generated map height.
    pub(crate) height: i32,
    /// Balance table path.
    pub(crate) balance: Option<PathBuf>,
}

impl MatchOptions {
    /// Build the match configuration, loading the balance table if given.
    pub(crate) fn config(&self) -> Result<MatchConfig, CliError> {
        let balance = match &self.balance {
            Some(path) => Balance::from_json_file(path).map_err(|e| {
                CliError::new(format!("Failed to load {}: {e}", path.display()))
            })?,
            None => Balance::default(),
        };
        Ok(MatchConfig {
            max_rounds: self.rounds,
            map_width: self.width,
            map_height: self.height,
            balance,
        })
    }

    /// Look up both strategies.
    pub(crate) fn strategies(&self) -> Result<[Box<dyn Strategy>; 2], CliError> {
        Ok([strategy(&self.team_a)?, strategy(&self.team_b)?])
    }

    /// The seed to use.
    pub(crate) fn seed(&self) -> u64 {
        self.seed.unwrap_or_else(random_seed)
    }
}

fn strategy(name: &str) -> Result<Box<dyn Strategy>, CliError> {
    builtin(name).ok_or_else(|| {
        CliError::new(format!(
            "Unknown strategy '{name}' (available: {})",
            BUILTIN_NAMES.join(", ")
        ))
    })
}

/// A seed from the clock.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(42)
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<bytewar::MatchError> for CliError {
    fn from(e: bytewar::MatchError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<bytewar::tournament::MapGenError> for CliError {
    fn from(e: bytewar::tournament::MapGenError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}
