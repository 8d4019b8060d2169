// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Bytewar: a deterministic round-resolution kernel for robot strategy games.
//!
//! Two teams of robots share a grid. Every round each live robot runs its
//! program under a fixed compute budget, calling a validating action gateway
//! that charges costs and emits deferred signals. At the round boundary the
//! signals are resolved in a fixed class order, followed by combat, passive
//! effects, works in progress and the economy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Tournament Runner / Strategies    │
//! ├─────────────────────────────────────┤
//! │   Scheduler + Compute Meter         │
//! ├─────────────────────────────────────┤
//! │   Gateway → Signals → Resolver      │
//! ├─────────────────────────────────────┤
//! │   World State                       │
//! └─────────────────────────────────────┘
//! ```

pub mod error;
pub mod game;
pub mod scheduler;
pub mod strategies;
pub mod tournament;

pub use error::{ActionResult, ErrorKind, GameActionError};

// Re-export key types at crate root for convenience
pub use game::{
    Balance, Direction, MapLocation, MapSetup, RobotController, SenseFilter, Team, UnitInfo,
    UnitType, Upgrade, WorldState,
};
pub use scheduler::{ComputeMeter, RobotProgram, Step, StepMeter, Strategy};
pub use tournament::{run_match, run_match_with, run_series, MatchConfig, MatchError, MatchResult};
