//! Game layer for bytewar.
//!
//! Implements the round-resolution rules:
//! - Map, units and per-class activity counters
//! - The action gateway that validates, charges and emits signals
//! - Signal resolution, combat and passive effects
//! - Economy, research, fog of war, radio and team memory

mod activity;
mod balance;
mod broadcast;
mod combat;
mod controller;
mod economy;
pub mod invariants;
mod map;
mod memory;
mod resolver;
pub mod sensing;
mod signal;
mod unit;
mod upgrade;
mod world;

pub use activity::{ActionClass, ActivityState};
pub use balance::{Balance, BalanceError, ResearchRounds, UnitStats};
pub use broadcast::BroadcastBoard;
pub use combat::{artillery_strike, mine_damage, remove_dead, soldier_melee, support_effects};
pub use controller::RobotController;
pub use economy::{
    apply_round_economy, capture_cost, spawn_delay, unused_compute_reward, ResourcePool,
    RoundEconomy, TeamHoldings,
};
pub use map::{Direction, GameMap, MapLocation, Terrain};
pub use memory::{InMemoryStore, JsonMemoryStore, MemoryStoreError, TeamMemory, TeamMemoryStore};
pub use resolver::{
    advance_captures, advance_mine_works, apply_signal, end_round, resolve_signals, RoundReport,
};
pub use sensing::SenseFilter;
pub use signal::{MineOp, Signal, SignalClass, SignalQueue};
pub use unit::{Capabilities, PerTeam, Team, Unit, UnitId, UnitInfo, UnitType};
pub use upgrade::{Upgrade, UpgradeBook};
pub use world::{
    EncampmentState, EndReason, MapSetup, MatchOutcome, MineWork, MineWorkKind, SetupError,
    WorldState,
};
