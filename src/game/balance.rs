//! The numeric balance table.
//!
//! Every cost, delay and radius the kernel consults lives here. Defaults
//! describe a playable game; a JSON file may override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{Upgrade, UnitType};

/// Error loading or validating a balance table.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// The file could not be read.
    #[error("failed to read balance file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid balance JSON.
    #[error("failed to parse balance file: {0}")]
    Json(#[from] serde_json::Error),
    /// A value is out of its allowed range.
    #[error("invalid balance value: {0}")]
    Invalid(String),
}

/// Per-type statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    /// Starting and maximum energon.
    pub max_energon: f64,
    /// Base sensor radius, squared.
    pub sensor_radius_squared: i32,
    /// Movement cooldown for orthogonal steps.
    pub move_delay_orthogonal: u32,
    /// Movement cooldown for diagonal steps.
    pub move_delay_diagonal: u32,
    /// Reach of attacks, squared.
    pub attack_radius_squared: i32,
    /// Attack cooldown.
    pub attack_delay: u32,
    /// Damage dealt per attack.
    pub attack_power: f64,
    /// Power charged to produce one unit of this type.
    pub spawn_cost: f64,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            max_energon: 100.0,
            sensor_radius_squared: 14,
            move_delay_orthogonal: 0,
            move_delay_diagonal: 0,
            attack_radius_squared: 0,
            attack_delay: 0,
            attack_power: 0.0,
            spawn_cost: 0.0,
        }
    }
}

/// Rounds of research needed per upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchRounds {
    /// Fusion.
    pub fusion: u32,
    /// Vision.
    pub vision: u32,
    /// Defusion.
    pub defusion: u32,
    /// Pickaxe.
    pub pickaxe: u32,
    /// Mine detector.
    pub mine_detector: u32,
    /// Nuke.
    pub nuke: u32,
}

impl Default for ResearchRounds {
    fn default() -> Self {
        Self {
            fusion: 25,
            vision: 25,
            defusion: 25,
            pickaxe: 25,
            mine_detector: 25,
            nuke: 404,
        }
    }
}

/// All game constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Balance {
    /// Instructions each unit may run per turn.
    pub bytecode_limit: u32,
    /// Power credited per instruction left unused at yield.
    pub power_per_unused_bytecode: f64,
    /// Power each team with a live HQ earns per round.
    pub hq_income: f64,
    /// Extra power per generator per round.
    pub generator_income: f64,
    /// Power each non-HQ unit costs per round.
    pub unit_upkeep: f64,
    /// Energon lost by every non-HQ unit when upkeep goes unpaid.
    pub unpowered_energon_loss: f64,
    /// Fraction of the stockpile kept each round.
    pub power_decay: f64,
    /// Fraction kept once Fusion is researched.
    pub fusion_power_decay: f64,
    /// Spawn cooldown with no suppliers.
    pub base_spawn_delay: u32,
    /// Spawn-rate bonus per supplier.
    pub supplier_bonus: f64,
    /// Base capture cost, scaled by the number of captures and encampments.
    pub capture_cost: f64,
    /// Rounds a capture takes.
    pub capture_delay: u32,
    /// Power charged per round of research.
    pub research_cost: f64,
    /// Rounds of research per upgrade.
    pub research_rounds: ResearchRounds,
    /// Rounds to lay a mine.
    pub mine_lay_delay: u32,
    /// Rounds to defuse a mine.
    pub mine_defuse_delay: u32,
    /// Rounds to defuse with Defusion.
    pub mine_defuse_defusion_delay: u32,
    /// Defuse reach without Defusion, squared.
    pub base_defuse_radius_squared: i32,
    /// Damage per round to a unit standing on a foreign mine.
    pub mine_damage: f64,
    /// Power charged per mine scan.
    pub scan_cost: f64,
    /// Sensor radius bonus (squared units) from Vision.
    pub vision_bonus: i32,
    /// Power charged per broadcast write.
    pub broadcast_send_cost: f64,
    /// Power charged per broadcast read.
    pub broadcast_read_cost: f64,
    /// Valid channels are `0..broadcast_max_channels`.
    pub broadcast_max_channels: u32,
    /// Entries in each team's memory array.
    pub team_memory_length: usize,
    /// Fraction of artillery power dealt to the eight neighbours of the target.
    pub artillery_splash_ratio: f64,
    /// Medbay reach, squared.
    pub medbay_radius_squared: i32,
    /// Energon restored per round by a medbay.
    pub medbay_heal: f64,
    /// Shields encampment reach, squared.
    pub shields_radius_squared: i32,
    /// Shields granted per round.
    pub shields_regen: f64,
    /// Shield cap per unit.
    pub max_shields: f64,
    /// HQ statistics.
    pub hq: UnitStats,
    /// Soldier statistics.
    pub soldier: UnitStats,
    /// Artillery statistics.
    pub artillery: UnitStats,
    /// Generator statistics.
    pub generator: UnitStats,
    /// Supplier statistics.
    pub supplier: UnitStats,
    /// Medbay statistics.
    pub medbay: UnitStats,
    /// Shields statistics.
    pub shields: UnitStats,
}

impl Default for Balance {
    fn default() -> Self {
        let encampment = UnitStats::default();
        Self {
            bytecode_limit: 10_000,
            power_per_unused_bytecode: 0.0001,
            hq_income: 40.0,
            generator_income: 10.0,
            unit_upkeep: 1.0,
            unpowered_energon_loss: 5.0,
            power_decay: 0.8,
            fusion_power_decay: 0.99,
            base_spawn_delay: 10,
            supplier_bonus: 0.25,
            capture_cost: 10.0,
            capture_delay: 50,
            research_cost: 0.0,
            research_rounds: ResearchRounds::default(),
            mine_lay_delay: 25,
            mine_defuse_delay: 12,
            mine_defuse_defusion_delay: 5,
            base_defuse_radius_squared: 2,
            mine_damage: 10.0,
            scan_cost: 25.0,
            vision_bonus: 19,
            broadcast_send_cost: 10.0,
            broadcast_read_cost: 5.0,
            broadcast_max_channels: 65_535,
            team_memory_length: 32,
            artillery_splash_ratio: 0.5,
            medbay_radius_squared: 2,
            medbay_heal: 2.0,
            shields_radius_squared: 2,
            shields_regen: 1.0,
            max_shields: 40.0,
            hq: UnitStats {
                max_energon: 500.0,
                ..encampment
            },
            soldier: UnitStats {
                max_energon: 40.0,
                move_delay_orthogonal: 2,
                move_delay_diagonal: 3,
                attack_radius_squared: 2,
                attack_power: 6.0,
                spawn_cost: 10.0,
                ..encampment
            },
            artillery: UnitStats {
                attack_radius_squared: 63,
                attack_delay: 20,
                attack_power: 40.0,
                ..encampment
            },
            generator: encampment,
            supplier: encampment,
            medbay: encampment,
            shields: encampment,
        }
    }
}

impl Balance {
    /// Load a table from a JSON file. Missing fields take default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BalanceError> {
        let text = std::fs::read_to_string(path)?;
        let balance: Balance = serde_json::from_str(&text)?;
        balance.validate()?;
        Ok(balance)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), BalanceError> {
        if self.bytecode_limit == 0 {
            return Err(BalanceError::Invalid("bytecode_limit must be positive".into()));
        }
        if self.broadcast_max_channels == 0 {
            return Err(BalanceError::Invalid(
                "broadcast_max_channels must be positive".into(),
            ));
        }
        for (name, decay) in [
            ("power_decay", self.power_decay),
            ("fusion_power_decay", self.fusion_power_decay),
        ] {
            if !(0.0..=1.0).contains(&decay) {
                return Err(BalanceError::Invalid(format!("{name} must lie in [0, 1]")));
            }
        }
        let costs = [
            ("power_per_unused_bytecode", self.power_per_unused_bytecode),
            ("capture_cost", self.capture_cost),
            ("research_cost", self.research_cost),
            ("scan_cost", self.scan_cost),
            ("broadcast_send_cost", self.broadcast_send_cost),
            ("broadcast_read_cost", self.broadcast_read_cost),
            ("unit_upkeep", self.unit_upkeep),
        ];
        for (name, value) in costs {
            if !value.is_finite() || value < 0.0 {
                return Err(BalanceError::Invalid(format!(
                    "{name} must be finite and non-negative"
                )));
            }
        }
        for unit_type in UnitType::ALL {
            let stats = self.stats(unit_type);
            if !(stats.max_energon.is_finite() && stats.max_energon > 0.0) {
                return Err(BalanceError::Invalid(format!(
                    "{unit_type:?} max_energon must be positive"
                )));
            }
            if !stats.spawn_cost.is_finite() || stats.spawn_cost < 0.0 {
                return Err(BalanceError::Invalid(format!(
                    "{unit_type:?} spawn_cost must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }

    /// Statistics for a unit type.
    #[must_use]
    pub const fn stats(&self, unit_type: UnitType) -> &UnitStats {
        match unit_type {
            UnitType::Hq => &self.hq,
            UnitType::Soldier => &self.soldier,
            UnitType::Artillery => &self.artillery,
            UnitType::Generator => &self.generator,
            UnitType::Supplier => &self.supplier,
            UnitType::Medbay => &self.medbay,
            UnitType::Shields => &self.shields,
        }
    }

    /// Rounds of research needed to unlock an upgrade.
    #[must_use]
    pub const fn research_rounds(&self, upgrade: Upgrade) -> u32 {
        let rounds = &self.research_rounds;
        match upgrade {
            Upgrade::Fusion => rounds.fusion,
            Upgrade::Vision => rounds.vision,
            Upgrade::Defusion => rounds.defusion,
            Upgrade::Pickaxe => rounds.pickaxe,
            Upgrade::MineDetector => rounds.mine_detector,
            Upgrade::Nuke => rounds.nuke,
        }
    }

    /// Whether a channel index is accepted by broadcast reads and writes.
    #[must_use]
    pub fn channel_in_range(&self, channel: i64) -> bool {
        (0..i64::from(self.broadcast_max_channels)).contains(&channel)
    }
}
