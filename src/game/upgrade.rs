//! Research upgrades and per-team research progress.

use serde::{Deserialize, Serialize};

/// Unlockable team-wide capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Upgrade {
    /// Slows power decay.
    Fusion,
    /// Widens sensor radius of every unit.
    Vision,
    /// Faster, longer-range mine defusal.
    Defusion,
    /// Laying a mine also mines the orthogonal neighbours.
    Pickaxe,
    /// Enables `scan_mines`.
    MineDetector,
    /// Wins the match when completed.
    Nuke,
}

impl Upgrade {
    /// Every upgrade.
    pub const ALL: [Upgrade; 6] = [
        Upgrade::Fusion,
        Upgrade::Vision,
        Upgrade::Defusion,
        Upgrade::Pickaxe,
        Upgrade::MineDetector,
        Upgrade::Nuke,
    ];

    const fn slot(self) -> usize {
        match self {
            Upgrade::Fusion => 0,
            Upgrade::Vision => 1,
            Upgrade::Defusion => 2,
            Upgrade::Pickaxe => 3,
            Upgrade::MineDetector => 4,
            Upgrade::Nuke => 5,
        }
    }
}

/// Research state for one team.
///
/// Progress only grows, and stops counting once the upgrade is unlocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeBook {
    progress: [u32; 6],
    unlocked: [bool; 6],
}

impl UpgradeBook {
    /// Whether the upgrade has been unlocked.
    #[must_use]
    pub const fn has(&self, upgrade: Upgrade) -> bool {
        self.unlocked[upgrade.slot()]
    }

    /// Rounds of research invested so far.
    #[must_use]
    pub const fn progress(&self, upgrade: Upgrade) -> u32 {
        self.progress[upgrade.slot()]
    }

    /// Add one round of research. Returns `true` if this round unlocked it.
    pub fn advance(&mut self, upgrade: Upgrade, required_rounds: u32) -> bool {
        let slot = upgrade.slot();
        if self.unlocked[slot] {
            return false;
        }
        self.progress[slot] = self.progress[slot].saturating_add(1);
        if self.progress[slot] >= required_rounds {
            self.unlocked[slot] = true;
            return true;
        }
        false
    }

    /// Unlock directly (map presets and tests).
    pub fn grant(&mut self, upgrade: Upgrade) {
        self.unlocked[upgrade.slot()] = true;
    }
}
