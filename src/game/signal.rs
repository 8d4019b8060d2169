//! Deferred world mutations.
//!
//! The gateway validates and charges immediately but only *describes* the
//! effect as a [`Signal`]. Signals collect in a [`SignalQueue`] during the
//! round and are applied by the resolver at the round boundary.

use crate::game::{MapLocation, Team, UnitId, UnitType, Upgrade};

/// Resolution classes, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalClass {
    /// New units.
    Spawn,
    /// Unit moves.
    Movement,
    /// Targeted attacks.
    Attack,
    /// Capture starts.
    Capture,
    /// Research progress.
    Research,
    /// Mine lay, defuse and scan.
    Mine,
    /// Broadcast and team-memory commits.
    Commit,
}

/// A mine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MineOp {
    /// Start laying on the unit's cell.
    Lay,
    /// Start defusing the mine at a cell.
    Defuse {
        /// Mine to remove.
        target: MapLocation,
        /// Rounds the work takes.
        delay: u32,
    },
    /// Reveal enemy mines within sensor range.
    Scan,
}

/// One deferred effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Create a unit next to its parent.
    Spawn {
        /// Producing unit.
        parent: UnitId,
        /// Team of the new unit.
        team: Team,
        /// Type of the new unit.
        unit_type: UnitType,
        /// Cell to place it on.
        location: MapLocation,
    },
    /// Step a unit to an adjacent cell.
    Movement {
        /// Moving unit.
        unit: UnitId,
        /// Cell it stood on when it asked.
        from: MapLocation,
        /// Destination.
        to: MapLocation,
    },
    /// Bombard a cell.
    Attack {
        /// Attacker.
        unit: UnitId,
        /// Target cell.
        target: MapLocation,
    },
    /// Begin capturing the encampment under a soldier.
    Capture {
        /// Capturing soldier.
        unit: UnitId,
        /// Its team.
        team: Team,
        /// Encampment cell.
        location: MapLocation,
        /// Encampment type to build.
        kind: UnitType,
    },
    /// One round of research.
    Research {
        /// Researching team.
        team: Team,
        /// Upgrade advanced.
        upgrade: Upgrade,
    },
    /// Lay, defuse or scan.
    Mine {
        /// Working unit.
        unit: UnitId,
        /// Its team.
        team: Team,
        /// Cell it stood on when it asked.
        origin: MapLocation,
        /// The operation.
        op: MineOp,
    },
    /// Write a radio channel.
    Broadcast {
        /// Writer.
        unit: UnitId,
        /// Channel.
        channel: u32,
        /// Value.
        value: i64,
    },
    /// Write team memory.
    TeamMemory {
        /// Team.
        team: Team,
        /// Entry.
        index: usize,
        /// New bits.
        value: i64,
        /// Which bits to replace.
        mask: i64,
    },
}

impl Signal {
    /// Resolution class.
    #[must_use]
    pub const fn class(&self) -> SignalClass {
        match self {
            Signal::Spawn { .. } => SignalClass::Spawn,
            Signal::Movement { .. } => SignalClass::Movement,
            Signal::Attack { .. } => SignalClass::Attack,
            Signal::Capture { .. } => SignalClass::Capture,
            Signal::Research { .. } => SignalClass::Research,
            Signal::Mine { .. } => SignalClass::Mine,
            Signal::Broadcast { .. } | Signal::TeamMemory { .. } => SignalClass::Commit,
        }
    }
}

/// Signals emitted during the current round, in emission order.
#[derive(Debug, Clone, Default)]
pub struct SignalQueue {
    signals: Vec<Signal>,
}

impl SignalQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a signal.
    pub fn push(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    /// Number of queued signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Queued signals in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    /// Empty the queue, returning signals in resolution order.
    ///
    /// The sort is stable, so emission order holds within a class.
    pub fn drain_ordered(&mut self) -> Vec<Signal> {
        let mut signals = std::mem::take(&mut self.signals);
        signals.sort_by_key(Signal::class);
        signals
    }

    /// The latest value `unit` has queued for `channel` this round.
    #[must_use]
    pub fn pending_broadcast(&self, unit: UnitId, channel: u32) -> Option<i64> {
        self.signals.iter().rev().find_map(|s| match *s {
            Signal::Broadcast {
                unit: u,
                channel: c,
                value,
            } if u == unit && c == channel => Some(value),
            _ => None,
        })
    }

    /// Captures `team` has queued this round.
    #[must_use]
    pub fn queued_captures(&self, team: Team) -> usize {
        self.signals
            .iter()
            .filter(|s| matches!(s, Signal::Capture { team: t, .. } if *t == team))
            .count()
    }

    /// Whether a capture of `location` is already queued this round.
    #[must_use]
    pub fn capture_queued_at(&self, location: MapLocation) -> bool {
        self.signals
            .iter()
            .any(|s| matches!(s, Signal::Capture { location: l, .. } if *l == location))
    }
}
