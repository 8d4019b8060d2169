//! The shared radio board.
//!
//! Channels are shared by both teams. Writes made during a round are queued as
//! signals and land here when the round resolves; within one round the last
//! write to a channel wins.

use std::collections::BTreeMap;

/// Committed channel values. Channels never written read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastBoard {
    channels: BTreeMap<u32, i64>,
}

impl BroadcastBoard {
    /// Value currently committed on `channel`.
    #[must_use]
    pub fn read(&self, channel: u32) -> i64 {
        self.channels.get(&channel).copied().unwrap_or(0)
    }

    /// Commit a value, replacing whatever was there.
    pub fn commit(&mut self, channel: u32, value: i64) {
        self.channels.insert(channel, value);
    }

    /// Number of channels that hold a committed value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether nothing has ever been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
