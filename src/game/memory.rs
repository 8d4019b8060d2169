//! Persistent team memory.
//!
//! Each team owns a fixed-length array of `i64` that survives between matches.
//! During a match, reads see the array as it was loaded (the previous match's
//! final state) while writes land in a separate current array. At match end
//! the harness hands the current array to a [`TeamMemoryStore`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::error::{ActionResult, ErrorKind, GameActionError};
use crate::game::Team;

/// One team's memory for the current match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMemory {
    previous: Vec<i64>,
    current: Vec<i64>,
}

impl TeamMemory {
    /// Start a match from a stored snapshot.
    ///
    /// The snapshot is truncated or zero-padded to `length`.
    #[must_use]
    pub fn from_snapshot(length: usize, snapshot: Option<Vec<i64>>) -> Self {
        let mut previous = snapshot.unwrap_or_default();
        previous.resize(length, 0);
        Self {
            current: previous.clone(),
            previous,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    /// Whether the memory has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    /// Fail with `InvalidTarget` unless `index` addresses an entry.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidTarget`] for an out-of-range index.
    pub fn check_index(&self, index: usize) -> ActionResult<()> {
        if index < self.len() {
            Ok(())
        } else {
            Err(GameActionError::new(
                ErrorKind::InvalidTarget,
                format!("team memory index {index} out of range 0..{}", self.len()),
            ))
        }
    }

    /// The value loaded at match start.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidTarget`] for an out-of-range index.
    pub fn read_previous(&self, index: usize) -> ActionResult<i64> {
        self.check_index(index)?;
        Ok(self.previous[index])
    }

    /// Apply a masked write: bits set in `mask` take their value from `value`.
    pub fn write_masked(&mut self, index: usize, value: i64, mask: i64) {
        if let Some(slot) = self.current.get_mut(index) {
            *slot = (*slot & !mask) | (value & mask);
        }
    }

    /// The array to persist at match end.
    #[must_use]
    pub fn current(&self) -> &[i64] {
        &self.current
    }
}

/// Error talking to a memory store.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// Filesystem failure.
    #[error("team memory I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored file is not a JSON integer array.
    #[error("team memory file is malformed: {0}")]
    Json(#[from] serde_json::Error),
    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("team memory store lock poisoned")]
    Poisoned,
}

/// Where team memory lives between matches.
pub trait TeamMemoryStore: Send + Sync {
    /// Load a team's snapshot, `None` if it has never been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self, team: Team) -> Result<Option<Vec<i64>>, MemoryStoreError>;

    /// Persist a team's snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, team: Team, memory: &[i64]) -> Result<(), MemoryStoreError>;
}

/// Keeps snapshots in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    slots: Mutex<[Option<Vec<i64>>; 2]>,
}

fn player_slot(team: Team) -> Option<usize> {
    match team {
        Team::A => Some(0),
        Team::B => Some(1),
        Team::Neutral => None,
    }
}

impl TeamMemoryStore for InMemoryStore {
    fn load(&self, team: Team) -> Result<Option<Vec<i64>>, MemoryStoreError> {
        let slots = self.slots.lock().map_err(|_| MemoryStoreError::Poisoned)?;
        Ok(player_slot(team).and_then(|slot| slots[slot].clone()))
    }

    fn save(&self, team: Team, memory: &[i64]) -> Result<(), MemoryStoreError> {
        let mut slots = self.slots.lock().map_err(|_| MemoryStoreError::Poisoned)?;
        if let Some(slot) = player_slot(team) {
            slots[slot] = Some(memory.to_vec());
        }
        Ok(())
    }
}

/// Stores one JSON file per team in a directory.
#[derive(Debug, Clone)]
pub struct JsonMemoryStore {
    dir: PathBuf,
}

impl JsonMemoryStore {
    /// Use `dir` for storage. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, team: Team) -> PathBuf {
        self.dir.join(format!("team_{team}.json"))
    }
}

impl TeamMemoryStore for JsonMemoryStore {
    fn load(&self, team: Team) -> Result<Option<Vec<i64>>, MemoryStoreError> {
        let path = self.path_for(team);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn save(&self, team: Team, memory: &[i64]) -> Result<(), MemoryStoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let text = serde_json::to_string(memory)?;
        std::fs::write(self.path_for(team), text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_resized_to_length() {
        let memory = TeamMemory::from_snapshot(4, Some(vec![1, 2, 3, 4, 5, 6]));
        assert_eq!(memory.len(), 4);
        assert_eq!(memory.read_previous(3).unwrap(), 4);

        let memory = TeamMemory::from_snapshot(3, None);
        assert_eq!(memory.current(), &[0, 0, 0]);
    }

    #[test]
    fn test_reads_see_previous_match() {
        let mut memory = TeamMemory::from_snapshot(2, Some(vec![7, 8]));
        memory.write_masked(0, 99, -1);
        assert_eq!(memory.read_previous(0).unwrap(), 7);
        assert_eq!(memory.current()[0], 99);
    }

    #[test]
    fn test_masked_write() {
        let mut memory = TeamMemory::from_snapshot(1, Some(vec![0b1010]));
        memory.write_masked(0, 0b0101, 0b0011);
        assert_eq!(memory.current()[0], 0b1001);
    }

    #[test]
    fn test_index_out_of_range() {
        let memory = TeamMemory::from_snapshot(2, None);
        let err = memory.read_previous(2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTarget);
    }

    #[test]
    fn test_in_memory_store_round_trip() {
        let store = InMemoryStore::default();
        assert!(store.load(Team::A).unwrap().is_none());
        store.save(Team::A, &[1, 2]).unwrap();
        assert_eq!(store.load(Team::A).unwrap(), Some(vec![1, 2]));
        assert!(store.load(Team::B).unwrap().is_none());
    }

    #[test]
    fn test_json_store_persists_per_team() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonMemoryStore::new(dir.path().join("memory"));
        assert!(store.load(Team::B).unwrap().is_none());

        store.save(Team::B, &[5, -6, 7]).unwrap();
        let reopened = JsonMemoryStore::new(dir.path().join("memory"));
        assert_eq!(reopened.load(Team::B).unwrap(), Some(vec![5, -6, 7]));
        assert!(reopened.load(Team::A).unwrap().is_none());
    }

    #[test]
    fn test_json_store_reports_garbage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("team_A.json"), "not json").unwrap();
        let store = JsonMemoryStore::new(dir.path());
        assert!(matches!(store.load(Team::A), Err(MemoryStoreError::Json(_))));
    }
}
