//! Per-unit activity counters.
//!
//! Each action class has its own countdown. A class accepts a new action only
//! when its counter is exactly zero; acceptance sets the counter to the
//! action's delay. Counters tick down once per resolved round and never go
//! below zero. There is no queueing: a request while busy is rejected.

use crate::error::{ActionResult, ErrorKind, GameActionError};

/// The independent cooldown classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    /// Moving, spawning and researching.
    Movement,
    /// Targeted attacks.
    Attack,
    /// Encampment capture.
    Capture,
    /// Laying and defusing mines.
    Mine,
}

impl ActionClass {
    /// Every class.
    pub const ALL: [ActionClass; 4] = [
        ActionClass::Movement,
        ActionClass::Attack,
        ActionClass::Capture,
        ActionClass::Mine,
    ];

    const fn slot(self) -> usize {
        match self {
            ActionClass::Movement => 0,
            ActionClass::Attack => 1,
            ActionClass::Capture => 2,
            ActionClass::Mine => 3,
        }
    }
}

/// Cooldown counters for one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityState {
    counters: [u32; 4],
}

impl ActivityState {
    /// Rounds until the class is idle again.
    #[must_use]
    pub const fn remaining(&self, class: ActionClass) -> u32 {
        self.counters[class.slot()]
    }

    /// Whether the class will accept a new action.
    #[must_use]
    pub const fn is_idle(&self, class: ActionClass) -> bool {
        self.remaining(class) == 0
    }

    /// Fail with `AlreadyActive` unless the class is idle.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AlreadyActive`] when the counter is nonzero.
    pub fn ensure_idle(&self, class: ActionClass) -> ActionResult<()> {
        let remaining = self.remaining(class);
        if remaining == 0 {
            Ok(())
        } else {
            Err(GameActionError::new(
                ErrorKind::AlreadyActive,
                format!("{class:?} is busy for {remaining} more round(s)"),
            ))
        }
    }

    /// Start an action of the class with the given delay.
    pub fn activate(&mut self, class: ActionClass, delay: u32) {
        self.counters[class.slot()] = delay;
    }

    /// Advance one round.
    pub fn tick(&mut self) {
        for counter in &mut self.counters {
            *counter = counter.saturating_sub(1);
        }
    }

    /// The larger of the movement and attack counters.
    #[must_use]
    pub fn rounds_until_active(&self) -> u32 {
        self.remaining(ActionClass::Movement)
            .max(self.remaining(ActionClass::Attack))
    }
}
