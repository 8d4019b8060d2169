//! Error types surfaced to robot programs and match harnesses.

use std::fmt;

use thiserror::Error;

/// The closed set of reasons a gateway call can be rejected.
///
/// This is the only contract a robot program observes when an action fails:
/// the call performed no mutation and the turn continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The activity counter for the action's class is nonzero.
    AlreadyActive,
    /// The unit's type lacks the capability for this action.
    InvalidActionForType,
    /// The team pool cannot cover the cost.
    InsufficientResource,
    /// The team has not unlocked a required upgrade.
    MissingUpgrade,
    /// The target is outside team vision (or defuse reach).
    OutOfSensorRange,
    /// The target is outside the unit's attack radius.
    OutOfAttackRange,
    /// The destination is off-map, impassable or occupied.
    DestinationOccupiedOrBlocked,
    /// The target object or location does not exist or is not valid here.
    InvalidTarget,
    /// The broadcast channel is outside the valid range.
    ChannelOutOfRange,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::AlreadyActive => "already active",
            ErrorKind::InvalidActionForType => "invalid action for type",
            ErrorKind::InsufficientResource => "insufficient resource",
            ErrorKind::MissingUpgrade => "missing upgrade",
            ErrorKind::OutOfSensorRange => "out of sensor range",
            ErrorKind::OutOfAttackRange => "out of attack range",
            ErrorKind::DestinationOccupiedOrBlocked => "destination occupied or blocked",
            ErrorKind::InvalidTarget => "invalid target",
            ErrorKind::ChannelOutOfRange => "channel out of range",
        };
        f.write_str(name)
    }
}

/// A rejected gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {reason}")]
pub struct GameActionError {
    /// Which precondition failed.
    pub kind: ErrorKind,
    /// Human-readable explanation.
    pub reason: String,
}

impl GameActionError {
    /// Create a new error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type for gateway calls.
pub type ActionResult<T> = Result<T, GameActionError>;
