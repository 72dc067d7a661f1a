use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest accepted base time (3 hours).
const MAX_INITIAL_SECS: u64 = 3 * 60 * 60;
/// Longest accepted increment (3 minutes).
const MAX_INCREMENT_SECS: u64 = 180;

/// A time-control class: base time plus per-move increment.
///
/// Two queue entries are compatible iff their time controls are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeControl {
    pub initial_ms: u64,
    pub increment_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeControlError {
    #[error("Initial time must be between 1 and 10800 seconds, got {0}")]
    InitialOutOfRange(u64),
    #[error("Increment must be at most 180 seconds, got {0}")]
    IncrementOutOfRange(u64),
}

impl TimeControl {
    pub fn from_seconds(initial_secs: u64, increment_secs: u64) -> Result<Self, TimeControlError> {
        if initial_secs == 0 || initial_secs > MAX_INITIAL_SECS {
            return Err(TimeControlError::InitialOutOfRange(initial_secs));
        }
        if increment_secs > MAX_INCREMENT_SECS {
            return Err(TimeControlError::IncrementOutOfRange(increment_secs));
        }
        Ok(Self {
            initial_ms: initial_secs * 1000,
            increment_ms: increment_secs * 1000,
        })
    }
}

/// Renders as `minutes+seconds`, e.g. `5+3`, or `seconds s+seconds` under a minute.
impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let initial_secs = self.initial_ms / 1000;
        let increment_secs = self.increment_ms / 1000;
        if initial_secs % 60 == 0 {
            write!(f, "{}+{}", initial_secs / 60, increment_secs)
        } else {
            write!(f, "{}s+{}", initial_secs, increment_secs)
        }
    }
}
