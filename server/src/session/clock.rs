use tokio::time::Instant;

use crate::time_control::TimeControl;

/// Per-seat countdown with increment-on-move.
///
/// Remaining time is only folded in on [`Clock::stop`]; reads go through
/// [`Clock::remaining_at`], which never mutates.
#[derive(Debug, Clone)]
pub(crate) struct Clock {
    remaining_ms: u64,
    increment_ms: u64,
    started_at: Option<Instant>,
}

impl Clock {
    pub fn new(time_control: TimeControl) -> Self {
        Self {
            remaining_ms: time_control.initial_ms,
            increment_ms: time_control.increment_ms,
            started_at: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Stops the clock and charges the elapsed time. Returns the elapsed ms.
    pub fn stop(&mut self, now: Instant) -> u64 {
        let Some(started_at) = self.started_at.take() else {
            return 0;
        };
        let elapsed_ms = now.saturating_duration_since(started_at).as_millis() as u64;
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        elapsed_ms
    }

    pub fn add_increment(&mut self) {
        self.remaining_ms = self.remaining_ms.saturating_add(self.increment_ms);
    }

    pub fn remaining_at(&self, now: Instant) -> u64 {
        match self.started_at {
            Some(started_at) => {
                let elapsed_ms = now.saturating_duration_since(started_at).as_millis() as u64;
                self.remaining_ms.saturating_sub(elapsed_ms)
            }
            None => self.remaining_ms,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_flagged(&self, now: Instant) -> bool {
        self.remaining_at(now) == 0
    }
}
