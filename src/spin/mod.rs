//! Spin maneuver state and its watchdog
//!
//! A spin is started by a scroll event and lives only as long as scroll
//! events keep arriving. The watchdog cancels it once no scroll event was
//! seen for the spin timeout.
//!
//! ```text
//! Inactive ──[scroll]──► Active ──[scroll, refresh]──► Active
//!     ▲                                                  │
//!     └──────────────[timeout, motors stopped]───────────┘
//! ```

pub mod watchdog;

use crate::drive::DriveCommand;
use std::time::Duration;
use tokio::time::Instant;

pub use watchdog::SpinWatchdog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinDirection {
    Clockwise,
    CounterClockwise,
}

impl SpinDirection {
    /// Positive wheel deltas spin clockwise, zero (or NaN) is no spin
    pub fn from_scroll(delta_y: f64) -> Option<Self> {
        if delta_y > 0.0 {
            Some(SpinDirection::Clockwise)
        } else if delta_y < 0.0 {
            Some(SpinDirection::CounterClockwise)
        } else {
            None
        }
    }

    pub fn command(&self) -> DriveCommand {
        match self {
            SpinDirection::Clockwise => DriveCommand::SpinClockwise,
            SpinDirection::CounterClockwise => DriveCommand::SpinCounterClockwise,
        }
    }
}

/// Shared between the input router and the watchdog, always read and
/// written as one unit under the drive context's lock
#[derive(Debug, Clone, Copy)]
pub struct SpinState {
    pub active: bool,
    pub direction: SpinDirection,
    pub last_event: Instant,
}

impl SpinState {
    pub fn new() -> Self {
        Self {
            active: false,
            direction: SpinDirection::Clockwise,
            last_event: Instant::now(),
        }
    }

    /// Spin is active in `direction`
    pub fn is_spinning(&self, direction: SpinDirection) -> bool {
        self.active && self.direction == direction
    }

    pub fn deadline(&self, timeout: Duration) -> Option<Instant> {
        self.active.then(|| self.last_event + timeout)
    }

    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        self.active && now.saturating_duration_since(self.last_event) >= timeout
    }
}

impl Default for SpinState {
    fn default() -> Self {
        Self::new()
    }
}
