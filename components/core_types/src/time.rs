//! Logical time and injectable clocks.
//!
//! The event loop never reads wall-clock time. Timers are ordered on a
//! millisecond timeline owned by a [`Clock`], which the loop advances when it
//! fires a timer.

use serde::Serialize;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// An instant on the simulated timeline, in milliseconds since loop start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LogicalTime(u64);

impl LogicalTime {
    /// The start of the timeline.
    pub const ZERO: LogicalTime = LogicalTime(0);

    /// Creates an instant `millis` milliseconds after the start.
    pub const fn from_millis(millis: u64) -> Self {
        LogicalTime(millis)
    }

    /// Milliseconds since the start of the timeline.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns the instant `delay_ms` later, saturating at `u64::MAX`.
    pub fn after(self, delay_ms: u64) -> Self {
        LogicalTime(self.0.saturating_add(delay_ms))
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A source of logical time.
///
/// Implementations must be monotonic: `advance_to` never moves time backwards.
pub trait Clock: fmt::Debug {
    /// The current instant.
    fn now(&self) -> LogicalTime;

    /// Moves the clock forward to `instant`. Earlier instants are ignored.
    fn advance_to(&self, instant: LogicalTime);
}

/// A manually driven clock.
///
/// Clones share the same timeline, so a test can keep a handle while the
/// event loop advances it.
///
/// # Examples
///
/// ```
/// use core_types::{Clock, LogicalTime, VirtualClock};
///
/// let clock = VirtualClock::new();
/// let observer = clock.clone();
/// clock.advance_to(LogicalTime::from_millis(250));
/// clock.advance_to(LogicalTime::from_millis(100));
/// assert_eq!(observer.now(), LogicalTime::from_millis(250));
/// ```
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<LogicalTime>>,
}

impl VirtualClock {
    /// Creates a clock at [`LogicalTime::ZERO`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock starting at `start`.
    pub fn starting_at(start: LogicalTime) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> LogicalTime {
        self.now.get()
    }

    fn advance_to(&self, instant: LogicalTime) {
        if instant > self.now.get() {
            self.now.set(instant);
        }
    }
}
