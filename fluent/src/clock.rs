//! The clock the periodic scheduler reads.
//!
//! Production nodes read the system clock; tests swap in a [`MockClock`] and
//! advance it by hand, so periodic cadence can be asserted without sleeping.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::row::TimePoint;

/// A source of wall-clock instants.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> TimePoint;
}

/// The real clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimePoint {
        TimePoint::now()
    }
}

/// A clock that only moves when told to.
#[derive(Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<TimePoint>>,
}

impl MockClock {
    /// A mock clock pinned at the epoch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().advanced(by));
    }

    /// Pins the clock to an instant.
    pub fn set(&self, to: TimePoint) {
        self.now.set(to);
    }
}

impl Clock for MockClock {
    fn now(&self) -> TimePoint {
        self.now.get()
    }
}
