//! Clock adapters.
//!
//! `SystemClock` reads the wall clock; `ManualClock` is a hand-advanced
//! time source for scheduler tests.

use std::sync::Mutex;

use crate::domain::foundation::Timestamp;
use crate::ports::Clock;

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually advanced clock for tests.
///
/// Jobs driven by this clock run on virtual time: tests set or advance
/// the instant instead of sleeping.
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock to an absolute instant.
    pub fn set(&self, now: Timestamp) {
        *self.now.lock().expect("clock lock") = now;
    }

    /// Advances the clock by whole days.
    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().expect("clock lock");
        *now = now.add_days(days);
    }

    /// Advances the clock by hours.
    pub fn advance_hours(&self, hours: i64) {
        let mut now = self.now.lock().expect("clock lock");
        *now = now.add_hours(hours);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().expect("clock lock")
    }
}
