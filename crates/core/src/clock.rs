// SPDX-License-Identifier: MIT

//! Clock abstraction for testable time handling.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time.
///
/// The [`Scheduler`](crate) and history timestamps go through this trait so
/// tests can advance time deterministically instead of sleeping.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
    fn unix_timestamp(&self) -> i64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_timestamp(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
    unix_timestamp: Arc<Mutex<i64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
            unix_timestamp: Arc::new(Mutex::new(1_700_000_000)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
        *self.unix_timestamp.lock() += duration.as_secs() as i64;
    }

    /// Set the unix timestamp value returned by `unix_timestamp`.
    pub fn set_unix_timestamp(&self, ts: i64) {
        *self.unix_timestamp.lock() = ts;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }

    fn unix_timestamp(&self) -> i64 {
        *self.unix_timestamp.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
