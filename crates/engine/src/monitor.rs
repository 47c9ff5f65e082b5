// SPDX-License-Identifier: MIT

//! Liveness watchdog: the Worker and Scheduler each publish a heartbeat
//! timestamp; this task periodically checks both are recent and logs at
//! `error` level if either has gone stale. It never restarts anything —
//! that decision belongs to whatever supervises the process.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reaper_core::Clock;
use tokio_util::sync::CancellationToken;

/// A heartbeat a long-running task publishes on every loop iteration.
#[derive(Default)]
pub struct Heartbeat(AtomicI64);

impl Heartbeat {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn beat(&self, now: i64) {
        self.0.store(now, Ordering::Relaxed);
    }

    pub fn last(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct Monitor<C: Clock = reaper_core::SystemClock> {
    clock: C,
    worker: Arc<Heartbeat>,
    scheduler: Arc<Heartbeat>,
    check_interval: Duration,
    stale_after: Duration,
}

impl<C: Clock> Monitor<C> {
    pub fn new(clock: C, worker: Arc<Heartbeat>, scheduler: Arc<Heartbeat>) -> Self {
        Self {
            clock,
            worker,
            scheduler,
            check_interval: Duration::from_secs(5),
            stale_after: Duration::from_secs(30),
        }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn with_timing(mut self, check_interval: Duration, stale_after: Duration) -> Self {
        self.check_interval = check_interval;
        self.stale_after = stale_after;
        self
    }

    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                _ = shutdown.cancelled() => return,
            }
            self.check_one("worker", &self.worker);
            self.check_one("scheduler", &self.scheduler);
        }
    }

    fn check_one(&self, name: &str, heartbeat: &Heartbeat) {
        let age = self.age_of(heartbeat);
        if self.is_stale(age) {
            tracing::error!(task = name, age_seconds = age, "monitor: task heartbeat is stale");
        }
    }

    fn age_of(&self, heartbeat: &Heartbeat) -> i64 {
        self.clock.unix_timestamp() - heartbeat.last()
    }

    fn is_stale(&self, age_seconds: i64) -> bool {
        age_seconds > self.stale_after.as_secs() as i64
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
