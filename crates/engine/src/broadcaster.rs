// SPDX-License-Identifier: MIT

//! Samples the four version counters on a fixed interval and hands a state
//! snapshot to an `Emit` callback whenever any of them changed. Adapter
//! agnostic: it has no idea whether the transport is a socket, a websocket,
//! or a test double — it just observes change and calls out.

use std::sync::Arc;

use reaper_core::model::{CurrentDownload, HistoryEntry, Job};
use reaper_core::Clock;
use tokio_util::sync::CancellationToken;

use crate::state::{StateManager, VersionCounters};

/// Everything a consumer of a broadcast snapshot needs to render state.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub versions: VersionCounters,
    pub queue: Vec<Job>,
    pub current: CurrentDownload,
    pub history: Vec<HistoryEntry>,
}

pub struct Broadcaster<C: Clock = reaper_core::SystemClock> {
    state: Arc<StateManager<C>>,
    interval: std::time::Duration,
}

impl<C: Clock> Broadcaster<C> {
    pub fn new(state: Arc<StateManager<C>>) -> Self {
        Self { state, interval: std::time::Duration::from_millis(500) }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn with_interval(state: Arc<StateManager<C>>, interval: std::time::Duration) -> Self {
        Self { state, interval }
    }

    /// Runs until `shutdown` is cancelled, calling `emit` once per observed
    /// change. `emit` failures are logged and otherwise ignored — a single
    /// broken subscriber must not stop the loop.
    pub async fn run<F, Fut>(self, shutdown: CancellationToken, mut emit: F)
    where
        F: FnMut(StateSnapshot) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut last = VersionCounters::default();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => return,
            }

            let versions = self.state.versions().await;
            if versions == last {
                continue;
            }
            last = versions;

            let snapshot = StateSnapshot {
                versions,
                queue: self.state.queue_snapshot().await,
                current: self.state.current_snapshot().await,
                history: self.state.history_summary().await.unwrap_or_default(),
            };
            emit(snapshot).await;
        }
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
