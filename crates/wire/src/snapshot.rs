// SPDX-License-Identifier: MIT

//! The push payload the Broadcaster hands to the transport layer. A plain
//! data copy, independent of `reaper-engine`'s own `StateSnapshot` — the
//! daemon converts one into the other at the transport boundary so this
//! crate never needs to depend on the engine.

use reaper_core::model::{CurrentDownload, HistoryEntry, Job};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCounters {
    pub queue_version: u64,
    pub history_version: u64,
    pub current_version: u64,
    pub scythe_version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub versions: VersionCounters,
    pub queue: Vec<Job>,
    pub current: CurrentDownload,
    pub history: Vec<HistoryEntry>,
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
