// SPDX-License-Identifier: MIT

use reaper_core::model::{HistoryEntry, Job, LogId, Scythe, ScytheId, User};
use serde::{Deserialize, Serialize};

use crate::snapshot::{StateSnapshot, VersionCounters};

/// What the daemon sends back. `Event` is unsolicited: the Broadcaster pushes
/// one down every open connection whenever the sampled version counters move,
/// interleaved with whatever `Request`/`Response` pairs that connection is
/// also carrying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success with no payload (Pause, Resume, RequestStop, ...).
    Ok,

    Job { job: Job },
    Jobs { jobs: Vec<Job> },
    Queue { queue: Vec<Job> },
    Deleted { removed: bool },

    HistoryLogId { log_id: LogId },
    HistoryItem { entry: Option<HistoryEntry> },
    HistorySummary { entries: Vec<HistoryEntry> },
    HistoryCleared { log_paths: Vec<String> },
    HistoryLogPath { log_path: Option<String> },

    Snapshot { snapshot: StateSnapshot },
    Versions { versions: VersionCounters },

    Scythes { scythes: Vec<Scythe> },
    Scythe { scythe: Option<Scythe> },
    ScytheId { id: ScytheId },

    User { user: Option<User> },
    Users { users: Vec<User> },

    /// A version bump pushed by the Broadcaster, not a reply to any request.
    Event { snapshot: StateSnapshot },

    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
