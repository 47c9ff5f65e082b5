// SPDX-License-Identifier: MIT

use reaper_core::model::{HistoryEntry, JobId, JobSpec, LogId, Permissions, Scythe, ScytheId, StopMode};
use serde::{Deserialize, Serialize};

/// Partial update applied to an existing history row; mirrors
/// `reaper_storage::HistoryUpdate` so this crate doesn't need to depend on
/// storage for a handful of `Option` fields. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryUpdate {
    #[serde(default)]
    pub status: Option<reaper_core::model::HistoryStatus>,
    #[serde(default)]
    pub filenames: Option<Vec<String>>,
    #[serde(default)]
    pub error_summary: Option<String>,
    #[serde(default)]
    pub log_path: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
}

/// Fields to change on an existing user; mirrors `reaper_engine::UserUpdate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
}

/// One call the CLI (or any other client of the socket) can make. One
/// variant per Consumer API operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Request {
    // ── queue ────────────────────────────────────────────────────────────
    Enqueue { spec: JobSpec },
    EnqueueMany { specs: Vec<JobSpec> },
    ClearQueue,
    DeleteFromQueue { id: JobId },
    ReorderQueue { ids: Vec<JobId> },

    // ── run control ──────────────────────────────────────────────────────
    Pause,
    Resume,
    RequestStop { mode: StopMode },

    // ── history ──────────────────────────────────────────────────────────
    AddToHistory { entry: HistoryEntry },
    UpdateHistoryItem { log_id: LogId, update: HistoryUpdate },
    GetHistoryItem { log_id: LogId },
    HistorySummary,
    ClearHistory,
    DeleteFromHistory { log_id: LogId },
    AddNotification { text: String },

    // ── snapshot / versions ──────────────────────────────────────────────
    Snapshot,
    Versions,

    // ── scythes ──────────────────────────────────────────────────────────
    ScytheList,
    ScytheGet { id: ScytheId },
    ScytheAdd { scythe: Scythe },
    ScytheUpdate { scythe: Scythe },
    ScytheDelete { id: ScytheId },

    // ── users ────────────────────────────────────────────────────────────
    UserGet { username: String },
    UserList,
    UserAdd { username: String, password: Option<String>, permissions: Permissions },
    UserUpdate { username: String, update: UserUpdate },
    UserDelete { username: String },
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
