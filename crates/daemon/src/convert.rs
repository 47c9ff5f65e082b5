// SPDX-License-Identifier: MIT

//! `reaper-wire`'s `StateSnapshot`/`VersionCounters` are plain DTOs kept
//! independent of `reaper-engine`; this is where the two get reconciled,
//! right at the transport boundary.

impl From<reaper_engine::broadcaster::StateSnapshot> for reaper_wire::StateSnapshot {
    fn from(snapshot: reaper_engine::broadcaster::StateSnapshot) -> Self {
        Self {
            versions: snapshot.versions.into(),
            queue: snapshot.queue,
            current: snapshot.current,
            history: snapshot.history,
        }
    }
}

impl From<reaper_engine::VersionCounters> for reaper_wire::VersionCounters {
    fn from(versions: reaper_engine::VersionCounters) -> Self {
        Self {
            queue_version: versions.queue_version,
            history_version: versions.history_version,
            current_version: versions.current_version,
            scythe_version: versions.scythe_version,
        }
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
