use reaper_core::model::{CurrentDownload, HistoryEntry, HistoryStatus};
use reaper_engine::broadcaster::StateSnapshot as EngineSnapshot;
use reaper_engine::VersionCounters as EngineVersions;

use super::*;

#[test]
fn version_counters_convert_field_for_field() {
    let versions = EngineVersions { queue_version: 1, history_version: 2, current_version: 3, scythe_version: 4 };

    let wire: reaper_wire::VersionCounters = versions.into();

    assert_eq!(wire.queue_version, 1);
    assert_eq!(wire.history_version, 2);
    assert_eq!(wire.current_version, 3);
    assert_eq!(wire.scythe_version, 4);
}

#[test]
fn state_snapshot_carries_queue_and_history_through() {
    let entry = HistoryEntry::notification(0, "hello", 0);
    let snapshot = EngineSnapshot {
        versions: EngineVersions::default(),
        queue: Vec::new(),
        current: CurrentDownload::default(),
        history: vec![entry],
    };

    let wire: reaper_wire::StateSnapshot = snapshot.into();

    assert_eq!(wire.history.len(), 1);
    assert_eq!(wire.history[0].status, HistoryStatus::Info);
}
