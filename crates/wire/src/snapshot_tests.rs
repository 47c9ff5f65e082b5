use reaper_core::test_support::music_job;

use super::*;

#[test]
fn snapshot_round_trips_through_json() {
    let snapshot = StateSnapshot {
        versions: VersionCounters { queue_version: 3, history_version: 1, current_version: 5, scythe_version: 0 },
        queue: vec![music_job(1, "https://example.com/a", "music")],
        current: CurrentDownload::default(),
        history: Vec::new(),
    };
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: StateSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(snapshot, back);
}

#[test]
fn version_counters_default_to_zero() {
    assert_eq!(VersionCounters::default(), VersionCounters {
        queue_version: 0,
        history_version: 0,
        current_version: 0,
        scythe_version: 0,
    });
}
