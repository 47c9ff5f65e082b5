use chrono::{Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use reaper_core::clock::FakeClock;
use reaper_core::model::{Schedule, ScheduleInterval};
use reaper_core::test_support::daily_scythe;
use reaper_storage::Store;

use super::*;

async fn manager() -> (ScytheManager<FakeClock>, std::sync::Arc<StateManager<FakeClock>>) {
    let store = Store::connect_in_memory().await.expect("connect");
    let state = StateManager::new(store.clone(), FakeClock::new());
    let scheduler = Scheduler::new(store.clone(), state.clone(), "UTC");
    (ScytheManager::new(store, state.clone(), scheduler), state)
}

#[tokio::test]
async fn add_assigns_an_id_and_bumps_scythe_version() {
    let (manager, state) = manager().await;
    let id = manager
        .add(daily_scythe(0, "nightly", "02:00"))
        .await
        .expect("add");
    assert!(id > 0);
    assert_eq!(state.versions().await.scythe_version, 1);
}

#[tokio::test]
async fn update_and_delete_round_trip() {
    let (manager, state) = manager().await;
    let id = manager.add(daily_scythe(0, "nightly", "02:00")).await.expect("add");

    let mut scythe = manager.get(id).await.expect("get").expect("present");
    scythe.name = "renamed".to_string();
    manager.update(scythe).await.expect("update");
    assert_eq!(state.versions().await.scythe_version, 2);

    assert!(manager.delete(id).await.expect("delete"));
    assert_eq!(state.versions().await.scythe_version, 3);
    assert!(manager.get(id).await.expect("get").is_none());
}

#[tokio::test]
async fn delete_unknown_id_does_not_bump_version() {
    let (manager, state) = manager().await;
    assert!(!manager.delete(999).await.expect("delete"));
    assert_eq!(state.versions().await.scythe_version, 0);
}

#[test]
fn next_fire_daily_respects_timezone_offset() {
    let tz: Tz = "America/New_York".parse().expect("tz");
    let scythe = daily_scythe(1, "nightly", "12:30");
    let after = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();

    let fire = next_fire(&scythe, tz, after).expect("some trigger");
    let local = fire.with_timezone(&tz);
    assert_eq!((local.hour(), local.minute()), (12, 30));
}

#[test]
fn next_fire_weekly_only_matches_listed_weekdays() {
    let scythe = Scythe {
        id: 1,
        name: "weekly".to_string(),
        job_data: reaper_core::test_support::music_job_spec("https://example/a", "music"),
        schedule: Some(Schedule {
            enabled: true,
            interval: ScheduleInterval::Weekly,
            time: "09:00".to_string(),
            weekdays: vec![2], // Wednesday
        }),
    };
    // 2026-07-28 is a Tuesday.
    let after = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
    let fire = next_fire(&scythe, chrono_tz::UTC, after).expect("some trigger");
    assert_eq!(fire.weekday().num_days_from_monday(), 2);
    assert_eq!(fire.hour(), 9);
}

#[test]
fn next_fire_disabled_schedule_never_fires() {
    let mut scythe = daily_scythe(1, "nightly", "02:00");
    scythe.schedule.as_mut().unwrap().enabled = false;
    let after = Utc::now();
    assert!(next_fire(&scythe, chrono_tz::UTC, after).is_none());
}

#[tokio::test]
async fn fire_enqueues_job_and_writes_notification() {
    let store = Store::connect_in_memory().await.expect("connect");
    let state = StateManager::new(store.clone(), FakeClock::new());
    let scheduler = Scheduler::new(store.clone(), state.clone(), "UTC");
    let scythe = daily_scythe(0, "nightly", "02:00");
    let id = store.upsert_scythe(&scythe).await.expect("insert");
    let mut stored = store.get_scythe(id).await.expect("get").expect("present");
    stored.id = id;

    scheduler.fire(&stored).await;

    let queue = state.queue_snapshot().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].url, stored.job_data.url);

    let history = state.history_summary().await.expect("history");
    assert_eq!(history.len(), 1);
    assert!(history[0].title.as_deref().unwrap().contains("nightly"));
}

#[tokio::test]
async fn fire_skips_a_since_disabled_scythe() {
    let store = Store::connect_in_memory().await.expect("connect");
    let state = StateManager::new(store.clone(), FakeClock::new());
    let scheduler = Scheduler::new(store.clone(), state.clone(), "UTC");
    let mut scythe = daily_scythe(0, "nightly", "02:00");
    let id = store.upsert_scythe(&scythe).await.expect("insert");
    scythe.id = id;
    scythe.schedule.as_mut().unwrap().enabled = false;
    store.upsert_scythe(&scythe).await.expect("update");

    scheduler.fire(&scythe).await;

    assert!(state.queue_snapshot().await.is_empty());
}
