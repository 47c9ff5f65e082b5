// SPDX-License-Identifier: MIT

//! Scythe CRUD plus the schedule tick loop that fires them.
//!
//! Timezone math is the one place this crate reaches past the corpus: nothing
//! in the teacher repo converts a wall-clock time between timezones, so this
//! is built directly on `chrono`/`chrono-tz` rather than imitated from an
//! example.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, LocalResult, TimeZone, Utc};
use chrono_tz::Tz;
use reaper_core::model::{Schedule, ScheduleInterval, Scythe, ScytheId};
use reaper_core::Clock;
use reaper_storage::Store;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::EngineResult;
use crate::state::StateManager;

pub struct ScytheManager<C: Clock = reaper_core::SystemClock> {
    store: Store,
    state: Arc<StateManager<C>>,
    scheduler: Arc<Scheduler<C>>,
}

impl<C: Clock> ScytheManager<C> {
    pub fn new(store: Store, state: Arc<StateManager<C>>, scheduler: Arc<Scheduler<C>>) -> Self {
        Self { store, state, scheduler }
    }

    pub async fn list(&self) -> EngineResult<Vec<Scythe>> {
        Ok(self.store.list_scythes().await?)
    }

    pub async fn get(&self, id: ScytheId) -> EngineResult<Option<Scythe>> {
        Ok(self.store.get_scythe(id).await?)
    }

    pub async fn add(&self, mut scythe: Scythe) -> EngineResult<ScytheId> {
        scythe.id = 0;
        let id = self.store.upsert_scythe(&scythe).await?;
        self.state.bump_scythe_version().await;
        self.scheduler.reload();
        Ok(id)
    }

    pub async fn update(&self, scythe: Scythe) -> EngineResult<ScytheId> {
        let id = self.store.upsert_scythe(&scythe).await?;
        self.state.bump_scythe_version().await;
        self.scheduler.reload();
        Ok(id)
    }

    pub async fn delete(&self, id: ScytheId) -> EngineResult<bool> {
        let removed = self.store.delete_scythe(id).await?;
        if removed {
            self.state.bump_scythe_version().await;
            self.scheduler.reload();
        }
        Ok(removed)
    }
}

/// Fires due [`Scythe`]s by enqueueing a copy of their saved job template.
///
/// `reload()` wakes the tick loop immediately (used after Scythe CRUD); the
/// loop otherwise sleeps until the earliest known trigger, capped at 60 s so
/// a clock change or a newly-added daily trigger is never missed by long.
pub struct Scheduler<C: Clock = reaper_core::SystemClock> {
    store: Store,
    state: Arc<StateManager<C>>,
    timezone: Tz,
    reload_notify: Notify,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(store: Store, state: Arc<StateManager<C>>, timezone_name: &str) -> Arc<Self> {
        let timezone = Tz::from_str(timezone_name).unwrap_or(chrono_tz::UTC);
        Arc::new(Self {
            store,
            state,
            timezone,
            reload_notify: Notify::new(),
        })
    }

    /// Wake the tick loop so it recomputes triggers against the latest
    /// Scythe list. Called by [`ScytheManager`] after every CRUD operation.
    pub fn reload(&self) {
        self.reload_notify.notify_one();
    }

    pub async fn run(self: Arc<Self>, shutdown: CancellationToken, heartbeat: Arc<crate::monitor::Heartbeat>) {
        let mut last_checked = Utc::now();
        loop {
            heartbeat.beat(self.state.clock().unix_timestamp());

            let scythes = match self.store.list_scythes().await {
                Ok(s) => s,
                Err(err) => {
                    tracing::error!(error = %err, "scheduler: failed to list scythes");
                    Vec::new()
                }
            };

            let now = Utc::now();
            let due: Vec<&Scythe> = scythes
                .iter()
                .filter(|s| next_fire(s, self.timezone, last_checked).is_some_and(|t| t <= now))
                .collect();

            for scythe in due {
                self.fire(scythe).await;
            }
            last_checked = now;

            let next = scythes
                .iter()
                .filter_map(|s| next_fire(s, self.timezone, now))
                .min();
            let sleep_for = next
                .map(|t| (t - Utc::now()).to_std().unwrap_or_default())
                .unwrap_or(std::time::Duration::from_secs(60))
                .min(std::time::Duration::from_secs(60));

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.reload_notify.notified() => {}
                _ = shutdown.cancelled() => return,
            }
        }
    }

    async fn fire(&self, scythe: &Scythe) {
        let Ok(Some(current)) = self.store.get_scythe(scythe.id).await else {
            tracing::info!(scythe_id = scythe.id, "scheduler: scythe vanished before firing, skipping");
            return;
        };
        if !current.schedule.as_ref().is_some_and(|s| s.enabled) {
            tracing::info!(scythe_id = scythe.id, "scheduler: scythe disabled before firing, skipping");
            return;
        }

        let mut spec = current.job_data.clone();
        spec.resolved_folder = Some(spec.folder.clone());
        if let Err(err) = self.state.enqueue_job(spec).await {
            tracing::error!(scythe_id = scythe.id, error = %err, "scheduler: failed to enqueue reaped job");
            return;
        }
        let _ = self
            .state
            .add_notification(format!("Scythe '{}' was automatically reaped.", current.name))
            .await;
    }
}

/// The next UTC instant, strictly after `after`, at which `scythe`'s schedule
/// is due. `None` if the schedule is disabled, malformed, or has no weekdays.
fn next_fire(scythe: &Scythe, timezone: Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let schedule = scythe.schedule.as_ref()?;
    if !schedule.enabled {
        return None;
    }
    let (hour, minute) = parse_hhmm(&schedule.time)?;
    let after_local = after.with_timezone(&timezone);

    (0..=7)
        .filter_map(|offset| {
            let date = after_local.date_naive() + ChronoDuration::days(offset);
            if !date_matches(schedule, date.weekday().num_days_from_monday() as u8) {
                return None;
            }
            let naive = date.and_hms_opt(hour, minute, 0)?;
            match timezone.from_local_datetime(&naive) {
                LocalResult::Single(dt) => Some(dt),
                LocalResult::Ambiguous(earliest, _) => Some(earliest),
                LocalResult::None => None,
            }
        })
        .map(|dt| dt.with_timezone(&Utc))
        .find(|dt| *dt > after)
}

fn date_matches(schedule: &Schedule, iso_weekday: u8) -> bool {
    match schedule.interval {
        ScheduleInterval::Daily => true,
        ScheduleInterval::Weekly => schedule.weekdays.contains(&iso_weekday),
    }
}

fn parse_hhmm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    Some((h.parse().ok()?, m.parse().ok()?))
}

#[cfg(test)]
#[path = "scythe_manager_tests.rs"]
mod tests;
