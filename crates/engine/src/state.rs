// SPDX-License-Identifier: MIT

//! The in-memory authoritative state: queue, current download, version
//! counters, and pause/cancel/stop-mode signaling. Every public mutator
//! holds the same async mutex end to end, including the `Store` write that
//! durably backs it — a [`StoreError`] leaves the in-memory state exactly as
//! it was and never bumps a version counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reaper_core::model::{CurrentDownload, HistoryEntry, Job, JobId, JobSpec, LogId, StopMode};
use reaper_core::Clock;
use reaper_storage::{HistoryUpdate, Store};
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::{Duration, Instant};

use crate::error::EngineResult;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VersionCounters {
    pub queue_version: u64,
    pub history_version: u64,
    pub current_version: u64,
    pub scythe_version: u64,
}

struct StateInner {
    queue: Vec<Job>,
    next_job_id: JobId,
    current: CurrentDownload,
    versions: VersionCounters,
}

pub struct StateManager<C: Clock = reaper_core::SystemClock> {
    inner: Mutex<StateInner>,
    store: Store,
    clock: C,
    queue_notify: Notify,
    paused_tx: watch::Sender<bool>,
    cancel_requested: AtomicBool,
    stop_mode: parking_lot::Mutex<StopMode>,
}

impl<C: Clock> StateManager<C> {
    pub fn new(store: Store, clock: C) -> Arc<Self> {
        let (paused_tx, _) = watch::channel(false);
        Arc::new(Self {
            inner: Mutex::new(StateInner {
                queue: Vec::new(),
                next_job_id: 0,
                current: CurrentDownload::default(),
                versions: VersionCounters::default(),
            }),
            store,
            clock,
            queue_notify: Notify::new(),
            paused_tx,
            cancel_requested: AtomicBool::new(false),
            stop_mode: parking_lot::Mutex::new(StopMode::Cancel),
        })
    }

    /// Exposed so `Worker`/`Scheduler` can stamp their own heartbeats without
    /// each holding a separate clock handle.
    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    /// Populate the in-memory queue from the store. Called once at startup,
    /// after `Recovery` has dealt with any crash-interrupted job.
    pub async fn load_from_store(&self) -> EngineResult<()> {
        let queue = self.store.load_queue().await?;
        let mut inner = self.inner.lock().await;
        inner.next_job_id = queue.iter().map(|j| j.id).max().map_or(0, |m| m + 1);
        inner.queue = queue;
        inner.versions.queue_version += 1;
        Ok(())
    }

    // ── queue ────────────────────────────────────────────────────────────

    pub async fn enqueue_job(&self, spec: JobSpec) -> EngineResult<Job> {
        spec.validate()?;
        let mut inner = self.inner.lock().await;
        let id = inner.next_job_id;
        let job = Job::new(id, spec);
        inner.queue.push(job.clone());
        if let Err(err) = self.store.persist_queue(&inner.queue).await {
            inner.queue.pop();
            return Err(err.into());
        }
        inner.next_job_id += 1;
        inner.versions.queue_version += 1;
        self.queue_notify.notify_waiters();
        Ok(job)
    }

    pub async fn enqueue_many(&self, specs: Vec<JobSpec>) -> EngineResult<Vec<Job>> {
        for spec in &specs {
            spec.validate()?;
        }
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let mut inner = self.inner.lock().await;
        let before_len = inner.queue.len();
        let mut jobs = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = inner.next_job_id;
            inner.next_job_id += 1;
            let job = Job::new(id, spec);
            inner.queue.push(job.clone());
            jobs.push(job);
        }
        if let Err(err) = self.store.persist_queue(&inner.queue).await {
            inner.queue.truncate(before_len);
            return Err(err.into());
        }
        inner.versions.queue_version += 1;
        self.queue_notify.notify_waiters();
        Ok(jobs)
    }

    pub async fn clear_queue(&self) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.queue.is_empty() {
            return Ok(());
        }
        let prior = std::mem::take(&mut inner.queue);
        if let Err(err) = self.store.persist_queue(&inner.queue).await {
            inner.queue = prior;
            return Err(err.into());
        }
        inner.versions.queue_version += 1;
        Ok(())
    }

    pub async fn delete_from_queue(&self, id: JobId) -> EngineResult<bool> {
        let mut inner = self.inner.lock().await;
        let Some(pos) = inner.queue.iter().position(|j| j.id == id) else {
            return Ok(false);
        };
        let removed = inner.queue.remove(pos);
        if let Err(err) = self.store.persist_queue(&inner.queue).await {
            inner.queue.insert(pos, removed);
            return Err(err.into());
        }
        inner.versions.queue_version += 1;
        Ok(true)
    }

    /// Rebuild the queue as `(known ids in the given order) ++ (remaining
    /// jobs, in their prior relative order)`. Unknown ids are ignored.
    pub async fn reorder_queue(&self, ordered_ids: &[JobId]) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        let prior = inner.queue.clone();
        let mut by_id: HashMap<JobId, Job> =
            prior.iter().cloned().map(|j| (j.id, j)).collect();

        let mut next = Vec::with_capacity(prior.len());
        for id in ordered_ids {
            if let Some(job) = by_id.remove(id) {
                next.push(job);
            }
        }
        for job in &prior {
            if let Some(remaining) = by_id.remove(&job.id) {
                next.push(remaining);
            }
        }

        if next == prior {
            return Ok(());
        }
        inner.queue = next;
        if let Err(err) = self.store.persist_queue(&inner.queue).await {
            inner.queue = prior;
            return Err(err.into());
        }
        inner.versions.queue_version += 1;
        Ok(())
    }

    /// Block until a job is available or `timeout` elapses. Used exclusively
    /// by the worker loop. The popped job is also recorded as the durable
    /// `current_job` marker so [`crate::recovery::recover`] can detect a
    /// crash mid-job on the next startup; a failure to record it is logged
    /// but does not block the worker from proceeding.
    pub async fn pop_for_worker(&self, timeout: Duration) -> EngineResult<Option<Job>> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut inner = self.inner.lock().await;
            if !inner.queue.is_empty() {
                let job = inner.queue.remove(0);
                if let Err(err) = self.store.persist_queue(&inner.queue).await {
                    inner.queue.insert(0, job);
                    return Err(err.into());
                }
                inner.versions.queue_version += 1;
                drop(inner);
                if let Err(err) = self.store.set_current_job(&job).await {
                    tracing::warn!(error = %err, "state: failed to record current-job marker");
                }
                return Ok(Some(job));
            }
            drop(inner);

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let _ = tokio::time::timeout(remaining, self.queue_notify.notified()).await;
        }
    }

    /// Clear the durable `current_job` marker. Called by the worker once a
    /// job's history row has been written, i.e. it can no longer be mistaken
    /// for a crash-interrupted job on the next startup.
    pub async fn clear_current_job_marker(&self) {
        if let Err(err) = self.store.clear_current_job().await {
            tracing::warn!(error = %err, "state: failed to clear current-job marker");
        }
    }

    pub async fn queue_snapshot(&self) -> Vec<Job> {
        self.inner.lock().await.queue.clone()
    }

    // ── pause / cancel / stop mode ──────────────────────────────────────

    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        if !*self.paused_tx.borrow() {
            inner.versions.current_version += 1;
        }
        let _ = self.paused_tx.send(true);
    }

    pub async fn resume(&self) {
        let mut inner = self.inner.lock().await;
        if *self.paused_tx.borrow() {
            inner.versions.current_version += 1;
        }
        let _ = self.paused_tx.send(false);
    }

    pub fn watch_paused(&self) -> watch::Receiver<bool> {
        self.paused_tx.subscribe()
    }

    /// Set by the transport layer; observed by the worker both between
    /// iterations and while polling the subprocess.
    pub fn request_stop(&self, mode: StopMode) {
        *self.stop_mode.lock() = mode;
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn stop_mode(&self) -> StopMode {
        *self.stop_mode.lock()
    }

    /// Called by the worker at the top of every loop iteration.
    pub fn reset_stop_signal(&self) {
        self.cancel_requested.store(false, Ordering::SeqCst);
        *self.stop_mode.lock() = StopMode::Cancel;
    }

    // ── history ──────────────────────────────────────────────────────────

    pub async fn add_to_history(&self, entry: HistoryEntry) -> EngineResult<LogId> {
        let log_id = self.store.insert_history(&entry).await?;
        let mut inner = self.inner.lock().await;
        inner.versions.history_version += 1;
        Ok(log_id)
    }

    pub async fn update_history_item(&self, log_id: LogId, update: HistoryUpdate) -> EngineResult<()> {
        self.store.update_history(log_id, update).await?;
        let mut inner = self.inner.lock().await;
        inner.versions.history_version += 1;
        Ok(())
    }

    pub async fn get_history_item(&self, log_id: LogId) -> EngineResult<Option<HistoryEntry>> {
        Ok(self.store.get_history(log_id).await?)
    }

    /// The full history list with `log_path` stripped, matching the
    /// consumer-facing summary view.
    pub async fn history_summary(&self) -> EngineResult<Vec<HistoryEntry>> {
        let mut rows = self.store.list_history().await?;
        for row in &mut rows {
            row.log_path = None;
        }
        Ok(rows)
    }

    pub async fn clear_history(&self) -> EngineResult<Vec<String>> {
        let paths = self.store.clear_history().await?;
        let mut inner = self.inner.lock().await;
        inner.versions.history_version += 1;
        Ok(paths)
    }

    pub async fn delete_from_history(&self, log_id: LogId) -> EngineResult<Option<String>> {
        let path = self.store.delete_history(log_id).await?;
        let mut inner = self.inner.lock().await;
        inner.versions.history_version += 1;
        Ok(path)
    }

    /// Write the INFO row the scheduler emits when a scythe fires.
    pub async fn add_notification(&self, text: impl Into<String>) -> EngineResult<LogId> {
        let entry = HistoryEntry::notification(0, text, self.clock.unix_timestamp());
        self.add_to_history(entry).await
    }

    // ── current download ────────────────────────────────────────────────

    pub async fn update_current<F: FnOnce(&mut CurrentDownload)>(&self, f: F) {
        let mut inner = self.inner.lock().await;
        f(&mut inner.current);
        inner.versions.current_version += 1;
    }

    pub async fn reset_current(&self) {
        let mut inner = self.inner.lock().await;
        inner.current = CurrentDownload::default();
        inner.versions.current_version += 1;
    }

    pub async fn current_snapshot(&self) -> CurrentDownload {
        self.inner.lock().await.current.clone()
    }

    // ── scythes ──────────────────────────────────────────────────────────

    pub async fn bump_scythe_version(&self) {
        let mut inner = self.inner.lock().await;
        inner.versions.scythe_version += 1;
    }

    pub async fn versions(&self) -> VersionCounters {
        self.inner.lock().await.versions
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
