// SPDX-License-Identifier: MIT

//! The orchestrator loop: pops one job at a time, runs the extractor as a
//! subprocess, tails its output into progress updates, and finalizes the
//! result into the destination folder.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use reaper_adapters::{kill_group, spawn_extractor, terminate_group, ProgressEvent, ProgressParser};
use reaper_core::command::{build_argv, CommandInputs};
use reaper_core::model::{HistoryEntry, HistoryStatus, Job, JobMode, StopMode};
use reaper_core::sanitize::sanitize;
use reaper_core::Clock;
use reaper_storage::HistoryUpdate;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::monitor::Heartbeat;
use crate::state::StateManager;

/// Paths and binaries the worker needs that aren't carried on a [`Job`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub download_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub yt_dlp_bin: PathBuf,
    pub ffmpeg_dir: PathBuf,
    pub cookie_file: Option<PathBuf>,
    /// Hard ceiling on a single job's runtime; exceeding it forces a FAILED
    /// finish with a timeout note rather than running forever.
    pub process_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            temp_dir: PathBuf::from("temp"),
            logs_dir: PathBuf::from("data/logs"),
            yt_dlp_bin: PathBuf::from("yt-dlp"),
            ffmpeg_dir: PathBuf::from("."),
            cookie_file: None,
            process_timeout: Duration::from_secs(3600),
        }
    }
}

pub struct Worker<C: Clock = reaper_core::SystemClock> {
    state: Arc<StateManager<C>>,
    config: WorkerConfig,
}

/// What finalize produced, handed back to the caller to persist.
struct FinalizeOutcome {
    status: HistoryStatus,
    folder: String,
    filenames: Vec<String>,
    error_summary: Option<String>,
}

impl<C: Clock> Worker<C> {
    pub fn new(state: Arc<StateManager<C>>, config: WorkerConfig) -> Self {
        Self { state, config }
    }

    /// Runs until `shutdown` is cancelled. Every loop iteration waits on the
    /// pause signal, then blocks on the queue for up to one second so the
    /// shutdown flag is re-checked even when the queue stays empty. Beats
    /// `heartbeat` once per iteration so the [`crate::monitor::Monitor`] can
    /// tell this loop apart from a hung one.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken, heartbeat: Arc<Heartbeat>) {
        loop {
            heartbeat.beat(self.state.clock().unix_timestamp());

            if shutdown.is_cancelled() {
                return;
            }

            let mut paused = self.state.watch_paused();
            while *paused.borrow() {
                heartbeat.beat(self.state.clock().unix_timestamp());
                tokio::select! {
                    _ = paused.changed() => {}
                    _ = shutdown.cancelled() => return,
                }
            }

            let job = match self.state.pop_for_worker(Duration::from_secs(1)).await {
                Ok(Some(job)) => job,
                Ok(None) => continue,
                Err(err) => {
                    tracing::error!(error = %err, "worker: failed to pop queue");
                    continue;
                }
            };

            self.state.reset_stop_signal();
            self.run_job(job).await;
        }
    }

    async fn run_job(&self, job: Job) {
        let job_id = job.id;
        let folder_or_url = if job.folder.is_empty() { job.url.clone() } else { job.folder.clone() };

        self.state
            .update_current(|c| {
                c.url = Some(job.url.clone());
                c.status = "Preparing…".to_string();
                c.title = Some(folder_or_url);
                c.job_data = Some(job.clone());
                c.pid = None;
            })
            .await;

        let scratch = self.config.temp_dir.join(format!("job_{job_id}"));
        let active_log_path = self.config.logs_dir.join(format!("job_active_{job_id}.log"));

        if let Err(err) = fs::create_dir_all(&scratch).await {
            self.finish(job, HistoryStatus::Error, &scratch, None, &active_log_path).await;
            tracing::error!(job_id, error = %err, "worker: failed to create scratch directory");
            return;
        }
        if job.archive {
            self.seed_prior_archive(&job, &scratch).await;
        }

        let mut log_file = match fs::File::create(&active_log_path).await {
            Ok(f) => f,
            Err(err) => {
                tracing::error!(job_id, error = %err, "worker: failed to create active log file");
                self.finish(job, HistoryStatus::Error, &scratch, None, &active_log_path).await;
                return;
            }
        };

        let argv = match build_argv(CommandInputs {
            job: &job,
            scratch_dir: &scratch,
            cookie_file: self.config.cookie_file.as_deref(),
            yt_dlp_bin: &self.config.yt_dlp_bin,
            ffmpeg_dir: &self.config.ffmpeg_dir,
        }) {
            Ok(argv) => argv,
            Err(err) => {
                let _ = log_file.write_all(format!("ERROR: {err}\n").as_bytes()).await;
                self.finish(job, HistoryStatus::Error, &scratch, None, &active_log_path).await;
                return;
            }
        };

        let mut child = match spawn_extractor(&argv) {
            Ok(child) => child,
            Err(err) => {
                let _ = log_file.write_all(format!("ERROR: failed to start extractor: {err}\n").as_bytes()).await;
                self.finish(job, HistoryStatus::Error, &scratch, None, &active_log_path).await;
                return;
            }
        };
        let pid = child.pid;
        self.state.update_current(|c| c.pid = Some(pid)).await;

        let (status, resolved_folder) =
            self.supervise(&mut child, pid, &job, &mut log_file).await;

        self.finish(job, status, &scratch, resolved_folder.as_deref(), &active_log_path).await;
    }

    /// Copy a prior run's `archive.txt` into the scratch dir so yt-dlp's
    /// `--download-archive` sees already-downloaded ids. Best-effort: the
    /// file may not exist yet, which is the common case.
    async fn seed_prior_archive(&self, job: &Job, scratch: &Path) {
        let prior = self.config.download_dir.join(sanitize(&job.folder)).join("archive.txt");
        if fs::try_exists(&prior).await.unwrap_or(false) {
            let _ = fs::copy(&prior, scratch.join("archive.temp.txt")).await;
        }
    }

    /// Tail the process's merged output, apply progress updates, and respond
    /// to cancel requests and the hard process timeout. Returns the terminal
    /// status and whatever folder was resolved from the stream (if any).
    async fn supervise(
        &self,
        child: &mut reaper_adapters::ExtractorChild,
        pid: u32,
        job: &Job,
        log_file: &mut fs::File,
    ) -> (HistoryStatus, Option<String>) {
        let parser = ProgressParser::new();
        let mut resolved_folder: Option<String> = None;

        let mut stdout_lines = match child.stdout_lines() {
            Ok(lines) => Some(lines),
            Err(_) => None,
        };
        let mut stderr_lines = match child.stderr_lines() {
            Ok(lines) => Some(lines),
            Err(_) => None,
        };

        let (line_tx, mut line_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        if let Some(mut lines) = stdout_lines.take() {
            let tx = line_tx.clone();
            tokio::spawn(async move {
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        }
        if let Some(mut lines) = stderr_lines.take() {
            tokio::spawn(async move {
                while let Ok(Some(line)) = lines.next_line().await {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
            });
        }

        let wait_result = child.child.wait();
        tokio::pin!(wait_result);

        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        let start = Instant::now();
        let mut cancelled = false;
        let mut timed_out = false;
        let mut stop_signal_sent = false;
        let mut kill_deadline: Option<Instant> = None;

        let mut lines_done = false;
        let mut child_wait_done = false;
        let mut exit_status: Option<ExitStatus> = None;

        while !lines_done || !child_wait_done {
            tokio::select! {
                line = line_rx.recv(), if !lines_done => {
                    match line {
                        Some(line) => {
                            let _ = log_file.write_all(line.as_bytes()).await;
                            let _ = log_file.write_all(b"\n").await;
                            let event = parser.classify(&line);
                            self.apply_progress_event(&event, job, &mut resolved_folder).await;
                        }
                        None => lines_done = true,
                    }
                }
                result = &mut wait_result, if !child_wait_done => {
                    child_wait_done = true;
                    exit_status = result.ok();
                }
                _ = ticker.tick() => {
                    if !timed_out && start.elapsed() > self.config.process_timeout {
                        timed_out = true;
                    }
                    if self.state.cancel_requested() {
                        cancelled = true;
                    }
                    if (timed_out || cancelled) && !stop_signal_sent {
                        let _ = terminate_group(pid);
                        stop_signal_sent = true;
                        kill_deadline = Some(Instant::now() + Duration::from_secs(10));
                    } else if let Some(deadline) = kill_deadline {
                        if Instant::now() >= deadline {
                            let _ = kill_group(pid);
                            kill_deadline = None;
                        }
                    }
                }
            }
        }

        if timed_out {
            let _ = log_file
                .write_all(
                    format!("ERROR: process exceeded timeout of {:?}\n", self.config.process_timeout)
                        .as_bytes(),
                )
                .await;
        }

        let status = if cancelled {
            match self.state.stop_mode() {
                StopMode::Save => HistoryStatus::Stopped,
                StopMode::Cancel => HistoryStatus::Cancelled,
            }
        } else if timed_out {
            HistoryStatus::Failed
        } else {
            match exit_status {
                Some(s) if s.success() => HistoryStatus::Completed,
                Some(_) => HistoryStatus::Failed,
                None => HistoryStatus::Error,
            }
        };

        (status, resolved_folder)
    }

    async fn apply_progress_event(
        &self,
        event: &ProgressEvent,
        job: &Job,
        resolved_folder: &mut Option<String>,
    ) {
        match event {
            ProgressEvent::Downloading { total_bytes, speed_bytes_per_sec, eta_seconds, .. } => {
                let percent = event.percent();
                let file_size = total_bytes.map(format_bytes);
                let speed = speed_bytes_per_sec.map(format_speed);
                let eta = eta_seconds.map(format_eta);
                self.state
                    .update_current(|c| {
                        if let Some(p) = percent {
                            c.progress = p;
                        }
                        c.status = "Downloading".to_string();
                        c.file_size = file_size.clone();
                        c.speed = speed.clone();
                        c.eta = eta.clone();
                    })
                    .await;
            }
            ProgressEvent::Finished => {
                self.state.update_current(|c| c.status = "Processing…".to_string()).await;
            }
            ProgressEvent::ItemInfo { title, playlist_title, thumbnail, playlist_index, playlist_count } => {
                if job.folder.is_empty() && resolved_folder.is_none() {
                    let derived = playlist_title.clone().or_else(|| title.clone()).unwrap_or_default();
                    *resolved_folder = Some(sanitize(&derived));
                }
                let playlist_title_for_current = if playlist_index.is_some() {
                    resolved_folder.clone()
                } else {
                    None
                };
                let title = title.clone();
                let thumbnail = thumbnail.clone();
                let playlist_index = *playlist_index;
                let playlist_count = *playlist_count;
                self.state
                    .update_current(|c| {
                        c.thumbnail = thumbnail.clone();
                        c.track_title = title.clone();
                        c.playlist_index = playlist_index;
                        c.playlist_count = playlist_count;
                        if playlist_title_for_current.is_some() {
                            c.playlist_title = playlist_title_for_current.clone();
                        }
                    })
                    .await;
            }
            ProgressEvent::Processing => {
                self.state.update_current(|c| c.status = "Processing…".to_string()).await;
            }
            ProgressEvent::LogLine => {}
        }
    }

    /// Finalize the job (see [`finalize`]) and persist the resulting history
    /// row, renaming the active log into its permanent `job_<log_id>.log`
    /// name once the row's id is known.
    async fn finish(
        &self,
        job: Job,
        status: HistoryStatus,
        scratch: &Path,
        resolved_folder: Option<&str>,
        active_log_path: &Path,
    ) {
        let outcome = self.finalize(&job, status, scratch, resolved_folder, active_log_path).await;

        let entry = HistoryEntry {
            log_id: 0,
            url: job.url.clone(),
            title: Some(outcome.folder.clone()),
            folder: Some(outcome.folder.clone()),
            filenames: outcome.filenames,
            job_data: Some(job),
            status: outcome.status,
            log_path: None,
            error_summary: outcome.error_summary,
            timestamp: 0,
        };

        match self.state.add_to_history(entry).await {
            Ok(log_id) => {
                let permanent_log_path = self.config.logs_dir.join(format!("job_{log_id}.log"));
                let log_path_field = if fs::rename(active_log_path, &permanent_log_path).await.is_ok() {
                    Some(format!("job_{log_id}.log"))
                } else {
                    None
                };
                if log_path_field.is_some() {
                    let _ = self
                        .state
                        .update_history_item(
                            log_id,
                            HistoryUpdate { log_path: log_path_field, ..Default::default() },
                        )
                        .await;
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "worker: failed to persist history row");
            }
        }

        self.state.clear_current_job_marker().await;
        self.state.reset_current().await;
    }

    async fn finalize(
        &self,
        job: &Job,
        status: HistoryStatus,
        scratch: &Path,
        resolved_folder: Option<&str>,
        active_log_path: &Path,
    ) -> FinalizeOutcome {
        let chosen_folder = resolved_folder
            .filter(|s| !s.trim().is_empty())
            .or_else(|| Some(job.folder.as_str()).filter(|s| !s.trim().is_empty()));
        let final_folder = match chosen_folder {
            Some(raw) => sanitize(raw),
            None => "Misc Downloads".to_string(),
        };
        let dest = self.config.download_dir.join(&final_folder);

        let mut filenames = Vec::new();
        if matches!(status, HistoryStatus::Completed | HistoryStatus::Partial | HistoryStatus::Stopped) {
            filenames = self.promote_files(job, scratch, &dest).await;
        }

        let archive_temp = scratch.join("archive.temp.txt");
        if fs::try_exists(&archive_temp).await.unwrap_or(false) {
            let _ = fs::create_dir_all(&dest).await;
            let _ = fs::rename(&archive_temp, dest.join("archive.txt")).await;
        }

        let status = if !filenames.is_empty() { status.reclassify_on_partial_success() } else { status };

        let error_summary = if status.wants_error_summary() {
            scan_error_summary(active_log_path).await
        } else {
            None
        };

        remove_scratch_with_retry(scratch).await;

        FinalizeOutcome { status, folder: final_folder, filenames, error_summary }
    }

    async fn promote_files(&self, job: &Job, scratch: &Path, dest: &Path) -> Vec<String> {
        let expected_ext = expected_extension(&job.mode);
        let mut filenames = Vec::new();

        let Ok(mut entries) = fs::read_dir(scratch).await else {
            return filenames;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(file_type) = entry.file_type().await else { continue };
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "archive.temp.txt" {
                continue;
            }
            let matches = match &expected_ext {
                Some(ext) => name.to_lowercase().ends_with(&format!(".{}", ext.to_lowercase())),
                None => true,
            };
            if !matches {
                continue;
            }

            if fs::create_dir_all(dest).await.is_err() {
                continue;
            }
            let sanitized_name = sanitize(&name);
            let dest_path = unique_destination(dest, &sanitized_name).await;
            if fs::rename(entry.path(), &dest_path).await.is_ok() {
                if let Some(name) = dest_path.file_name() {
                    filenames.push(name.to_string_lossy().into_owned());
                }
            }
        }
        filenames
    }
}

/// The extension promoted files must match, or `None` for a custom job
/// (which promotes every non-archive file in scratch).
fn expected_extension(mode: &JobMode) -> Option<String> {
    match mode {
        JobMode::Music { format, .. } => Some(format.clone()),
        JobMode::Video { format, .. } => Some(format.clone()),
        JobMode::Clip { format } => Some(match format {
            reaper_core::model::ClipFormat::Audio => "mp3".to_string(),
            reaper_core::model::ClipFormat::Video => "mp4".to_string(),
        }),
        JobMode::Custom { .. } => None,
    }
}

async fn unique_destination(dest_dir: &Path, filename: &str) -> PathBuf {
    let candidate = dest_dir.join(filename);
    if !path_exists(&candidate).await {
        return candidate;
    }
    let (stem, ext) = split_extension(filename);
    let mut n = 1u32;
    loop {
        let name = match &ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = dest_dir.join(&name);
        if !path_exists(&candidate).await {
            return candidate;
        }
        n += 1;
    }
}

fn split_extension(name: &str) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext.to_string())),
        _ => (name.to_string(), None),
    }
}

async fn path_exists(p: &Path) -> bool {
    fs::try_exists(p).await.unwrap_or(false)
}

/// Keep only lines containing `ERROR:` or `WARNING:`, the last 10 of them.
async fn scan_error_summary(log_path: &Path) -> Option<String> {
    let contents = fs::read_to_string(log_path).await.ok()?;
    let matches: Vec<&str> = contents
        .lines()
        .filter(|line| line.contains("ERROR:") || line.contains("WARNING:"))
        .collect();
    if matches.is_empty() {
        return None;
    }
    let tail: Vec<&str> = matches[matches.len().saturating_sub(10)..].to_vec();
    Some(tail.join("\n"))
}

/// Remove the scratch directory, retrying a handful of times; Windows can
/// briefly hold a file handle open after the child process exits.
async fn remove_scratch_with_retry(scratch: &Path) {
    for attempt in 0..5u32 {
        match fs::remove_dir_all(scratch).await {
            Ok(()) => return,
            Err(_) if attempt < 4 => {
                tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt + 1))).await;
            }
            Err(err) => {
                tracing::warn!(error = %err, path = %scratch.display(), "worker: failed to remove scratch directory");
                return;
            }
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0) as u64))
}

fn format_eta(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
