// SPDX-License-Identifier: MIT

//! The data model shared by the store, the state manager, and the worker.

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub type JobId = i64;
pub type LogId = i64;
pub type ScytheId = i64;

/// Per-mode extractor options. Internally tagged on `mode` and flattened into
/// [`JobSpec`] so the JSON shape matches a flat job record: `{"mode": "music", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JobMode {
    Music {
        format: String,
        quality: String,
    },
    Video {
        quality: String,
        format: String,
        #[serde(default)]
        embed_subs: bool,
        codec: VideoCodec,
    },
    Clip {
        format: ClipFormat,
    },
    Custom {
        custom_args: String,
    },
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Music { .. } => "music",
            JobMode::Video { .. } => "video",
            JobMode::Clip { .. } => "clip",
            JobMode::Custom { .. } => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// Force a widely-compatible container/codec pairing.
    Compatibility,
    /// Prefer the highest-quality stream yt-dlp can find for the requested height.
    Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipFormat {
    Audio,
    Video,
}

/// Everything about a job except its queue identity. Embedded by [`Job`] (via
/// `#[serde(flatten)]`) and reused as-is for a [`Scythe`]'s saved template,
/// which has no id of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub url: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_folder: Option<String>,
    #[serde(default)]
    pub archive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_end: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<String>,
    #[serde(flatten)]
    pub mode: JobMode,
}

impl JobSpec {
    pub fn validate(&self) -> CoreResult<()> {
        if self.url.trim().is_empty() {
            return Err(CoreError::validation("url must not be empty"));
        }
        if let (Some(start), Some(end)) = (self.playlist_start, self.playlist_end) {
            if start > end {
                return Err(CoreError::validation(
                    "playlist_start must be <= playlist_end",
                ));
            }
        }
        Ok(())
    }

    /// The folder to use for promotion: the resolved folder if the worker has
    /// set one, else the user-supplied folder.
    pub fn effective_folder(&self) -> &str {
        self.resolved_folder.as_deref().unwrap_or(&self.folder)
    }
}

/// A single queued or running unit of work.
///
/// `Job` derefs to [`JobSpec`] so call sites that only care about the
/// download parameters (the command builder, the worker) don't have to
/// thread `.spec` through every access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(flatten)]
    pub spec: JobSpec,
}

impl Job {
    pub fn new(id: JobId, spec: JobSpec) -> Self {
        Self { id, spec }
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.spec.validate()
    }
}

impl Deref for Job {
    type Target = JobSpec;

    fn deref(&self) -> &Self::Target {
        &self.spec
    }
}

impl DerefMut for Job {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.spec
    }
}

/// Outcome of one finished (or abandoned) job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryStatus {
    Completed,
    Partial,
    Failed,
    Cancelled,
    Stopped,
    Abandoned,
    Error,
    /// A scheduler-emitted notification row; carries no files or job data.
    Info,
}

impl HistoryStatus {
    /// Whether a log's error/warning tail should be attached as `error_summary`.
    pub fn wants_error_summary(self) -> bool {
        matches!(
            self,
            HistoryStatus::Failed | HistoryStatus::Error | HistoryStatus::Abandoned | HistoryStatus::Partial
        )
    }

    /// A FAILED job that nonetheless promoted at least one file is reclassified
    /// as PARTIAL at finalize time.
    pub fn reclassify_on_partial_success(self) -> Self {
        if self == HistoryStatus::Failed {
            HistoryStatus::Partial
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub log_id: LogId,
    pub url: String,
    pub title: Option<String>,
    pub folder: Option<String>,
    #[serde(default)]
    pub filenames: Vec<String>,
    pub job_data: Option<Job>,
    pub status: HistoryStatus,
    pub log_path: Option<String>,
    pub error_summary: Option<String>,
    pub timestamp: i64,
}

impl HistoryEntry {
    /// Build the INFO row the scheduler writes when a scythe fires.
    pub fn notification(log_id: LogId, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            log_id,
            url: String::new(),
            title: Some(text.into()),
            folder: None,
            filenames: Vec::new(),
            job_data: None,
            status: HistoryStatus::Info,
            log_path: None,
            error_summary: None,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleInterval {
    Daily,
    Weekly,
}

/// A cron-style trigger for a [`Scythe`], expressed in the owning user's
/// timezone. `weekdays` uses ISO weekday numbering with Monday = 0 and is
/// only consulted when `interval` is [`ScheduleInterval::Weekly`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub enabled: bool,
    pub interval: ScheduleInterval,
    /// "HH:MM" in the user's configured timezone.
    pub time: String,
    #[serde(default)]
    pub weekdays: Vec<u8>,
}

/// A saved job template, optionally fired by the [`Schedule`] engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scythe {
    pub id: ScytheId,
    pub name: String,
    pub job_data: JobSpec,
    pub schedule: Option<Schedule>,
}

/// The transient snapshot of whatever the worker is doing right now. All
/// fields are `None`/zero when idle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentDownload {
    pub url: Option<String>,
    pub job_data: Option<Job>,
    pub progress: f32,
    pub status: String,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub playlist_title: Option<String>,
    pub track_title: Option<String>,
    pub playlist_index: Option<u32>,
    pub playlist_count: Option<u32>,
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub file_size: Option<String>,
    pub log_path: Option<String>,
    pub pid: Option<u32>,
}

/// Which outcome a user-requested stop should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    #[default]
    Cancel,
    Save,
}

/// Process-wide configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub download_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub server_host: String,
    pub server_port: u16,
    pub log_level: String,
    pub user_timezone: String,
    pub public_user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            temp_dir: PathBuf::from("temp"),
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            log_level: "info".to_string(),
            user_timezone: "UTC".to_string(),
            public_user: None,
        }
    }
}

/// Per-user permissions. `custom_mode` gates whether the transport layer
/// allows a user to submit a [`JobMode::Custom`] job; unrecognized keys
/// round-trip through `extra` so a future permission doesn't need a schema
/// migration to be stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub custom_mode: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
