// SPDX-License-Identifier: MIT

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::model::{
    ClipFormat, HistoryEntry, HistoryStatus, Job, JobId, JobMode, JobSpec, LogId, Schedule,
    ScheduleInterval, Scythe, ScytheId,
};

pub fn music_job_spec(url: &str, folder: &str) -> JobSpec {
    JobSpec {
        url: url.to_string(),
        folder: folder.to_string(),
        resolved_folder: None,
        archive: false,
        playlist_start: None,
        playlist_end: None,
        proxy: None,
        rate_limit: None,
        mode: JobMode::Music {
            format: "mp3".to_string(),
            quality: "0".to_string(),
        },
    }
}

pub fn clip_job_spec(url: &str, format: ClipFormat) -> JobSpec {
    JobSpec {
        url: url.to_string(),
        folder: String::new(),
        resolved_folder: None,
        archive: false,
        playlist_start: None,
        playlist_end: None,
        proxy: None,
        rate_limit: None,
        mode: JobMode::Clip { format },
    }
}

pub fn music_job(id: JobId, url: &str, folder: &str) -> Job {
    Job::new(id, music_job_spec(url, folder))
}

pub fn completed_history_entry(log_id: LogId, job: &Job, filenames: Vec<String>) -> HistoryEntry {
    HistoryEntry {
        log_id,
        url: job.url.clone(),
        title: Some(job.effective_folder().to_string()),
        folder: Some(job.effective_folder().to_string()),
        filenames,
        job_data: Some(job.clone()),
        status: HistoryStatus::Completed,
        log_path: Some(format!("job_{log_id}.log")),
        error_summary: None,
        timestamp: 1_700_000_000,
    }
}

pub fn daily_scythe(id: ScytheId, name: &str, time: &str) -> Scythe {
    Scythe {
        id,
        name: name.to_string(),
        job_data: music_job_spec(&format!("https://example.com/{name}"), name),
        schedule: Some(Schedule {
            enabled: true,
            interval: ScheduleInterval::Daily,
            time: time.to_string(),
            weekdays: Vec::new(),
        }),
    }
}
