// SPDX-License-Identifier: MIT

//! Shared data model and pure domain logic for the download-orchestration service.
//!
//! This crate has no I/O: it defines the [`Job`], [`HistoryEntry`], [`Scythe`] and
//! [`Config`] records, the filename [`sanitize`] rules, and the extractor
//! [`command`] builder. Everything that touches a filesystem, a subprocess, or a
//! database lives in `reaper-storage`, `reaper-adapters`, or `reaper-engine`.

pub mod clock;
pub mod command;
pub mod error;
pub mod model;
pub mod sanitize;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use model::{
    Config, CurrentDownload, HistoryEntry, HistoryStatus, Job, JobMode, Schedule,
    ScheduleInterval, Scythe, StopMode, User,
};
