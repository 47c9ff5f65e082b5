// SPDX-License-Identifier: MIT

//! Subprocess supervision and progress-line parsing for the extractor
//! process. Everything here is an I/O boundary: spawning, signaling, and
//! tailing a child process's output.

pub mod error;
pub mod progress;
pub mod subprocess;

pub use error::{AdapterError, AdapterResult};
pub use progress::{ProgressEvent, ProgressParser};
pub use subprocess::{kill_group, spawn_extractor, terminate_group, ExtractorChild};
