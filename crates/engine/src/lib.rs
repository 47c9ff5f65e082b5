// SPDX-License-Identifier: MIT

//! Orchestration layer: the in-memory [`StateManager`], the [`Worker`] that
//! drives the extractor subprocess, the [`Scheduler`]/[`ScytheManager`] pair
//! that fires saved job templates, and the ambient [`UserManager`].

pub mod broadcaster;
pub mod error;
pub mod monitor;
pub mod recovery;
pub mod scythe_manager;
pub mod state;
pub mod user_manager;
pub mod worker;

pub use broadcaster::Broadcaster;
pub use error::{EngineError, EngineResult};
pub use monitor::Monitor;
pub use recovery::recover;
pub use scythe_manager::{Scheduler, ScytheManager};
pub use state::{StateManager, VersionCounters};
pub use user_manager::{UserManager, UserUpdate};
pub use worker::{Worker, WorkerConfig};
