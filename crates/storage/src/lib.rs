// SPDX-License-Identifier: MIT

//! Embedded-SQLite persistence: the one piece of the system allowed to talk
//! to the database file directly. The state manager in `reaper-engine` is
//! the only caller (besides `UserManager`).

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{HistoryUpdate, Store};
