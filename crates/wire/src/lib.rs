// SPDX-License-Identifier: MIT

//! The local transport protocol: newline-delimited JSON `Request`/`Response`
//! records exchanged over a Unix domain socket, standing in for a real HTTP
//! or websocket API. One [`Request`] variant per Consumer API operation (see
//! the engine crate's `StateManager`/`ScytheManager`/`UserManager`); one
//! matching [`Response`] variant, plus an unsolicited `Event` push used by
//! the Broadcaster.

mod codec;
mod request;
mod response;
mod snapshot;

pub use codec::{
    decode, encode, read_message, read_request, write_message, write_response, ProtocolError,
    DEFAULT_TIMEOUT, MAX_LINE_BYTES,
};
pub use request::{HistoryUpdate, Request, UserUpdate};
pub use response::Response;
pub use snapshot::{StateSnapshot, VersionCounters};
