// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use reaper_wire::ProtocolError;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing required argument {0}")]
    MissingArg(&'static str),

    #[error("could not connect to daemon socket {}: {1}", .0.display())]
    Connect(PathBuf, #[source] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("daemon rejected the request: {0}")]
    Rejected(String),
}
