// SPDX-License-Identifier: MIT

use thiserror::Error;

pub type DaemonResult<T> = Result<T, DaemonError>;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Store(#[from] reaper_storage::StoreError),

    #[error(transparent)]
    Engine(#[from] reaper_engine::EngineError),

    #[error(transparent)]
    Wire(#[from] reaper_wire::ProtocolError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("another daemon instance is already running (lock held at {})", .0.display())]
    AlreadyRunning(std::path::PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
