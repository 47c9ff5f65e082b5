// SPDX-License-Identifier: MIT

use thiserror::Error;

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to spawn extractor: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to signal process group {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error reading extractor output: {0}")]
    Io(#[from] std::io::Error),
}
