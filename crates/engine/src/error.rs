// SPDX-License-Identifier: MIT

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] reaper_storage::StoreError),

    #[error(transparent)]
    Core(#[from] reaper_core::CoreError),

    #[error(transparent)]
    Adapter(#[from] reaper_adapters::AdapterError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
