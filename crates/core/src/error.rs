// SPDX-License-Identifier: MIT

//! Error types shared by everything that validates or builds domain records.

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while validating or constructing domain records.
///
/// This is deliberately narrow: storage failures, subprocess failures, and
/// scheduling failures are modeled by their own crates and composed upward
/// through `#[from]` at the daemon boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("job validation failed: {0}")]
    Validation(String),

    #[error("unknown job mode: {0}")]
    UnknownMode(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
