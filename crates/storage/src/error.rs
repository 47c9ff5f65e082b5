// SPDX-License-Identifier: MIT

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Every failure mode the rest of the system needs to distinguish is a
/// variant here; everything else collapses into `QueryFailed`. Per the
/// persistence contract, any of these means the caller must not apply the
/// equivalent in-memory mutation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("stored record was not valid json: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(source: sqlx::Error) -> Self {
        StoreError::Unavailable(source)
    }
}
