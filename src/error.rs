//! Error type shared by the store, the pipeline and the refresh cycle

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by herald.
///
/// Fetch and decode failures abort a single refresh cycle. `NotFound` is the
/// answer the read side gives for unknown characters, guilds and series.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// The snapshot transport failed (connection, HTTP status, unreadable file).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The snapshot fetch did not finish within the configured bound.
    #[error("fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    /// A snapshot or a series file could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A character, guild, query or series does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource, e.g. "guild Foo".
        what: String,
    },

    /// Persisting a series failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking worker panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Task(String),
}

impl HeraldError {
    /// Helper: build a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for HeraldError {
    fn from(err: serde_json::Error) -> Self {
        HeraldError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for HeraldError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HeraldError::Decode(err.to_string())
        } else {
            HeraldError::Fetch(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for HeraldError {
    fn from(err: tokio::task::JoinError) -> Self {
        HeraldError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HeraldError>;
