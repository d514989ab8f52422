//! Error types - エラーの運用上の分類

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operational classification of a failed status query.
///
/// - Transient: throttling, timeouts, dropped connections (worth retrying)
/// - Permanent: validation errors, unknown job, undecodable response
/// - Infrastructure: the query mechanism itself is unavailable (missing CLI, spawn failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// The status-fetch capability failed.
///
/// The watcher never retries these; it hands them straight back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("status query failed ({kind:?}): {message}")]
pub struct StatusQueryError {
    kind: ErrorKind,
    message: String,
}

impl StatusQueryError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permanent, message)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Infrastructure, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

/// Why a watch ended without a terminal snapshot.
///
/// A job that *fails* on the platform is not an error here: that is a normal
/// terminal outcome, see [`crate::domain::Verdict`].
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    StatusQuery(#[from] StatusQueryError),

    #[error("watch cancelled after {polls} poll(s)")]
    Cancelled { polls: u32 },

    #[error("no terminal status after waiting {waited:?} ({polls} poll(s))")]
    TimedOut { polls: u32, waited: Duration },
}

impl WatchError {
    /// Number of status queries that completed before the watch ended.
    ///
    /// `None` for query errors, where the failing call is the last one made.
    pub fn polls(&self) -> Option<u32> {
        match self {
            WatchError::StatusQuery(_) => None,
            WatchError::Cancelled { polls } | WatchError::TimedOut { polls, .. } => Some(*polls),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("job name must not be empty")]
    EmptyName,

    #[error("job name is {len} characters long, the platform allows at most {max}")]
    TooLong { len: usize, max: usize },

    #[error("job name {0:?} may only contain ASCII letters, digits and '-', and must start and end with a letter or digit")]
    InvalidName(String),

    #[error("unknown job kind {0:?} (expected training, tuning, automl or transform)")]
    UnknownKind(String),
}

/// A status spelling the platform does not define.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status {0:?}")]
pub struct UnknownStatus(pub String);
