//! What a finished watch hands back to its caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::WatchId;
use super::snapshot::JobStatusSnapshot;
use super::status::JobStatus;

/// Application-level reading of a terminal snapshot.
///
/// A failed job is a normal outcome here, not an `Err`; the caller decides
/// how to react to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Succeeded,
    Failed { reason: Option<String> },
    Stopped,
    /// Terminal only because a custom terminal set said so (e.g. `Stopping`).
    Other { status: JobStatus },
}

impl Verdict {
    pub fn from_snapshot(snapshot: &JobStatusSnapshot) -> Self {
        match snapshot.status {
            JobStatus::Completed => Verdict::Succeeded,
            JobStatus::Failed => Verdict::Failed {
                reason: snapshot.failure_reason.clone(),
            },
            JobStatus::Stopped => Verdict::Stopped,
            status => Verdict::Other { status },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Succeeded)
    }
}

/// Terminal snapshot plus bookkeeping about the watch that observed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchOutcome {
    pub watch_id: WatchId,
    pub snapshot: JobStatusSnapshot,

    /// Status queries issued, including the one that returned the terminal snapshot.
    pub polls: u32,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WatchOutcome {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_snapshot(&self.snapshot)
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn into_snapshot(self) -> JobStatusSnapshot {
        self.snapshot
    }
}
