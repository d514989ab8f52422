//! Point-in-time view of a job, produced fresh by every status query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::handle::JobHandle;
use super::status::JobStatus;

/// Per-candidate / per-training-job counters reported by tuning jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounters {
    pub completed: u32,
    pub in_progress: u32,
    pub retryable_error: u32,
    pub non_retryable_error: u32,
    pub stopped: u32,
}

impl StatusCounters {
    /// Counts come straight from the platform, so sums saturate instead of overflowing.
    pub fn total(&self) -> u32 {
        self.completed
            .saturating_add(self.in_progress)
            .saturating_add(self.errors())
            .saturating_add(self.stopped)
    }

    pub fn errors(&self) -> u32 {
        self.retryable_error.saturating_add(self.non_retryable_error)
    }
}

/// Best candidate (AutoML) or best training job (tuning) seen so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestCandidate {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_value: Option<f64>,
}

/// Status of one job at the moment it was queried.
///
/// Snapshots are never updated in place; the next poll supersedes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusSnapshot {
    pub handle: JobHandle,
    pub status: JobStatus,

    /// Platform sub-status, e.g. `Training`, `AnalyzingData`, `MaxCandidatesReached`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<StatusCounters>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_candidate: Option<BestCandidate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl JobStatusSnapshot {
    pub fn new(handle: JobHandle, status: JobStatus) -> Self {
        Self {
            handle,
            status,
            secondary_status: None,
            failure_reason: None,
            counters: None,
            best_candidate: None,
            last_modified: None,
        }
    }

    pub fn with_secondary_status(mut self, secondary: impl Into<String>) -> Self {
        self.secondary_status = Some(secondary.into());
        self
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    pub fn with_counters(mut self, counters: StatusCounters) -> Self {
        self.counters = Some(counters);
        self
    }

    pub fn with_best_candidate(mut self, best: BestCandidate) -> Self {
        self.best_candidate = Some(best);
        self
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    /// Same primary and secondary status, i.e. no transition between the two.
    pub fn same_phase(&self, other: &JobStatusSnapshot) -> bool {
        self.status == other.status && self.secondary_status == other.secondary_status
    }

    /// Same counters and best candidate; only meaningful for tuning and AutoML jobs.
    pub fn same_progress(&self, other: &JobStatusSnapshot) -> bool {
        self.counters == other.counters && self.best_candidate == other.best_candidate
    }

    /// `InProgress (Training)` style label for logs and terminal output.
    pub fn label(&self) -> String {
        match &self.secondary_status {
            Some(secondary) => format!("{} ({secondary})", self.status),
            None => self.status.to_string(),
        }
    }
}
