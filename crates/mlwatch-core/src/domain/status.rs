//! Primary job status and the set of statuses that end a watch.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::UnknownStatus;

/// Primary status as reported by the platform.
///
/// Serialized with the platform's own spelling (`InProgress`, `Completed`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
    Stopping,
    Stopped,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Stopping => "Stopping",
            JobStatus::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InProgress" => Ok(JobStatus::InProgress),
            "Completed" => Ok(JobStatus::Completed),
            "Failed" => Ok(JobStatus::Failed),
            "Stopping" => Ok(JobStatus::Stopping),
            "Stopped" => Ok(JobStatus::Stopped),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Statuses after which the watcher stops polling.
///
/// Defaults to `Completed`, `Failed` and `Stopped`. `Stopping` is transient on
/// the platform, so it only ends a watch when a caller opts in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSet(BTreeSet<JobStatus>);

impl TerminalSet {
    pub fn new(statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        Self(statuses.into_iter().collect())
    }

    pub fn with(mut self, status: JobStatus) -> Self {
        self.0.insert(status);
        self
    }

    pub fn contains(&self, status: JobStatus) -> bool {
        self.0.contains(&status)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = JobStatus> + '_ {
        self.0.iter().copied()
    }
}

impl Default for TerminalSet {
    fn default() -> Self {
        Self::new([JobStatus::Completed, JobStatus::Failed, JobStatus::Stopped])
    }
}
