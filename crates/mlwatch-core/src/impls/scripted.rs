//! ScriptedStatusSource - replays a fixed sequence of query results.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{JobHandle, JobStatus, JobStatusSnapshot, StatusQueryError};
use crate::ports::StatusSource;

/// In-memory source that answers from a script, one entry per call.
///
/// Once the script runs out, the last successful snapshot is repeated, which
/// is how the platform behaves for a job that already finished. Snapshots for
/// a different handle than the one asked about are reported as unknown jobs.
pub struct ScriptedStatusSource {
    state: Mutex<ScriptState>,
    calls: AtomicU32,
}

struct ScriptState {
    script: VecDeque<Result<JobStatusSnapshot, StatusQueryError>>,
    last: Option<JobStatusSnapshot>,
}

impl ScriptedStatusSource {
    pub fn new(script: impl IntoIterator<Item = Result<JobStatusSnapshot, StatusQueryError>>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                script: script.into_iter().collect(),
                last: None,
            }),
            calls: AtomicU32::new(0),
        }
    }

    /// Script of bare statuses for one handle.
    pub fn from_statuses(handle: &JobHandle, statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        Self::new(
            statuses
                .into_iter()
                .map(|status| Ok(JobStatusSnapshot::new(handle.clone(), status))),
        )
    }

    /// Script from JSON lines, one serialized [`JobStatusSnapshot`] per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_json_lines(text: &str) -> Result<Self, serde_json::Error> {
        let snapshots = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(serde_json::from_str::<JobStatusSnapshot>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(snapshots.into_iter().map(Ok)))
    }

    /// Handle of the first scripted snapshot, if any.
    pub async fn first_handle(&self) -> Option<JobHandle> {
        let state = self.state.lock().await;
        state
            .script
            .iter()
            .find_map(|entry| entry.as_ref().ok().map(|snapshot| snapshot.handle.clone()))
    }

    /// Number of `describe` calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedStatusSource {
    async fn describe(&self, handle: &JobHandle) -> Result<JobStatusSnapshot, StatusQueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().await;
        let next = match state.script.pop_front() {
            Some(entry) => entry,
            None => state
                .last
                .clone()
                .ok_or_else(|| StatusQueryError::permanent("status script is empty")),
        };
        let snapshot = next?;
        if &snapshot.handle != handle {
            return Err(StatusQueryError::permanent(format!("job {handle} not found")));
        }
        state.last = Some(snapshot.clone());
        Ok(snapshot)
    }
}
