//! Decoder for the platform's `Describe*Job` responses.
//!
//! Each job kind names its status field differently; everything else
//! (failure reason, last-modified time) is shared. Unknown fields are ignored,
//! the responses carry far more than a watcher needs.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::{
    BestCandidate, JobHandle, JobKind, JobStatus, JobStatusSnapshot, StatusCounters, StatusQueryError,
};

/// Decode a describe response body for `handle` into a snapshot.
///
/// Malformed JSON and a missing/unknown status are permanent errors: asking
/// again will not make the response readable.
pub fn decode_describe(handle: &JobHandle, body: &[u8]) -> Result<JobStatusSnapshot, StatusQueryError> {
    let snapshot = match handle.kind() {
        JobKind::Training => {
            let d: TrainingJobDescription = parse(handle, body)?;
            JobStatusSnapshot::new(handle.clone(), d.status)
                .with_optional_secondary(d.secondary_status)
                .with_common(d.common)
        }
        JobKind::HyperParameterTuning => {
            let d: TuningJobDescription = parse(handle, body)?;
            let mut snapshot = JobStatusSnapshot::new(handle.clone(), d.status).with_common(d.common);
            snapshot.counters = d.counters.map(StatusCounters::from);
            snapshot.best_candidate = d.best_training_job.map(|best| BestCandidate {
                name: best.training_job_name,
                metric_name: best.final_metric.as_ref().map(|m| m.metric_name.clone()),
                objective_value: best.final_metric.and_then(|m| m.value),
            });
            snapshot
        }
        JobKind::AutoMl => {
            let d: AutoMlJobDescription = parse(handle, body)?;
            let mut snapshot = JobStatusSnapshot::new(handle.clone(), d.status)
                .with_optional_secondary(d.secondary_status)
                .with_common(d.common);
            snapshot.best_candidate = d.best_candidate.map(|best| BestCandidate {
                name: best.candidate_name,
                metric_name: best.final_metric.as_ref().map(|m| m.metric_name.clone()),
                objective_value: best.final_metric.and_then(|m| m.value),
            });
            snapshot
        }
        JobKind::Transform => {
            let d: TransformJobDescription = parse(handle, body)?;
            JobStatusSnapshot::new(handle.clone(), d.status).with_common(d.common)
        }
    };
    Ok(snapshot)
}

fn parse<T: DeserializeOwned>(handle: &JobHandle, body: &[u8]) -> Result<T, StatusQueryError> {
    serde_json::from_slice(body).map_err(|e| {
        StatusQueryError::permanent(format!("cannot decode {} description for {handle}: {e}", handle.kind()))
    })
}

/// Fields every describe response shares.
#[derive(Debug, Default, Deserialize)]
struct CommonFields {
    #[serde(rename = "FailureReason", default)]
    failure_reason: Option<String>,

    #[serde(rename = "LastModifiedTime", default)]
    last_modified: Option<PlatformTime>,
}

/// Timestamps arrive as ISO-8601 text from the CLI, or epoch seconds from raw API JSON.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlatformTime {
    Text(DateTime<Utc>),
    EpochSeconds(f64),
}

impl PlatformTime {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            PlatformTime::Text(at) => Some(*at),
            PlatformTime::EpochSeconds(secs) => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
                DateTime::from_timestamp(whole as i64, nanos)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrainingJobDescription {
    #[serde(rename = "TrainingJobStatus")]
    status: JobStatus,
    #[serde(rename = "SecondaryStatus", default)]
    secondary_status: Option<String>,
    #[serde(flatten)]
    common: CommonFields,
}

#[derive(Debug, Deserialize)]
struct TuningJobDescription {
    #[serde(rename = "HyperParameterTuningJobStatus")]
    status: JobStatus,
    #[serde(rename = "TrainingJobStatusCounters", default)]
    counters: Option<TrainingJobStatusCounters>,
    #[serde(rename = "BestTrainingJob", default)]
    best_training_job: Option<BestTrainingJob>,
    #[serde(flatten)]
    common: CommonFields,
}

#[derive(Debug, Deserialize)]
struct AutoMlJobDescription {
    #[serde(rename = "AutoMLJobStatus")]
    status: JobStatus,
    #[serde(rename = "AutoMLJobSecondaryStatus", default)]
    secondary_status: Option<String>,
    #[serde(rename = "BestCandidate", default)]
    best_candidate: Option<AutoMlCandidate>,
    #[serde(flatten)]
    common: CommonFields,
}

#[derive(Debug, Deserialize)]
struct TransformJobDescription {
    #[serde(rename = "TransformJobStatus")]
    status: JobStatus,
    #[serde(flatten)]
    common: CommonFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TrainingJobStatusCounters {
    completed: u32,
    in_progress: u32,
    retryable_error: u32,
    non_retryable_error: u32,
    stopped: u32,
}

impl From<TrainingJobStatusCounters> for StatusCounters {
    fn from(c: TrainingJobStatusCounters) -> Self {
        StatusCounters {
            completed: c.completed,
            in_progress: c.in_progress,
            retryable_error: c.retryable_error,
            non_retryable_error: c.non_retryable_error,
            stopped: c.stopped,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ObjectiveMetric {
    #[serde(rename = "MetricName")]
    metric_name: String,
    #[serde(rename = "Value", default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BestTrainingJob {
    #[serde(rename = "TrainingJobName")]
    training_job_name: String,
    #[serde(rename = "FinalHyperParameterTuningJobObjectiveMetric", default)]
    final_metric: Option<ObjectiveMetric>,
}

#[derive(Debug, Deserialize)]
struct AutoMlCandidate {
    #[serde(rename = "CandidateName")]
    candidate_name: String,
    #[serde(rename = "FinalAutoMLJobObjectiveMetric", default)]
    final_metric: Option<ObjectiveMetric>,
}

trait SnapshotExt {
    fn with_optional_secondary(self, secondary: Option<String>) -> Self;
    fn with_common(self, common: CommonFields) -> Self;
}

impl SnapshotExt for JobStatusSnapshot {
    fn with_optional_secondary(mut self, secondary: Option<String>) -> Self {
        self.secondary_status = secondary;
        self
    }

    fn with_common(mut self, common: CommonFields) -> Self {
        self.failure_reason = common.failure_reason;
        self.last_modified = common.last_modified.as_ref().and_then(PlatformTime::to_utc);
        self
    }
}
