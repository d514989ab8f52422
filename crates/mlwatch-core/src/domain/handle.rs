//! Job handles: the platform-assigned name of a submitted job plus its kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::HandleError;

/// Which family of platform job a handle names.
///
/// The kind decides which describe call a status source has to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    #[serde(rename = "training")]
    Training,
    #[serde(rename = "tuning")]
    HyperParameterTuning,
    #[serde(rename = "automl")]
    AutoMl,
    #[serde(rename = "transform")]
    Transform,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::Training,
        JobKind::HyperParameterTuning,
        JobKind::AutoMl,
        JobKind::Transform,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Training => "training",
            JobKind::HyperParameterTuning => "tuning",
            JobKind::AutoMl => "automl",
            JobKind::Transform => "transform",
        }
    }

    /// Longest job name the platform accepts for this kind.
    pub fn max_name_len(self) -> usize {
        match self {
            JobKind::AutoMl => 32,
            _ => 63,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "training" | "training-job" => Ok(JobKind::Training),
            "tuning" | "hpo" | "hyper-parameter-tuning" | "hyperparameter-tuning" => {
                Ok(JobKind::HyperParameterTuning)
            }
            "automl" | "auto-ml" => Ok(JobKind::AutoMl),
            "transform" | "batch-transform" => Ok(JobKind::Transform),
            _ => Err(HandleError::UnknownKind(s.to_string())),
        }
    }
}

/// Opaque identifier of a previously submitted asynchronous job.
///
/// Created by the platform at submission time and never mutated afterwards;
/// this crate only holds it for polling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawJobHandle")]
pub struct JobHandle {
    kind: JobKind,
    name: String,
}

/// Unvalidated wire form; deserialization goes through [`JobHandle::new`].
#[derive(Deserialize)]
struct RawJobHandle {
    kind: JobKind,
    name: String,
}

impl TryFrom<RawJobHandle> for JobHandle {
    type Error = HandleError;

    fn try_from(raw: RawJobHandle) -> Result<Self, Self::Error> {
        JobHandle::new(raw.kind, raw.name)
    }
}

impl JobHandle {
    /// Build a handle, rejecting names the platform could never have issued.
    pub fn new(kind: JobKind, name: impl Into<String>) -> Result<Self, HandleError> {
        let name = name.into();
        validate_name(kind, &name)?;
        Ok(Self { kind, name })
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

fn validate_name(kind: JobKind, name: &str) -> Result<(), HandleError> {
    if name.is_empty() {
        return Err(HandleError::EmptyName);
    }
    let max = kind.max_name_len();
    if name.len() > max {
        return Err(HandleError::TooLong {
            len: name.len(),
            max,
        });
    }
    let bytes = name.as_bytes();
    let charset_ok = bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-');
    let edges_ok = bytes[0].is_ascii_alphanumeric() && bytes[bytes.len() - 1].is_ascii_alphanumeric();
    if !charset_ok || !edges_ok {
        return Err(HandleError::InvalidName(name.to_string()));
    }
    Ok(())
}
