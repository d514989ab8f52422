//! AwsCliStatusSource - status queries through the platform's official CLI.
//!
//! Credentials, region resolution, request signing and HTTP retries all stay
//! inside the CLI; this source only builds the command line, runs it, and
//! classifies what comes back.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::describe::decode_describe;
use crate::app::SourceConfig;
use crate::domain::{JobHandle, JobKind, JobStatusSnapshot, StatusQueryError};
use crate::ports::StatusSource;

/// Substrings (lowercase) of CLI error output that mean "try again later".
const TRANSIENT_MARKERS: &[&str] = &[
    "throttling",
    "rate exceeded",
    "too many requests",
    "requesttimeout",
    "timed out",
    "could not connect",
    "connection was closed",
    "connection reset",
    "serviceunavailable",
    "service unavailable",
    "internalfailure",
    "internal server error",
];

#[derive(Debug, Clone)]
pub struct AwsCliStatusSource {
    program: String,
    region: Option<String>,
    profile: Option<String>,
}

impl AwsCliStatusSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            region: None,
            profile: None,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            program: config.program.clone(),
            region: config.region.clone(),
            profile: config.profile.clone(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the CLI for one describe call.
    pub fn command_args(&self, handle: &JobHandle) -> Vec<String> {
        let (operation, name_flag) = describe_operation(handle.kind());
        let mut args = vec![
            "sagemaker".to_string(),
            operation.to_string(),
            name_flag.to_string(),
            handle.name().to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        if let Some(region) = &self.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args
    }
}

fn describe_operation(kind: JobKind) -> (&'static str, &'static str) {
    match kind {
        JobKind::Training => ("describe-training-job", "--training-job-name"),
        JobKind::HyperParameterTuning => (
            "describe-hyper-parameter-tuning-job",
            "--hyper-parameter-tuning-job-name",
        ),
        JobKind::AutoMl => ("describe-auto-ml-job", "--auto-ml-job-name"),
        JobKind::Transform => ("describe-transform-job", "--transform-job-name"),
    }
}

#[async_trait]
impl StatusSource for AwsCliStatusSource {
    async fn describe(&self, handle: &JobHandle) -> Result<JobStatusSnapshot, StatusQueryError> {
        let args = self.command_args(handle);
        tracing::trace!(program = %self.program, ?args, "running describe command");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(&self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_cli_failure(output.status.code(), stderr.trim()));
        }

        decode_describe(handle, &output.stdout)
    }
}

fn spawn_error(program: &str, err: io::Error) -> StatusQueryError {
    match err.kind() {
        io::ErrorKind::NotFound => {
            StatusQueryError::infrastructure(format!("{program} not found; is the AWS CLI installed?"))
        }
        _ => StatusQueryError::infrastructure(format!("failed to run {program}: {err}")),
    }
}

/// Classify a non-zero CLI exit from its stderr.
pub(crate) fn classify_cli_failure(code: Option<i32>, stderr: &str) -> StatusQueryError {
    let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
    let message = format!("CLI exited with {code}: {stderr}");
    let lower = stderr.to_ascii_lowercase();
    if TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker)) {
        StatusQueryError::transient(message)
    } else {
        StatusQueryError::permanent(message)
    }
}
