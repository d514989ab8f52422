//! RetryingStatusSource - bounded retries for transient query errors.
//!
//! This is the "retry belongs to the client" side of the seam: the watcher
//! propagates the first error it sees, so any retrying happens in here, inside
//! a single `describe` call.

use std::time::Duration;

use async_trait::async_trait;

use crate::app::ConfigError;
use crate::domain::{JobHandle, JobStatusSnapshot, StatusQueryError};
use crate::ports::StatusSource;

/// Retry policy for transient status-query failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per `describe`, first try included.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Fraction of each delay that may be shaved off at random, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy(
                "max_attempts must be at least 1".into(),
            ));
        }
        if !(self.multiplier >= 1.0) {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "jitter must be within [0, 1], got {}",
                self.jitter
            )));
        }
        Ok(())
    }

    /// Delay before retry number `retry` (1-indexed), without jitter.
    ///
    /// `base_delay * multiplier^(retry - 1)`; with base=2s, multiplier=2.0:
    /// 2s, 4s, 8s, ...
    pub fn next_delay(&self, retry: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(retry.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs)
    }

    /// [`next_delay`](Self::next_delay) scaled by a random factor in `[1 - jitter, 1]`.
    pub fn jittered_delay(&self, retry: u32) -> Duration {
        let delay = self.next_delay(retry);
        if self.jitter <= 0.0 {
            return delay;
        }
        let factor = 1.0 - rand::random::<f64>() * self.jitter;
        delay.mul_f64(factor)
    }
}

/// Wraps a source and retries its transient errors according to a [`RetryPolicy`].
///
/// Permanent and infrastructure errors are returned on the first occurrence.
pub struct RetryingStatusSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: StatusSource> RetryingStatusSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;
        Ok(Self { inner, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: StatusSource> StatusSource for RetryingStatusSource<S> {
    async fn describe(&self, handle: &JobHandle) -> Result<JobStatusSnapshot, StatusQueryError> {
        let mut attempt = 1;
        loop {
            match self.inner.describe(handle).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.jittered_delay(attempt);
                    tracing::warn!(
                        job = %handle,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        ?delay,
                        "transient status query error, retrying: {}",
                        err.message()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, JobKind, JobStatus};
    use crate::impls::ScriptedStatusSource;
    use rstest::rstest;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn handle() -> JobHandle {
        JobHandle::new(JobKind::HyperParameterTuning, "hpo-xgb-01").unwrap()
    }

    fn ok(status: JobStatus) -> Result<JobStatusSnapshot, StatusQueryError> {
        Ok(JobStatusSnapshot::new(handle(), status))
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn jitter_only_shortens_the_delay() {
        let policy = RetryPolicy::default().with_jitter(0.5);
        for _ in 0..100 {
            let delay = policy.jittered_delay(2);
            assert!(delay <= Duration::from_secs(4));
            assert!(delay >= Duration::from_secs(2));
        }
    }

    #[rstest]
    #[case::zero_attempts(RetryPolicy::default().with_max_attempts(0))]
    #[case::jitter_too_large(RetryPolicy::default().with_jitter(1.5))]
    #[case::shrinking(RetryPolicy { multiplier: 0.5, ..RetryPolicy::default() })]
    fn invalid_policies_are_rejected(#[case] policy: RetryPolicy) {
        assert!(matches!(policy.validate(), Err(ConfigError::InvalidRetryPolicy(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_then_succeeds() {
        let inner = Arc::new(ScriptedStatusSource::new([
            Err(StatusQueryError::transient("ThrottlingException")),
            Err(StatusQueryError::transient("Read timed out")),
            ok(JobStatus::InProgress),
        ]));
        let source = RetryingStatusSource::new(inner.clone(), RetryPolicy::default()).unwrap();
        let started = Instant::now();

        let snapshot = source.describe(&handle()).await.unwrap();

        assert_eq!(snapshot.status, JobStatus::InProgress);
        assert_eq!(inner.calls(), 3);
        // 2s + 4s of backoff
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let inner = Arc::new(ScriptedStatusSource::new([
            Err(StatusQueryError::transient("throttled")),
            Err(StatusQueryError::transient("throttled")),
            Err(StatusQueryError::transient("throttled")),
            ok(JobStatus::Completed),
        ]));
        let source = RetryingStatusSource::new(inner.clone(), RetryPolicy::default()).unwrap();

        let err = source.describe(&handle()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(inner.calls(), 3);
    }

    #[rstest]
    #[case::permanent(StatusQueryError::permanent("ValidationException: job not found"))]
    #[case::infrastructure(StatusQueryError::infrastructure("aws: command not found"))]
    #[tokio::test]
    async fn does_not_retry_non_transient_errors(#[case] error: StatusQueryError) {
        let inner = Arc::new(ScriptedStatusSource::new([Err(error.clone()), ok(JobStatus::Completed)]));
        let source = RetryingStatusSource::new(inner.clone(), RetryPolicy::default()).unwrap();

        assert_eq!(source.describe(&handle()).await.unwrap_err(), error);
        assert_eq!(inner.calls(), 1);
    }
}
