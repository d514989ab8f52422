//! JobStatusWatcher - the job-completion poll loop.
//!
//! # Flow
//! 1. query the status source (errors go straight back to the caller)
//! 2. hand the snapshot to the observer, plus a transition if the phase changed
//! 3. terminal status -> done
//! 4. otherwise sleep for the interval (racing cancellation) and go to 1
//!
//! The query itself is never raced against cancellation: an in-flight
//! describe call always runs to completion.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::config::{ConfigError, WatchConfig};
use crate::domain::{JobHandle, JobStatusSnapshot, WatchError, WatchId, WatchOutcome};
use crate::ports::{Clock, StatusSource, SystemClock, WatchObserver};

/// Polls a [`StatusSource`] until a job reaches a terminal status.
///
/// # Example
/// ```ignore
/// let watcher = JobStatusWatcher::new(AwsCliStatusSource::new("aws"), WatchConfig::default())?;
/// let outcome = watcher.watch(&handle, &NoopObserver).await?;
/// match outcome.verdict() {
///     Verdict::Succeeded => println!("done"),
///     other => println!("job ended: {other:?}"),
/// }
/// ```
pub struct JobStatusWatcher<S, C = SystemClock> {
    source: S,
    config: WatchConfig,
    clock: C,
}

impl<S: StatusSource> JobStatusWatcher<S, SystemClock> {
    pub fn new(source: S, config: WatchConfig) -> Result<Self, ConfigError> {
        Self::with_clock(source, config, SystemClock)
    }
}

impl<S: StatusSource, C: Clock> JobStatusWatcher<S, C> {
    /// Rejects a config that could never finish a watch (empty terminal set).
    pub fn with_clock(source: S, config: WatchConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Watch until the job is terminal (or `max_wait` runs out).
    pub async fn watch<O>(&self, handle: &JobHandle, observer: &O) -> Result<WatchOutcome, WatchError>
    where
        O: WatchObserver + ?Sized,
    {
        self.watch_until_cancelled(handle, observer, &CancellationToken::new())
            .await
    }

    /// Like [`watch`](Self::watch), but the caller can abandon the loop through `cancel`.
    ///
    /// Cancellation is observed before each query and during the sleep.
    pub async fn watch_until_cancelled<O>(
        &self,
        handle: &JobHandle,
        observer: &O,
        cancel: &CancellationToken,
    ) -> Result<WatchOutcome, WatchError>
    where
        O: WatchObserver + ?Sized,
    {
        let watch_id = WatchId::generate(&self.clock);
        let span = tracing::info_span!("watch", %watch_id, job = %handle);
        self.poll_until_terminal(watch_id, handle, observer, cancel)
            .instrument(span)
            .await
    }

    async fn poll_until_terminal<O>(
        &self,
        watch_id: WatchId,
        handle: &JobHandle,
        observer: &O,
        cancel: &CancellationToken,
    ) -> Result<WatchOutcome, WatchError>
    where
        O: WatchObserver + ?Sized,
    {
        let started_at = self.clock.now();
        let started = Instant::now();
        // a deadline past what Instant can represent is no deadline at all
        let deadline = self
            .config
            .max_wait
            .and_then(|max_wait| started.checked_add(max_wait));
        let mut previous: Option<JobStatusSnapshot> = None;
        let mut polls: u32 = 0;

        tracing::debug!(interval = ?self.config.interval, max_wait = ?self.config.max_wait, "watch started");

        loop {
            if cancel.is_cancelled() {
                tracing::info!(polls, "watch cancelled");
                return Err(WatchError::Cancelled { polls });
            }

            let snapshot = match self.source.describe(handle).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(polls, kind = ?err.kind(), "status query failed: {}", err.message());
                    return Err(err.into());
                }
            };
            polls += 1;

            tracing::debug!(poll = polls, status = %snapshot.label(), "polled job status");
            observer.on_snapshot(polls, &snapshot);

            if previous.as_ref().is_none_or(|prev| !prev.same_phase(&snapshot)) {
                let from = previous.as_ref().map_or_else(|| "-".to_string(), |p| p.label());
                tracing::info!(%from, to = %snapshot.label(), "job status changed");
                observer.on_transition(previous.as_ref(), &snapshot);
            }

            if self.config.terminal.contains(snapshot.status) {
                tracing::info!(polls, status = %snapshot.status, "job reached terminal status");
                return Ok(WatchOutcome {
                    watch_id,
                    snapshot,
                    polls,
                    started_at,
                    finished_at: self.clock.now(),
                });
            }

            if let Some(deadline) = deadline
                && Instant::now()
                    .checked_add(self.config.interval)
                    .is_none_or(|next_poll| next_poll > deadline)
            {
                let waited = started.elapsed();
                tracing::warn!(polls, ?waited, "maximum wait exceeded before a terminal status");
                return Err(WatchError::TimedOut { polls, waited });
            }

            previous = Some(snapshot);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(polls, "watch cancelled while sleeping");
                    return Err(WatchError::Cancelled { polls });
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ErrorKind, JobKind, JobStatus, StatusQueryError, TerminalSet, Verdict,
    };
    use crate::impls::ScriptedStatusSource;
    use crate::ports::{ChannelObserver, FixedClock, NoopObserver, WatchEvent};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::sync::Arc;
    use std::time::Duration;

    fn handle() -> JobHandle {
        JobHandle::new(JobKind::AutoMl, "automl-churn-01").unwrap()
    }

    fn snap(status: JobStatus) -> JobStatusSnapshot {
        JobStatusSnapshot::new(handle(), status)
    }

    fn test_config() -> WatchConfig {
        WatchConfig::default().with_interval(Duration::ZERO)
    }

    fn watcher(source: Arc<ScriptedStatusSource>, config: WatchConfig) -> JobStatusWatcher<Arc<ScriptedStatusSource>> {
        JobStatusWatcher::new(source, config).unwrap()
    }

    #[tokio::test]
    async fn returns_completed_after_three_polls() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(
            &handle(),
            [JobStatus::InProgress, JobStatus::InProgress, JobStatus::Completed],
        ));
        let outcome = watcher(source.clone(), test_config())
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(outcome.snapshot.status, JobStatus::Completed);
        assert_eq!(outcome.polls, 3);
        assert_eq!(source.calls(), 3);
        assert_eq!(outcome.verdict(), Verdict::Succeeded);
    }

    #[rstest]
    #[case::immediately_terminal(0)]
    #[case::one_in_progress(1)]
    #[case::several_in_progress(7)]
    #[tokio::test]
    async fn performs_n_plus_one_queries(#[case] in_progress: usize) {
        let mut statuses = vec![JobStatus::InProgress; in_progress];
        statuses.push(JobStatus::Stopped);
        let source = Arc::new(ScriptedStatusSource::from_statuses(&handle(), statuses));

        let outcome = watcher(source.clone(), test_config())
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(outcome.snapshot.status, JobStatus::Stopped);
        assert_eq!(source.calls() as usize, in_progress + 1);
        assert_eq!(outcome.polls as usize, in_progress + 1);
    }

    #[tokio::test]
    async fn failed_job_is_a_normal_outcome() {
        let failed = snap(JobStatus::Failed).with_failure_reason("ClientError: no such bucket");
        let source = Arc::new(ScriptedStatusSource::new([Ok(failed)]));

        let outcome = watcher(source.clone(), test_config())
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(
            outcome.verdict(),
            Verdict::Failed {
                reason: Some("ClientError: no such bucket".into())
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_first_query_does_not_sleep() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(&handle(), [JobStatus::Completed]));
        let started = Instant::now();

        watcher(source.clone(), WatchConfig::default())
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_one_interval_between_polls() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(
            &handle(),
            [JobStatus::InProgress, JobStatus::InProgress, JobStatus::Completed],
        ));
        let started = Instant::now();

        watcher(source, WatchConfig::default())
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(120) && elapsed < Duration::from_secs(121));
    }

    #[tokio::test]
    async fn query_error_stops_the_watch() {
        let source = Arc::new(ScriptedStatusSource::new([
            Ok(snap(JobStatus::InProgress)),
            Err(StatusQueryError::transient("Rate exceeded")),
            Ok(snap(JobStatus::Completed)),
        ]));

        let err = watcher(source.clone(), test_config())
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap_err();

        match err {
            WatchError::StatusQuery(query) => assert_eq!(query.kind(), ErrorKind::Transient),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn does_not_poll_past_terminal_status() {
        // Anything after the terminal snapshot must never be requested.
        let source = Arc::new(ScriptedStatusSource::new([
            Ok(snap(JobStatus::Completed)),
            Err(StatusQueryError::permanent("should not be queried")),
        ]));

        let outcome = watcher(source.clone(), test_config())
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(outcome.snapshot.status, JobStatus::Completed);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn stopping_is_not_terminal_by_default() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(
            &handle(),
            [JobStatus::Stopping, JobStatus::Stopping, JobStatus::Stopped],
        ));
        let outcome = watcher(source.clone(), test_config())
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap();
        assert_eq!(outcome.verdict(), Verdict::Stopped);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn custom_terminal_set_is_honoured() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(
            &handle(),
            [JobStatus::InProgress, JobStatus::Stopping, JobStatus::Stopped],
        ));
        let config = test_config().with_terminal(TerminalSet::default().with(JobStatus::Stopping));

        let outcome = watcher(source.clone(), config)
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(
            outcome.verdict(),
            Verdict::Other {
                status: JobStatus::Stopping
            }
        );
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn observer_sees_every_snapshot_and_only_changes_as_transitions() {
        let source = Arc::new(ScriptedStatusSource::new([
            Ok(snap(JobStatus::InProgress).with_secondary_status("AnalyzingData")),
            Ok(snap(JobStatus::InProgress).with_secondary_status("AnalyzingData")),
            Ok(snap(JobStatus::InProgress).with_secondary_status("FeatureEngineering")),
            Ok(snap(JobStatus::Completed).with_secondary_status("Completed")),
        ]));
        let (observer, mut rx) = ChannelObserver::channel();

        watcher(source, test_config())
            .watch(&handle(), &observer)
            .await
            .unwrap();

        let mut polled = Vec::new();
        let mut transitions = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                WatchEvent::Polled { poll, .. } => polled.push(poll),
                WatchEvent::Transition { previous, current } => {
                    transitions.push((previous.map(|p| p.label()), current.label()))
                }
            }
        }

        assert_eq!(polled, vec![1, 2, 3, 4]);
        assert_eq!(
            transitions,
            vec![
                (None, "InProgress (AnalyzingData)".to_string()),
                (
                    Some("InProgress (AnalyzingData)".to_string()),
                    "InProgress (FeatureEngineering)".to_string()
                ),
                (
                    Some("InProgress (FeatureEngineering)".to_string()),
                    "Completed (Completed)".to_string()
                ),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn max_wait_times_out_without_an_extra_query() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(&handle(), [JobStatus::InProgress]));
        let config = WatchConfig::default()
            .with_interval(Duration::from_secs(60))
            .with_max_wait(Some(Duration::from_secs(150)));

        let err = watcher(source.clone(), config)
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap_err();

        // polls at t=0, 60, 120; sleeping again would pass t=150
        match err {
            WatchError::TimedOut { polls, waited } => {
                assert_eq!(polls, 3);
                assert!(waited >= Duration::from_secs(120) && waited < Duration::from_secs(121));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_max_wait_means_no_deadline() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(
            &handle(),
            [JobStatus::InProgress, JobStatus::Completed],
        ));
        let config = WatchConfig::default().with_max_wait(Some(Duration::from_secs(u64::MAX)));

        let outcome = watcher(source.clone(), config)
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(outcome.verdict(), Verdict::Succeeded);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_interval_times_out_after_first_poll() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(&handle(), [JobStatus::InProgress]));
        let config = WatchConfig::default()
            .with_interval(Duration::from_secs(u64::MAX))
            .with_max_wait(Some(Duration::from_secs(3600)));

        let err = watcher(source.clone(), config)
            .watch(&handle(), &NoopObserver)
            .await
            .unwrap_err();

        assert!(matches!(err, WatchError::TimedOut { polls: 1, .. }));
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn empty_terminal_set_is_rejected_at_construction() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(&handle(), [JobStatus::InProgress]));
        let config = test_config().with_terminal(TerminalSet::new([]));

        let result = JobStatusWatcher::new(source.clone(), config);

        assert!(matches!(result, Err(ConfigError::EmptyTerminalSet)));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_first_query_makes_no_query() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(&handle(), [JobStatus::InProgress]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = watcher(source.clone(), test_config())
            .watch_until_cancelled(&handle(), &NoopObserver, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, WatchError::Cancelled { polls: 0 }));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_sleep_ends_the_watch() {
        let source = Arc::new(ScriptedStatusSource::from_statuses(&handle(), [JobStatus::InProgress]));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(90)).await;
                cancel.cancel();
            })
        };

        let err = watcher(source.clone(), WatchConfig::default())
            .watch_until_cancelled(&handle(), &NoopObserver, &cancel)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        // queries at t=0 and t=60, cancelled at t=90 while sleeping
        assert!(matches!(err, WatchError::Cancelled { polls: 2 }));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn outcome_is_stamped_with_the_clock() {
        let fixed = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let source = Arc::new(ScriptedStatusSource::from_statuses(&handle(), [JobStatus::Completed]));
        let watcher = JobStatusWatcher::with_clock(source, test_config(), FixedClock::new(fixed)).unwrap();

        let outcome = watcher.watch(&handle(), &NoopObserver).await.unwrap();

        assert_eq!(outcome.started_at, fixed);
        assert_eq!(outcome.finished_at, fixed);
        assert_eq!(outcome.elapsed(), chrono::Duration::zero());
        assert_eq!(outcome.watch_id.as_ulid().timestamp_ms(), fixed.timestamp_millis() as u64);
    }
}
