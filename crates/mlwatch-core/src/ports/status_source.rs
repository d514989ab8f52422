//! StatusSource port: "describe this job" against the external platform.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{JobHandle, JobStatusSnapshot, StatusQueryError};

/// The status-fetching capability the watcher depends on.
///
/// Each call is an independent read; implementations must not assume they
/// are called at any particular cadence. Retry policy, if any, belongs to the
/// implementation (see [`crate::impls::RetryingStatusSource`]), never to the watcher.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn describe(&self, handle: &JobHandle) -> Result<JobStatusSnapshot, StatusQueryError>;
}

#[async_trait]
impl<S: StatusSource + ?Sized> StatusSource for Arc<S> {
    async fn describe(&self, handle: &JobHandle) -> Result<JobStatusSnapshot, StatusQueryError> {
        (**self).describe(handle).await
    }
}

#[async_trait]
impl<S: StatusSource + ?Sized> StatusSource for Box<S> {
    async fn describe(&self, handle: &JobHandle) -> Result<JobStatusSnapshot, StatusQueryError> {
        (**self).describe(handle).await
    }
}
