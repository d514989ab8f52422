//! mlwatch-core
//!
//! Building blocks for watching long-running jobs on a managed ML platform
//! (training, hyperparameter tuning, AutoML, batch transform) until they
//! reach a terminal status.
//!
//! # Modules
//! - **domain**: job handles, statuses, snapshots, outcomes, errors
//! - **ports**: StatusSource, WatchObserver, Clock
//! - **app**: JobStatusWatcher and its configuration
//! - **impls**: status sources (AWS CLI, scripted, retrying) and the describe decoder

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{ConfigError, JobStatusWatcher, SourceConfig, WatchConfig};
pub use domain::{
    JobHandle, JobKind, JobStatus, JobStatusSnapshot, StatusQueryError, TerminalSet, Verdict,
    WatchError, WatchOutcome,
};
pub use ports::{StatusSource, WatchObserver};
