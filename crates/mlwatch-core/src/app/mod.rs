//! Application layer: the watcher and its configuration.
//!
//! # Components
//! - **JobStatusWatcher**: the poll loop (query -> observe -> terminal? -> sleep)
//! - **WatchConfig**: interval, optional maximum wait, terminal set
//! - **SourceConfig**: how the CLI-backed status source is invoked

pub mod config;
pub mod watcher;

pub use self::config::{ConfigError, SourceConfig, WatchConfig};
pub use self::watcher::JobStatusWatcher;
