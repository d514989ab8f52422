//! Watch and source configuration.
//!
//! Values come from `Default`, then environment variables, then explicit
//! overrides (CLI flags). Lookups go through a closure so tests never touch
//! the process environment.

use std::time::Duration;

use thiserror::Error;

use crate::domain::TerminalSet;
use crate::impls::RetryPolicy;

/// Default polling interval between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub const ENV_POLL_INTERVAL_SECS: &str = "MLWATCH_POLL_INTERVAL_SECS";
pub const ENV_MAX_WAIT_SECS: &str = "MLWATCH_MAX_WAIT_SECS";
pub const ENV_AWS_BIN: &str = "MLWATCH_AWS_BIN";
pub const ENV_QUERY_RETRIES: &str = "MLWATCH_QUERY_RETRIES";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is not a valid non-negative integer")]
    InvalidEnv { key: &'static str, value: String },

    #[error("terminal status set is empty, the watch could never finish")]
    EmptyTerminalSet,

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),
}

/// How a single watch polls.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    /// Suspension between two queries. Zero is allowed (tests, replays).
    pub interval: Duration,

    /// Upper bound on total waiting; `None` waits until a terminal status.
    pub max_wait: Option<Duration>,

    pub terminal: TerminalSet,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
            terminal: TerminalSet::default(),
        }
    }
}

impl WatchConfig {
    /// Defaults overridden by `MLWATCH_POLL_INTERVAL_SECS` / `MLWATCH_MAX_WAIT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(secs) = parse_u64(&lookup, ENV_POLL_INTERVAL_SECS)? {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_u64(&lookup, ENV_MAX_WAIT_SECS)? {
            config.max_wait = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_terminal(mut self, terminal: TerminalSet) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terminal.is_empty() {
            return Err(ConfigError::EmptyTerminalSet);
        }
        Ok(())
    }
}

/// How the platform CLI is invoked by [`crate::impls::AwsCliStatusSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// CLI executable, `aws` unless overridden.
    pub program: String,
    pub region: Option<String>,
    pub profile: Option<String>,

    /// Extra attempts for transient query errors; 0 disables the retry wrapper.
    pub query_retries: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            program: "aws".to_string(),
            region: None,
            profile: None,
            query_retries: 0,
        }
    }
}

impl SourceConfig {
    /// Defaults overridden by `MLWATCH_AWS_BIN` / `MLWATCH_QUERY_RETRIES`.
    ///
    /// Region and profile are left to the CLI's own `AWS_REGION` / `AWS_PROFILE` handling.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(program) = lookup(ENV_AWS_BIN).filter(|p| !p.trim().is_empty()) {
            config.program = program;
        }
        if let Some(retries) = parse_u64(&lookup, ENV_QUERY_RETRIES)? {
            config.query_retries = u32::try_from(retries).map_err(|_| ConfigError::InvalidEnv {
                key: ENV_QUERY_RETRIES,
                value: retries.to_string(),
            })?;
        }
        Ok(config)
    }

    /// Retry policy for the source, or `None` when retries are disabled.
    pub fn retry_policy(&self) -> Result<Option<RetryPolicy>, ConfigError> {
        if self.query_retries == 0 {
            return Ok(None);
        }
        let policy = RetryPolicy::default().with_max_attempts(self.query_retries.saturating_add(1));
        policy.validate()?;
        Ok(Some(policy))
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { key, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_poll_every_minute_without_bound() {
        let config = WatchConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.max_wait, None);
        assert_eq!(config.terminal, TerminalSet::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_interval_and_max_wait() {
        let config = WatchConfig::from_lookup(lookup(&[
            (ENV_POLL_INTERVAL_SECS, "15"),
            (ENV_MAX_WAIT_SECS, " 3600 "),
        ]))
        .unwrap();
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.max_wait, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn invalid_env_value_is_reported() {
        let err = WatchConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL_SECS, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                key: ENV_POLL_INTERVAL_SECS,
                value: "soon".into()
            }
        );
    }

    #[test]
    fn empty_terminal_set_fails_validation() {
        let config = WatchConfig::default().with_terminal(TerminalSet::new([]));
        assert_eq!(config.validate(), Err(ConfigError::EmptyTerminalSet));
    }

    #[test]
    fn source_config_from_env() {
        let config = SourceConfig::from_lookup(lookup(&[
            (ENV_AWS_BIN, "/opt/aws/bin/aws"),
            (ENV_QUERY_RETRIES, "2"),
        ]))
        .unwrap();
        assert_eq!(config.program, "/opt/aws/bin/aws");
        assert_eq!(config.query_retries, 2);

        let policy = config.retry_policy().unwrap().unwrap();
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn zero_retries_means_no_policy() {
        let config = SourceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.program, "aws");
        assert_eq!(config.retry_policy().unwrap(), None);
    }
}
