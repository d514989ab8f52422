use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use mlwatch_core::{JobKind, SourceConfig, WatchConfig};

#[derive(Debug, Parser)]
#[command(name = "mlwatch", version, about = "Watch managed ML platform jobs until they finish")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll a job until it completes, fails or is stopped
    Watch(WatchArgs),
    /// Query a job's status once
    Status(StatusArgs),
    /// Feed recorded snapshots (JSON lines) through the watcher
    Replay(ReplayArgs),
}

#[derive(Debug, Args)]
pub struct JobArgs {
    /// training, tuning, automl or transform
    #[arg(short = 'k', long = "kind", value_parser = parse_kind)]
    pub kind: JobKind,

    /// Job name as given at submission
    #[arg(value_name = "JOB_NAME")]
    pub name: String,
}

#[derive(Debug, Default, Args)]
pub struct SourceArgs {
    /// Path to the aws executable
    #[arg(long = "aws-bin")]
    pub aws_bin: Option<String>,

    #[arg(long = "region")]
    pub region: Option<String>,

    #[arg(long = "profile")]
    pub profile: Option<String>,

    /// Extra attempts for throttling / network errors
    #[arg(long = "retries")]
    pub retries: Option<u32>,
}

#[derive(Debug, Default, Args)]
pub struct PollArgs {
    #[arg(long = "interval-secs")]
    pub interval_secs: Option<u64>,

    /// Give up after this many seconds without a terminal status
    #[arg(long = "max-wait-secs")]
    pub max_wait_secs: Option<u64>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub job: JobArgs,
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub poll: PollArgs,

    /// Print JSON lines instead of text
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub job: JobArgs,
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// File with one JSON snapshot per line
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    #[command(flatten)]
    pub poll: PollArgs,

    #[arg(long = "json")]
    pub json: bool,
}

fn parse_kind(s: &str) -> Result<JobKind, String> {
    s.parse::<JobKind>().map_err(|err| err.to_string())
}

impl PollArgs {
    /// Flags win over whatever `config` already holds.
    pub fn apply(&self, mut config: WatchConfig) -> WatchConfig {
        if let Some(secs) = self.interval_secs {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.max_wait_secs {
            config.max_wait = Some(Duration::from_secs(secs));
        }
        config
    }
}

impl SourceArgs {
    pub fn apply(&self, mut config: SourceConfig) -> SourceConfig {
        if let Some(program) = &self.aws_bin {
            config.program = program.clone();
        }
        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        if let Some(profile) = &self.profile {
            config.profile = Some(profile.clone());
        }
        if let Some(retries) = self.retries {
            config.query_retries = retries;
        }
        config
    }
}
