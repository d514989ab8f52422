//! mlwatch: watch managed ML platform jobs from the command line.

mod cli;
mod output;

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use mlwatch_core::impls::{AwsCliStatusSource, RetryingStatusSource, ScriptedStatusSource};
use mlwatch_core::{JobHandle, JobStatusWatcher, SourceConfig, StatusSource, WatchConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, ReplayArgs, StatusArgs, WatchArgs};
use crate::output::{Printer, exit_code};

/// Exit code for anything that kept the watch from reaching a verdict.
const EXIT_WATCH_ERROR: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,mlwatch=info,mlwatch_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_WATCH_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Watch(args) => watch(args).await,
        Commands::Status(args) => status(args).await,
        Commands::Replay(args) => replay(args).await,
    }
}

async fn watch(args: WatchArgs) -> Result<u8> {
    // (A) ジョブ指定と設定（env -> フラグの順に上書き）
    let handle = JobHandle::new(args.job.kind, args.job.name)?;
    let config = args.poll.apply(WatchConfig::from_env()?);
    // (B) AWS CLI 経由の status source（--retries 指定時は retry で包む）
    let source = build_source(&args.source.apply(SourceConfig::from_env()?))?;

    run_watch(source, config, &handle, args.json).await
}

async fn status(args: StatusArgs) -> Result<u8> {
    let handle = JobHandle::new(args.job.kind, args.job.name)?;
    let source = build_source(&args.source.apply(SourceConfig::from_env()?))?;

    let snapshot = source.describe(&handle).await?;
    Printer::new(args.json).snapshot(&snapshot);
    Ok(0)
}

async fn replay(args: ReplayArgs) -> Result<u8> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let source = ScriptedStatusSource::from_json_lines(&text)
        .with_context(|| format!("parsing {}", args.file.display()))?;
    let Some(handle) = source.first_handle().await else {
        bail!("{} contains no snapshots", args.file.display());
    };
    let config = args.poll.apply(WatchConfig::default().with_interval(std::time::Duration::ZERO));

    run_watch(Box::new(source), config, &handle, args.json).await
}

async fn run_watch(
    source: Box<dyn StatusSource>,
    config: WatchConfig,
    handle: &JobHandle,
    json: bool,
) -> Result<u8> {
    // Ctrl-C で watch を止める
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping watch");
            on_interrupt.cancel();
        }
    });

    // 終端 status まで待ち、verdict を exit code にする
    let printer = Printer::new(json);
    let watcher = JobStatusWatcher::new(source, config)?;
    let outcome = watcher.watch_until_cancelled(handle, &printer, &cancel).await?;
    printer.outcome(&outcome);
    Ok(exit_code(&outcome.verdict()))
}

fn build_source(config: &SourceConfig) -> Result<Box<dyn StatusSource>> {
    let cli = AwsCliStatusSource::from_config(config);
    Ok(match config.retry_policy()? {
        Some(policy) => Box::new(RetryingStatusSource::new(cli, policy)?),
        None => Box::new(cli),
    })
}
