//! Impls - StatusSource implementations and the describe decoder.
//!
//! # Included
//! - **AwsCliStatusSource**: shells out to the platform CLI (production)
//! - **ScriptedStatusSource**: replays a fixed script (tests, `mlwatch replay`)
//! - **RetryingStatusSource**: bounded backoff for transient errors, wraps any source
//! - **describe**: decodes `Describe*Job` JSON into snapshots

pub mod aws_cli;
pub mod describe;
pub mod retrying;
pub mod scripted;

pub use self::aws_cli::AwsCliStatusSource;
pub use self::describe::decode_describe;
pub use self::retrying::{RetryPolicy, RetryingStatusSource};
pub use self::scripted::ScriptedStatusSource;
