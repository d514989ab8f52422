//! Domain model (handles, statuses, snapshots, outcomes, errors).
//!
//! Everything here is a plain value: no I/O, no clocks, no tokio.

pub mod errors;
pub mod handle;
pub mod ids;
pub mod outcome;
pub mod snapshot;
pub mod status;

pub use errors::{ErrorKind, HandleError, StatusQueryError, UnknownStatus, WatchError};
pub use handle::{JobHandle, JobKind};
pub use ids::WatchId;
pub use outcome::{Verdict, WatchOutcome};
pub use snapshot::{BestCandidate, JobStatusSnapshot, StatusCounters};
pub use status::{JobStatus, TerminalSet};
