//! Watch session identifiers.
//!
//! ULID ベース（生成順にソート可能、調整なしで生成できる）。
//! タイムスタンプ部は [`Clock`] から取るのでテストで固定できる。

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::ports::Clock;

/// Identifier of one watch session (one call to the watcher).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WatchId(Ulid);

impl WatchId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// New id stamped with the clock's current time plus random bits.
    pub fn generate(clock: &impl Clock) -> Self {
        let timestamp_ms = clock.now().timestamp_millis().max(0) as u64;
        Self(Ulid::from_parts(timestamp_ms, rand::random()))
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}
