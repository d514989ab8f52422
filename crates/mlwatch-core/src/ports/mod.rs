//! Ports: the seams between the watcher and the outside world.
//!
//! - StatusSource: the platform's status query (the only external capability the watcher needs)
//! - WatchObserver: where intermediate snapshots go
//! - Clock: wall-clock time for outcome timestamps and watch ids

pub mod clock;
pub mod observer;
pub mod status_source;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::observer::{ChannelObserver, FnObserver, NoopObserver, WatchEvent, WatchObserver};
pub use self::status_source::StatusSource;
