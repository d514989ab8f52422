//! WatchObserver port: how the caller sees progress while a watch runs.

use tokio::sync::mpsc;

use crate::domain::JobStatusSnapshot;

/// Receives intermediate snapshots from a running watch.
///
/// Both methods run inline in the poll loop, between the query and the sleep,
/// so they should return quickly.
pub trait WatchObserver: Send + Sync {
    /// Called for every snapshot, terminal one included. `poll` is 1-based.
    fn on_snapshot(&self, _poll: u32, _snapshot: &JobStatusSnapshot) {}

    /// Called when the primary or secondary status differs from the previous
    /// snapshot, and for the first snapshot of a watch.
    fn on_transition(&self, _previous: Option<&JobStatusSnapshot>, _current: &JobStatusSnapshot) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl WatchObserver for NoopObserver {}

/// Adapts a closure into an observer that sees every snapshot.
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: Fn(u32, &JobStatusSnapshot) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> WatchObserver for FnObserver<F>
where
    F: Fn(u32, &JobStatusSnapshot) + Send + Sync,
{
    fn on_snapshot(&self, poll: u32, snapshot: &JobStatusSnapshot) {
        (self.0)(poll, snapshot)
    }
}

/// Events emitted by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Polled {
        poll: u32,
        snapshot: JobStatusSnapshot,
    },
    Transition {
        previous: Option<JobStatusSnapshot>,
        current: JobStatusSnapshot,
    },
}

/// Forwards progress into an unbounded tokio channel.
///
/// Sends never block the poll loop; if the receiver is gone events are dropped.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl WatchObserver for ChannelObserver {
    fn on_snapshot(&self, poll: u32, snapshot: &JobStatusSnapshot) {
        // receiver may already be dropped
        let _ = self.tx.send(WatchEvent::Polled {
            poll,
            snapshot: snapshot.clone(),
        });
    }

    fn on_transition(&self, previous: Option<&JobStatusSnapshot>, current: &JobStatusSnapshot) {
        let _ = self.tx.send(WatchEvent::Transition {
            previous: previous.cloned(),
            current: current.clone(),
        });
    }
}

impl<A: WatchObserver, B: WatchObserver> WatchObserver for (A, B) {
    fn on_snapshot(&self, poll: u32, snapshot: &JobStatusSnapshot) {
        self.0.on_snapshot(poll, snapshot);
        self.1.on_snapshot(poll, snapshot);
    }

    fn on_transition(&self, previous: Option<&JobStatusSnapshot>, current: &JobStatusSnapshot) {
        self.0.on_transition(previous, current);
        self.1.on_transition(previous, current);
    }
}
