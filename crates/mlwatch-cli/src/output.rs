//! Terminal output: text lines for humans, JSON lines for machines.

use std::sync::{Mutex, PoisonError};

use mlwatch_core::domain::{JobStatusSnapshot, Verdict, WatchOutcome};
use mlwatch_core::WatchObserver;
use serde_json::json;

pub struct Printer {
    json: bool,
    /// Last snapshot written in text mode.
    last_printed: Mutex<Option<JobStatusSnapshot>>,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            last_printed: Mutex::new(None),
        }
    }

    /// Text line for a polled snapshot, or `None` when neither the phase nor
    /// the tuning/AutoML progress moved since the last printed line.
    fn progress_line(&self, snapshot: &JobStatusSnapshot) -> Option<String> {
        let mut last = self.last_printed.lock().unwrap_or_else(PoisonError::into_inner);
        let unchanged = last
            .as_ref()
            .is_some_and(|prev| prev.same_phase(snapshot) && prev.same_progress(snapshot));
        if unchanged {
            return None;
        }
        *last = Some(snapshot.clone());
        Some(describe_snapshot(snapshot))
    }

    pub fn snapshot(&self, snapshot: &JobStatusSnapshot) {
        if self.json {
            emit(json!({ "event": "snapshot", "snapshot": snapshot }));
        } else {
            println!("{}", describe_snapshot(snapshot));
        }
    }

    pub fn outcome(&self, outcome: &WatchOutcome) {
        if self.json {
            emit(json!({ "event": "outcome", "outcome": outcome, "verdict": outcome.verdict() }));
            return;
        }
        let secs = outcome.elapsed().num_seconds().max(0);
        println!(
            "{} finished: {} after {} poll(s) in {}m{:02}s",
            outcome.snapshot.handle,
            outcome.snapshot.label(),
            outcome.polls,
            secs / 60,
            secs % 60
        );
        if let Verdict::Failed { reason: Some(reason) } = outcome.verdict() {
            println!("failure reason: {reason}");
        }
        if let Some(best) = &outcome.snapshot.best_candidate {
            println!("best: {}", describe_best(best));
        }
    }
}

impl WatchObserver for Printer {
    fn on_snapshot(&self, poll: u32, snapshot: &JobStatusSnapshot) {
        if self.json {
            emit(json!({ "event": "snapshot", "poll": poll, "snapshot": snapshot }));
        } else if let Some(line) = self.progress_line(snapshot) {
            println!("{line}");
        }
    }
}

fn emit(value: serde_json::Value) {
    println!("{value}");
}

pub fn describe_snapshot(snapshot: &JobStatusSnapshot) -> String {
    let mut line = format!("{}: {}", snapshot.handle, snapshot.label());
    if let Some(c) = &snapshot.counters {
        line.push_str(&format!(
            " [completed {}, in progress {}, errors {}, stopped {}]",
            c.completed,
            c.in_progress,
            c.errors(),
            c.stopped
        ));
    }
    if let Some(best) = &snapshot.best_candidate {
        line.push_str(&format!(" best={}", describe_best(best)));
    }
    line
}

fn describe_best(best: &mlwatch_core::domain::BestCandidate) -> String {
    match (&best.metric_name, best.objective_value) {
        (Some(metric), Some(value)) => format!("{} ({metric}={value})", best.name),
        (None, Some(value)) => format!("{} ({value})", best.name),
        _ => best.name.clone(),
    }
}

/// 0 succeeded, 1 failed, 2 stopped or other terminal status.
pub fn exit_code(verdict: &Verdict) -> u8 {
    match verdict {
        Verdict::Succeeded => 0,
        Verdict::Failed { .. } => 1,
        Verdict::Stopped | Verdict::Other { .. } => 2,
    }
}
