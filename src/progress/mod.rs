//! Progress and metrics aggregation
//!
//! One [`Aggregator`] per run counts terminal unit outcomes. It is shared by `Arc` with
//! whatever reconciles outcomes, so counters are atomics and no lock is held across the
//! run.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Longest site label shown before it is cut and suffixed with `...`
pub const LABEL_MAX_CHARS: usize = 57;

/// Width of the rendered bar, in cells
const BAR_WIDTH: usize = 30;

/// Terminal outcome of one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitOutcomeKind {
    Success,
    Failure,
}

/// Final tallies of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub success: u64,
    pub failure: u64,
    /// Units the run expected to complete
    pub total: u64,
}

/// Live run counters
#[derive(Debug)]
pub struct Aggregator {
    total: u64,
    success: AtomicU64,
    failure: AtomicU64,
    current_site: Mutex<Option<String>>,
}

impl Aggregator {
    /// Creates an aggregator expecting `total` units
    pub fn new(total: u64) -> Self {
        Self {
            total,
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
            current_site: Mutex::new(None),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::SeqCst)
    }

    pub fn failure(&self) -> u64 {
        self.failure.load(Ordering::SeqCst)
    }

    /// Units with a terminal outcome so far
    pub fn completed(&self) -> u64 {
        self.success() + self.failure()
    }

    /// Failures over completed units, in percent; 0 before the first completion
    pub fn failure_rate(&self) -> f64 {
        failure_rate(self.success(), self.failure())
    }

    /// Label of the most recently completed unit
    pub fn current_site(&self) -> Option<String> {
        self.current_site
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Counts one completed unit
    ///
    /// Called exactly once per unit. Returns the progress as seen right after this
    /// completion.
    pub fn tick(&self, label: &str, outcome: UnitOutcomeKind) -> ProgressSnapshot {
        let label = truncate_label(label);
        let (success, failure) = match outcome {
            UnitOutcomeKind::Success => (
                self.success.fetch_add(1, Ordering::SeqCst) + 1,
                self.failure(),
            ),
            UnitOutcomeKind::Failure => (
                self.success(),
                self.failure.fetch_add(1, Ordering::SeqCst) + 1,
            ),
        };

        *self
            .current_site
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(label.clone());

        ProgressSnapshot {
            success,
            failure,
            total: self.total,
            label,
        }
    }

    /// Final tallies
    pub fn finalize(&self) -> Tally {
        Tally {
            success: self.success(),
            failure: self.failure(),
            total: self.total,
        }
    }
}

/// Progress right after one completion
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub success: u64,
    pub failure: u64,
    pub total: u64,
    /// Truncated label of the completed unit
    pub label: String,
}

impl ProgressSnapshot {
    pub fn completed(&self) -> u64 {
        self.success + self.failure
    }

    /// Completed over total, in percent
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed() as f64 / self.total as f64) * 100.0
    }

    pub fn failure_rate(&self) -> f64 {
        failure_rate(self.success, self.failure)
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled = if self.total == 0 {
            BAR_WIDTH
        } else {
            ((self.completed() as f64 / self.total as f64) * BAR_WIDTH as f64).round() as usize
        }
        .min(BAR_WIDTH);

        write!(
            f,
            "[{}{}] {:>3.0}% fail {:.1}% {}",
            "=".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            self.percent(),
            self.failure_rate(),
            self.label
        )
    }
}

fn failure_rate(success: u64, failure: u64) -> f64 {
    let completed = success + failure;
    if completed == 0 {
        return 0.0;
    }
    (failure as f64 / completed as f64) * 100.0
}

/// Cuts a label to [`LABEL_MAX_CHARS`] characters plus `...`
pub fn truncate_label(label: &str) -> String {
    match label.char_indices().nth(LABEL_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &label[..cut]),
        None => label.to_string(),
    }
}
