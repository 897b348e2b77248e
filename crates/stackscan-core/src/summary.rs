//! Run-level outcome records

use std::fmt;
use std::path::PathBuf;

/// Classification of one target's run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Payload ran to completion and the transcript is a real report
    Ok,
    /// Connection, execution or timeout failure; transcript holds the detail
    Failed,
}

impl RunStatus {
    /// Status icon used in the index and the closing summary
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            RunStatus::Ok => "✅",
            RunStatus::Failed => "❌",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Ok => f.write_str("ok"),
            RunStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Result of one target's execution and persistence
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Target display name
    pub target: String,
    /// Classification taken from the execution step's explicit signal
    pub status: RunStatus,
    /// Captured transcript, report text or failure detail
    pub captured: String,
    /// Saved artifact; `None` when the write failed
    pub artifact: Option<PathBuf>,
}

/// Ordered record of one whole run
///
/// Receives exactly one outcome per target, in target-list order, and is
/// never reordered afterwards.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Run timestamp, `YYYYmmdd_HHMMSS` in local time
    pub timestamp: String,
    /// Per-target outcomes in processing order
    pub outcomes: Vec<Outcome>,
}

impl RunSummary {
    /// Create an empty summary stamped with `timestamp`
    #[must_use]
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            outcomes: Vec::new(),
        }
    }

    /// Append the next target's outcome
    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    /// Number of `Ok` outcomes
    #[must_use]
    pub fn ok_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == RunStatus::Ok)
            .count()
    }

    /// Number of `Failed` outcomes
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.ok_count()
    }
}
