//! Canonical job state types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Job state as understood by the batch-job management framework.
///
/// Scheduler backends only ever report a subset of these; the remaining
/// states are assigned by the framework itself (e.g. after output retrieval).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Not yet submitted
    Init,
    /// Handed to the scheduler, not yet seen in a status poll
    Submitted,
    /// Known to the scheduler, no specific flags
    Ready,
    /// Waiting for the scheduler
    Waiting,
    /// Queued, held or suspended
    Queued,
    /// Lost by the scheduler
    Aborted,
    /// Currently running
    Running,
    /// Scheduler reports an error or exit state, job should be cancelled
    Cancel,
    /// Unknown state
    Unknown,
    /// Removed after a cancel request
    Cancelled,
    /// Finished, output not yet checked
    Done,
    /// Finished with errors
    Failed,
    /// Finished successfully
    Success,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Submitted => "SUBMITTED",
            Self::Ready => "READY",
            Self::Waiting => "WAITING",
            Self::Queued => "QUEUED",
            Self::Aborted => "ABORTED",
            Self::Running => "RUNNING",
            Self::Cancel => "CANCEL",
            Self::Unknown => "UNKNOWN",
            Self::Cancelled => "CANCELLED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
            Self::Success => "SUCCESS",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for converting scheduler-specific states to the canonical JobState.
pub trait ToJobState {
    /// Convert to canonical JobState.
    fn to_job_state(&self) -> JobState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for state in [JobState::Ready, JobState::Queued, JobState::Running, JobState::Cancel] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }
}
