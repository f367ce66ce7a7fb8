//! Mapping of Grid Engine state flags to canonical job states.
//!
//! qstat reports a job state as a string of single-letter flags ("qw",
//! "hqw", "Eqw", "dr", ...). Classification is by flag membership, checked
//! in a fixed order: error flags win over hold/suspend flags, which win over
//! running flags.

use crate::types::JobStatusRecord;
use qbridge_state::{JobState, ToJobState};

/// Error and exiting flags
const CANCEL_FLAGS: &[char] = &['E', 'e'];
/// Hold, suspend and wait flags
const QUEUED_FLAGS: &[char] = &['h', 's', 'S', 'T', 'w'];
/// Running and transferring flags
const RUNNING_FLAGS: &[char] = &['r', 't'];

/// Parse a raw Grid Engine state string.
pub fn parse_state(raw: &str) -> JobState {
    if raw.contains(CANCEL_FLAGS) {
        JobState::Cancel
    } else if raw.contains(QUEUED_FLAGS) {
        JobState::Queued
    } else if raw.contains(RUNNING_FLAGS) {
        JobState::Running
    } else {
        JobState::Ready
    }
}

impl ToJobState for JobStatusRecord {
    fn to_job_state(&self) -> JobState {
        parse_state(&self.raw_status)
    }
}
