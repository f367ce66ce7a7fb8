//! Scheduler-independent job state for qbridge.
//!
//! Canonical job states and resource requirements shared between the
//! framework side and the scheduler backends.

pub mod requirements;
pub mod types;

pub use requirements::{QueueLimits, RequirementKind, Requirements};
pub use types::{JobState, ToJobState};
