//! Shared parsing utilities for Grid Engine command output.
//!
//! This crate provides the process execution contract used to drive the
//! scheduler tools, plus value parsers for the units they report.

pub mod command;
pub mod memory;
pub mod time;

pub use command::{
    CommandError, ExitStatus, ProcessRunner, SchedulerProcess, TokioProcess, TokioRunner,
    command_line, run_command,
};
pub use memory::{format_memory_mb, parse_memory_mb};
pub use time::{format_duration_hms, parse_duration, parse_duration_secs};

/// Filter helper for optional string fields.
/// Returns None if the string is empty after trimming.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split an `attribute value...` line at the first whitespace run.
///
/// Both sides are trimmed. Returns None for blank lines; the value is empty
/// when the line holds a single token.
pub fn split_attribute(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((attr, value)) => Some((attr, value.trim())),
        None => Some((line, "")),
    }
}
