//! Time parsing utilities for Grid Engine output.

use std::time::Duration;

/// Parse a duration in various formats.
///
/// Supports:
/// - D-HH:MM:SS
/// - HH:MM:SS
/// - MM:SS
/// - Seconds as integer
///
/// Returns None for "INFINITY", empty strings, malformed values and values
/// that do not fit in a u64 number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() || s == "INFINITY" || s == "-" {
        return None;
    }

    // Check for day separator (D-HH:MM:SS)
    let (days, time_part) = match s.split_once('-') {
        Some((days, rest)) => (days.parse::<u64>().ok()?, rest),
        None => (0, s),
    };

    let time_parts = time_part
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<u64>>>()?;

    let seconds = match time_parts.as_slice() {
        [hours, mins, secs] => hours
            .checked_mul(3600)?
            .checked_add(mins.checked_mul(60)?)?
            .checked_add(*secs)?,
        [mins, secs] => mins.checked_mul(60)?.checked_add(*secs)?,
        [secs] => *secs,
        _ => return None,
    };

    Some(Duration::from_secs(
        days.checked_mul(86400)?.checked_add(seconds)?,
    ))
}

/// Parse duration to seconds.
///
/// Like `parse_duration` but returns seconds as u64 instead of Duration.
pub fn parse_duration_secs(s: &str) -> Option<u64> {
    parse_duration(s).map(|d| d.as_secs())
}

/// Format seconds as a Grid Engine time request (HH:MM:SS).
///
/// Hours are not wrapped into days, so 90000 seconds is "25:00:00".
pub fn format_duration_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds / 60) % 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}
