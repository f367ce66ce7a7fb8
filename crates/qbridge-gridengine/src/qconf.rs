//! Discover queues and hosts via qconf.

use camino::Utf8Path;
use qbridge_parsers::{
    CommandError, ProcessRunner, parse_duration_secs, parse_memory_mb, run_command,
    split_attribute,
};
use qbridge_state::{QueueLimits, RequirementKind};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QconfError {
    #[error("Failed to execute qconf: {0}")]
    Command(#[from] CommandError),
    #[error("Failed to parse qconf output for queue {queue}: {line}")]
    Parse { queue: String, line: String },
}

/// Time budget for each qconf invocation.
pub const QCONF_TIMEOUT: Duration = Duration::from_secs(10);

/// Queue attribute value meaning "no limit".
const UNLIMITED: &str = "INFINITY";

type LimitParser = fn(&str) -> Option<u64>;

/// Queue attributes that carry job limits, with their parsers.
fn queue_attribute(attr: &str) -> Option<(RequirementKind, LimitParser)> {
    match attr {
        "h_vmem" => Some((RequirementKind::Memory, parse_memory_mb as LimitParser)),
        "h_cpu" => Some((RequirementKind::Cputime, parse_duration_secs as LimitParser)),
        "s_rt" => Some((RequirementKind::Walltime, parse_duration_secs as LimitParser)),
        _ => None,
    }
}

/// Parse `qconf -sq <queue>` output into its limits.
///
/// Unbounded limits are left out.
pub fn parse_queue_limits(queue: &str, output: &str) -> Result<QueueLimits, QconfError> {
    let mut limits = QueueLimits::new();
    for line in output.lines() {
        let Some((attr, value)) = split_attribute(line) else {
            continue;
        };
        let Some((kind, parse)) = queue_attribute(attr) else {
            continue;
        };
        if value == UNLIMITED {
            continue;
        }
        let parsed = parse(value).ok_or_else(|| QconfError::Parse {
            queue: queue.to_string(),
            line: line.to_string(),
        })?;
        limits.insert(kind, parsed);
    }
    Ok(limits)
}

fn non_blank_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// List all cluster queues with their limits.
pub async fn query_queues<R: ProcessRunner>(
    runner: &R,
    qconf: &Utf8Path,
) -> Result<BTreeMap<String, QueueLimits>, QconfError> {
    let listing = run_command(runner, qconf, &["-sql"], QCONF_TIMEOUT).await?;

    let mut queues = BTreeMap::new();
    for queue in non_blank_lines(&listing) {
        let details = run_command(runner, qconf, &["-sq", queue], QCONF_TIMEOUT).await?;
        let limits = parse_queue_limits(queue, &details)?;
        tracing::debug!("Queue {}: {:?}", queue, limits);
        queues.insert(queue.to_string(), limits);
    }
    Ok(queues)
}

/// List host groups and the hosts they resolve to.
///
/// Group names are part of the result since they can be used as targets
/// too. Returns None when nothing was found.
pub async fn query_nodes<R: ProcessRunner>(
    runner: &R,
    qconf: &Utf8Path,
) -> Result<Option<Vec<String>>, QconfError> {
    let groups = run_command(runner, qconf, &["-shgrpl"], QCONF_TIMEOUT).await?;

    let mut nodes = BTreeSet::new();
    for group in non_blank_lines(&groups) {
        nodes.insert(group.to_string());
        let hosts = run_command(runner, qconf, &["-shgrp_resolved", group], QCONF_TIMEOUT).await?;
        nodes.extend(hosts.split_whitespace().map(str::to_string));
    }

    if nodes.is_empty() {
        tracing::debug!("No host groups found");
        return Ok(None);
    }
    Ok(Some(nodes.into_iter().collect()))
}
