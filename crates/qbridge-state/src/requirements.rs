//! Abstract resource requirements handed to scheduler backends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Requirement kinds a backend can be asked to honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementKind {
    /// Memory in megabytes
    Memory,
    /// Wall clock time in seconds
    Walltime,
    /// CPU time in seconds
    Cputime,
    /// Queue candidates
    Queues,
    /// Node names
    Sites,
}

impl RequirementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "MEMORY",
            Self::Walltime => "WALLTIME",
            Self::Cputime => "CPUTIME",
            Self::Queues => "QUEUES",
            Self::Sites => "SITES",
        }
    }
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource requirements of a single job.
///
/// Scalar limits of zero count as "not requested".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub memory_mb: Option<u64>,
    pub walltime_secs: Option<u64>,
    pub cputime_secs: Option<u64>,
    /// Ordered queue candidates
    #[serde(default)]
    pub queues: Vec<String>,
    /// Ordered node names
    #[serde(default)]
    pub sites: Vec<String>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory_mb(mut self, mb: u64) -> Self {
        self.memory_mb = Some(mb);
        self
    }

    pub fn with_walltime_secs(mut self, secs: u64) -> Self {
        self.walltime_secs = Some(secs);
        self
    }

    pub fn with_cputime_secs(mut self, secs: u64) -> Self {
        self.cputime_secs = Some(secs);
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queues.push(queue.into());
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.sites.push(site.into());
        self
    }

    /// Requested value of a scalar kind, if set and positive.
    ///
    /// Always None for `Queues` and `Sites`.
    pub fn scalar(&self, kind: RequirementKind) -> Option<u64> {
        let value = match kind {
            RequirementKind::Memory => self.memory_mb,
            RequirementKind::Walltime => self.walltime_secs,
            RequirementKind::Cputime => self.cputime_secs,
            RequirementKind::Queues | RequirementKind::Sites => None,
        };
        value.filter(|v| *v > 0)
    }

    /// The queue that will be used; only the first candidate counts.
    pub fn first_queue(&self) -> Option<&str> {
        self.queues
            .first()
            .map(String::as_str)
            .filter(|q| !q.is_empty())
    }
}

/// Resource limits of a queue, keyed by requirement kind.
///
/// Unbounded limits are absent.
pub type QueueLimits = BTreeMap<RequirementKind, u64>;
