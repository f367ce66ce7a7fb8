//! Build qsub/qdel arguments and read qsub replies.

use camino::Utf8Path;
use qbridge_parsers::{format_duration_hms, format_memory_mb};
use qbridge_state::{RequirementKind, Requirements};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QsubError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Unexpected qsub output: {0:?}")]
    SubmitOutput(String),
}

/// Translation of one requirement kind into a `-l <tag>=<value>` resource.
#[derive(Debug, Clone, Copy)]
pub struct ResourceFlag {
    pub kind: RequirementKind,
    pub tag: &'static str,
    pub format: fn(u64) -> String,
}

/// Grid Engine resource names for the scalar requirement kinds.
pub const GRID_ENGINE_RESOURCES: [ResourceFlag; 3] = [
    ResourceFlag {
        kind: RequirementKind::Memory,
        tag: "h_vmem",
        format: format_memory_mb,
    },
    ResourceFlag {
        kind: RequirementKind::Walltime,
        tag: "s_rt",
        format: format_duration_hms,
    },
    ResourceFlag {
        kind: RequirementKind::Cputime,
        tag: "h_cpu",
        format: format_duration_hms,
    },
];

/// Everything known about a job at submission time.
#[derive(Debug, Clone, Copy)]
pub struct SubmitJob<'a> {
    pub job_num: u32,
    pub job_name: &'a str,
    pub requirements: &'a Requirements,
    pub sandbox: &'a Utf8Path,
    pub stdout: &'a Utf8Path,
    pub stderr: &'a Utf8Path,
}

/// Flags shared by the PBS-style schedulers (name, resources, sandbox, IO).
pub trait SharedSubmitArguments {
    fn common_arguments(&self, job: &SubmitJob<'_>, resources: &[ResourceFlag]) -> String;
}

/// Default shared flag builder for PBS and Grid Engine.
#[derive(Debug, Clone, Default)]
pub struct PbsGeCommon {
    /// Shell passed with `-S`
    pub shell: Option<String>,
    /// Account passed with `-A`
    pub account: Option<String>,
}

impl SharedSubmitArguments for PbsGeCommon {
    fn common_arguments(&self, job: &SubmitJob<'_>, resources: &[ResourceFlag]) -> String {
        let mut params = format!(" -N \"{}\"", job.job_name);
        for flag in resources {
            if let Some(value) = job.requirements.scalar(flag.kind) {
                params.push_str(&format!(" -l {}={}", flag.tag, (flag.format)(value)));
            }
        }
        params.push_str(&format!(" -v GC_SANDBOX=\"{}\"", job.sandbox));
        if let Some(shell) = &self.shell {
            params.push_str(&format!(" -S {}", shell));
        }
        if let Some(account) = &self.account {
            params.push_str(&format!(" -A {}", account));
        }
        params.push_str(&format!(" -o \"{}\" -e \"{}\"", job.stdout, job.stderr));
        params
    }
}

/// Resolve the `-q` value from queue and node requirements.
///
/// Nodes can only be selected through a queue, so nodes without a queue is
/// a configuration error.
pub fn queue_spec(reqs: &Requirements) -> Result<Option<String>, QsubError> {
    match (reqs.first_queue(), reqs.sites.as_slice()) {
        (None, []) => Ok(None),
        (Some(queue), []) => Ok(Some(queue.to_string())),
        (Some(queue), nodes) => Ok(Some(
            nodes
                .iter()
                .map(|node| format!("{}@{}", queue, node))
                .collect::<Vec<_>>()
                .join(","),
        )),
        (None, nodes) => Err(QsubError::Configuration(format!(
            "Please also specify queue when selecting nodes! (nodes: {})",
            nodes.join(",")
        ))),
    }
}

/// Build the qsub argument string for a job.
pub fn submit_arguments<S: SharedSubmitArguments + ?Sized>(
    job: &SubmitJob<'_>,
    project: Option<&str>,
    shared: &S,
) -> Result<String, QsubError> {
    // No restarts, send warning signals before suspend/kill
    let mut params = String::from(" -r n -notify");
    if let Some(project) = project {
        params.push_str(&format!(" -P {}", project));
    }
    if let Some(spec) = queue_spec(job.requirements)? {
        params.push_str(&format!(" -q {}", spec));
    }
    params.push_str(&shared.common_arguments(job, &GRID_ENGINE_RESOURCES));
    tracing::debug!("qsub arguments for job {}:{}", job.job_num, params);
    Ok(params)
}

/// Extract the job ID from a qsub reply.
///
/// qsub answers `Your job 424992 ("test.sh") has been submitted`; the ID is
/// the third word.
pub fn parse_submit_output(data: &str) -> Result<String, QsubError> {
    data.split_whitespace()
        .nth(2)
        .map(str::to_string)
        .ok_or_else(|| QsubError::SubmitOutput(data.to_string()))
}

/// qdel accepts a comma separated list of IDs in one argument.
pub fn cancel_arguments<S: AsRef<str>>(wms_ids: &[S]) -> String {
    wms_ids
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}
