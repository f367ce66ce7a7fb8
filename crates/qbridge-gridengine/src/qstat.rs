//! Query job status via `qstat -xml`.
//!
//! The listing is read in full, then parsed lazily: records come out one
//! `job_list` entry at a time in document order.

use crate::types::JobStatusRecord;
use camino::Utf8Path;
use qbridge_parsers::{CommandError, ExitStatus, ProcessRunner, SchedulerProcess};
use roxmltree::{Document, NodeId};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QstatError {
    #[error("Failed to execute qstat: {0}")]
    Command(#[from] CommandError),
    #[error("Couldn't parse qstat XML output: {0}")]
    Xml(String),
    #[error("Error reading job info ({reason}):\n{xml}")]
    Job { reason: String, xml: String },
}

const UNKNOWN_JOBS_OPEN: &str = "<unknown_jobs";
const UNKNOWN_JOBS_CLOSE: &str = "</unknown_jobs>";

/// Build the qstat argument list.
pub fn qstat_arguments(user: Option<&str>) -> Vec<&str> {
    let mut args = vec!["-xml"];
    if let Some(user) = user {
        args.extend(["-u", user]);
    }
    args
}

/// Fix up the invalid XML qstat emits for unknown jobs.
///
/// Entries below `<unknown_jobs>` use an empty tag name (`<>5</>`). Within
/// the first `<unknown_jobs ...</unknown_jobs>` span these become
/// `<unknown_job>` elements; the rest of the text is left alone.
pub fn repair_qstat_xml(xml: &str) -> Cow<'_, str> {
    let Some(start) = xml.find(UNKNOWN_JOBS_OPEN) else {
        return Cow::Borrowed(xml);
    };
    let end = match xml.find(UNKNOWN_JOBS_CLOSE) {
        Some(idx) if idx >= start => idx + UNKNOWN_JOBS_CLOSE.len(),
        // Unterminated section, leave it for the XML parser to reject
        _ => return Cow::Borrowed(xml),
    };

    let fixed = xml[start..end]
        .replace("<>", "<unknown_job>")
        .replace("</>", "</unknown_job>");

    let mut repaired = String::with_capacity(xml.len() + fixed.len());
    repaired.push_str(&xml[..start]);
    repaired.push_str(&fixed);
    repaired.push_str(&xml[end..]);
    Cow::Owned(repaired)
}

/// Complete output of one qstat invocation.
#[derive(Debug, Clone)]
pub struct StatusListing {
    xml: String,
    command: String,
    stderr: String,
    status: ExitStatus,
}

impl StatusListing {
    /// Wrap raw qstat output together with the exit status it ended with.
    pub fn new(raw: &str, command: &str, stderr: &str, status: ExitStatus) -> Self {
        Self {
            xml: repair_qstat_xml(raw).into_owned(),
            command: command.to_string(),
            stderr: stderr.to_string(),
            status,
        }
    }

    /// The repaired XML text.
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Parse the document and iterate its job entries.
    ///
    /// A document that is not XML fails here, before any record is produced.
    pub fn jobs(&self) -> Result<JobRecords<'_>, QstatError> {
        let doc = Document::parse(&self.xml).map_err(|e| QstatError::Xml(e.to_string()))?;
        let pending: Vec<NodeId> = doc
            .descendants()
            .filter(|n| n.is_element() && n.has_tag_name("job_list"))
            .map(|n| n.id())
            .collect();

        Ok(JobRecords {
            listing: self,
            doc,
            pending: pending.into_iter(),
            finished: false,
        })
    }
}

/// One-pass iterator over the job entries of a [`StatusListing`].
///
/// Stops after the first error. Once all entries are consumed, a non-zero
/// qstat exit status is reported as a final error.
pub struct JobRecords<'a> {
    listing: &'a StatusListing,
    doc: Document<'a>,
    pending: std::vec::IntoIter<NodeId>,
    finished: bool,
}

impl Iterator for JobRecords<'_> {
    type Item = Result<JobStatusRecord, QstatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let Some(id) = self.pending.next() else {
            self.finished = true;
            if self.listing.status.success() {
                return None;
            }
            return Some(Err(QstatError::Command(CommandError::Failed {
                command: self.listing.command.clone(),
                code: self.listing.status.code().unwrap_or(-1),
                stderr: self.listing.stderr.trim().to_string(),
            })));
        };

        let node = self.doc.get_node(id)?;
        let result = parse_job_node(node).map_err(|reason| QstatError::Job {
            reason,
            xml: self.listing.xml[node.range()].to_string(),
        });
        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

/// Build a record from one `job_list` element.
fn parse_job_node(node: roxmltree::Node<'_, '_>) -> Result<JobStatusRecord, String> {
    let mut fields = BTreeMap::new();
    for child in node.children().filter(|c| c.is_element()) {
        if let Some(text) = child.text() {
            fields.insert(child.tag_name().name().to_string(), text.to_string());
        }
    }

    let wms_id = fields
        .remove("JB_job_number")
        .ok_or_else(|| "missing JB_job_number".to_string())?;
    let raw_status = fields
        .remove("state")
        .ok_or_else(|| "missing state".to_string())?;

    let (queue, node) = match fields.get("queue_name") {
        Some(queue_name) => {
            let (queue, host) = split_queue_name(queue_name)
                .ok_or_else(|| format!("malformed queue_name {:?}", queue_name))?;
            (Some(queue.to_string()), Some(host.to_string()))
        }
        None => (None, None),
    };

    Ok(JobStatusRecord {
        wms_id,
        raw_status,
        queue,
        node,
        fields,
    })
}

/// Split `queue@host`; anything but exactly one `@` is rejected.
fn split_queue_name(queue_name: &str) -> Option<(&str, &str)> {
    let (queue, host) = queue_name.split_once('@')?;
    if host.contains('@') {
        return None;
    }
    Some((queue, host))
}

/// Run qstat and collect its output.
pub async fn query_qstat<R: ProcessRunner>(
    runner: &R,
    qstat: &Utf8Path,
    user: Option<&str>,
    timeout: Duration,
) -> Result<StatusListing, QstatError> {
    let args = qstat_arguments(user);
    let mut process = runner.spawn(qstat, &args)?;
    let raw = process.read_text(timeout).await?;
    let status = process.wait_status(Duration::ZERO).await?;
    tracing::debug!(
        "{} returned {} bytes (exit {:?})",
        process.command(),
        raw.len(),
        status.code()
    );
    Ok(StatusListing::new(
        &raw,
        process.command(),
        process.stderr(),
        status,
    ))
}
