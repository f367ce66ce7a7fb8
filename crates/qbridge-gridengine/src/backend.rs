//! Grid Engine backend as seen by the job management framework.

use crate::qconf::{QconfError, query_nodes, query_queues};
use crate::qstat::{QstatError, StatusListing, query_qstat};
use crate::qsub::{
    PbsGeCommon, QsubError, SharedSubmitArguments, SubmitJob, cancel_arguments,
    parse_submit_output, submit_arguments,
};
use crate::types::Topology;
use camino::Utf8PathBuf;
use chrono::Utc;
use qbridge_parsers::ProcessRunner;
use qbridge_state::QueueLimits;
use std::collections::BTreeMap;
use std::time::Duration;

/// Names under which this backend can be selected.
pub const ALIASES: [&str; 3] = ["SGE", "UGE", "OGE"];

/// Configuration captured when the backend is created.
#[derive(Debug, Clone)]
pub struct GridEngineConfig {
    /// Only list jobs of this user
    pub user: Option<String>,
    /// Project passed with `-P`
    pub project: Option<String>,
    /// qstat executable
    pub qstat: Utf8PathBuf,
    /// qconf executable
    pub qconf: Utf8PathBuf,
    /// Time budget for one status poll
    pub status_timeout: Duration,
    /// Shell passed with `-S`
    pub shell: Option<String>,
    /// Account passed with `-A`
    pub account: Option<String>,
}

impl Default for GridEngineConfig {
    fn default() -> Self {
        Self {
            user: None,
            project: None,
            qstat: Utf8PathBuf::from("qstat"),
            qconf: Utf8PathBuf::from("qconf"),
            status_timeout: Duration::from_secs(60),
            shell: None,
            account: None,
        }
    }
}

/// Grid Engine (SGE/UGE/OGE) backend.
///
/// Holds no state besides its configuration, so concurrent calls are
/// independent of each other.
pub struct GridEngine<R, S = PbsGeCommon> {
    config: GridEngineConfig,
    runner: R,
    shared: S,
}

impl<R: ProcessRunner> GridEngine<R, PbsGeCommon> {
    pub fn new(config: GridEngineConfig, runner: R) -> Self {
        let shared = PbsGeCommon {
            shell: config.shell.clone(),
            account: config.account.clone(),
        };
        Self::with_shared_arguments(config, runner, shared)
    }
}

impl<R: ProcessRunner, S: SharedSubmitArguments> GridEngine<R, S> {
    /// Create a backend with a custom builder for the shared qsub flags.
    pub fn with_shared_arguments(config: GridEngineConfig, runner: R, shared: S) -> Self {
        Self {
            config,
            runner,
            shared,
        }
    }

    pub fn config(&self) -> &GridEngineConfig {
        &self.config
    }

    /// Poll qstat for the configured user's jobs.
    pub async fn check_jobs(&self) -> Result<StatusListing, QstatError> {
        query_qstat(
            &self.runner,
            &self.config.qstat,
            self.config.user.as_deref(),
            self.config.status_timeout,
        )
        .await
    }

    /// Build the qsub argument string for a job.
    pub fn submit_arguments(&self, job: &SubmitJob<'_>) -> Result<String, QsubError> {
        submit_arguments(job, self.config.project.as_deref(), &self.shared)
    }

    /// Extract the job ID from a qsub reply.
    pub fn parse_submit_output(&self, data: &str) -> Result<String, QsubError> {
        parse_submit_output(data)
    }

    /// Build the qdel argument for a set of job IDs.
    pub fn cancel_arguments<T: AsRef<str>>(&self, wms_ids: &[T]) -> String {
        cancel_arguments(wms_ids)
    }

    /// Queues and their limits.
    pub async fn queues(&self) -> Result<BTreeMap<String, QueueLimits>, QconfError> {
        query_queues(&self.runner, &self.config.qconf).await
    }

    /// Host groups and hosts, None if the cluster defines none.
    pub async fn nodes(&self) -> Result<Option<Vec<String>>, QconfError> {
        query_nodes(&self.runner, &self.config.qconf).await
    }

    /// Take a snapshot of queues and nodes.
    pub async fn discover_topology(&self) -> Result<Topology, QconfError> {
        let queues = self.queues().await?;
        let nodes = self.nodes().await?;
        tracing::info!(
            "Discovered {} queues and {} nodes",
            queues.len(),
            nodes.as_ref().map_or(0, Vec::len)
        );
        Ok(Topology {
            queues,
            nodes,
            discovered_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use camino::Utf8Path;
    use qbridge_state::{JobState, RequirementKind, Requirements, ToJobState};

    const QSTAT_XML: &str = r#"<?xml version='1.0'?>
<job_info>
  <queue_info>
    <job_list state="running">
      <JB_job_number>11</JB_job_number>
      <state>r</state>
      <queue_name>all.q@node01</queue_name>
    </job_list>
  </queue_info>
  <job_info>
    <job_list state="pending">
      <JB_job_number>12</JB_job_number>
      <state>hqw</state>
    </job_list>
    <job_list state="pending">
      <JB_job_number>13</JB_job_number>
      <state>Eqw</state>
    </job_list>
  </job_info>
</job_info>"#;

    fn config() -> GridEngineConfig {
        GridEngineConfig {
            user: Some("alice".to_string()),
            project: Some("higgs".to_string()),
            qstat: Utf8PathBuf::from("/opt/sge/bin/qstat"),
            qconf: Utf8PathBuf::from("/opt/sge/bin/qconf"),
            ..GridEngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_check_jobs_states() {
        let runner = ScriptedRunner::new().respond(
            "/opt/sge/bin/qstat -xml -u alice",
            QSTAT_XML,
            0,
        );
        let backend = GridEngine::new(config(), runner);

        let listing = backend.check_jobs().await.unwrap();
        let states: Vec<(String, JobState)> = listing
            .jobs()
            .unwrap()
            .map(|r| r.map(|job| (job.wms_id.clone(), job.to_job_state())))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            states,
            vec![
                ("11".to_string(), JobState::Running),
                ("12".to_string(), JobState::Queued),
                ("13".to_string(), JobState::Cancel),
            ]
        );
    }

    #[test]
    fn test_submit_arguments_use_project() {
        let backend = GridEngine::new(config(), ScriptedRunner::new());
        let reqs = Requirements::new().with_queue("all.q");
        let job = SubmitJob {
            job_num: 0,
            job_name: "job",
            requirements: &reqs,
            sandbox: Utf8Path::new("/sb"),
            stdout: Utf8Path::new("/sb/out"),
            stderr: Utf8Path::new("/sb/err"),
        };
        let args = backend.submit_arguments(&job).unwrap();
        assert!(args.starts_with(" -r n -notify -P higgs -q all.q -N \"job\""));
    }

    #[test]
    fn test_parse_and_cancel() {
        let backend = GridEngine::new(config(), ScriptedRunner::new());
        assert_eq!(
            backend
                .parse_submit_output("Your job 7 (\"job\") has been submitted")
                .unwrap(),
            "7"
        );
        assert_eq!(backend.cancel_arguments(&["7", "8"]), "7,8");
    }

    #[tokio::test]
    async fn test_discover_topology() {
        let runner = ScriptedRunner::new()
            .respond("/opt/sge/bin/qconf -sql", "all.q\n", 0)
            .respond("/opt/sge/bin/qconf -sq all.q", "h_vmem 2G\ns_rt 02:00:00\n", 0)
            .respond("/opt/sge/bin/qconf -shgrpl", "", 0);
        let backend = GridEngine::new(config(), runner);

        let topology = backend.discover_topology().await.unwrap();
        assert_eq!(
            topology.queues["all.q"].get(&RequirementKind::Memory),
            Some(&2048)
        );
        assert_eq!(
            topology.queues["all.q"].get(&RequirementKind::Walltime),
            Some(&7200)
        );
        assert_eq!(topology.nodes, None);
    }

    #[test]
    fn test_aliases() {
        assert!(ALIASES.contains(&"UGE"));
    }
}
