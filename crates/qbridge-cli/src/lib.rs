//! CLI argument parsing for qbridge.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use qbridge_gridengine::GridEngineConfig;
use qbridge_parsers::{non_empty_string, parse_duration_secs};
use qbridge_state::Requirements;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "qbridge")]
#[command(about = "Query and drive Grid Engine clusters (SGE/UGE/OGE)")]
pub struct Args {
    /// Only list jobs of this user (empty for all users)
    #[arg(long, env = "LOGNAME", default_value = "")]
    pub user: String,

    /// Project passed to qsub with -P
    #[arg(long, default_value = "")]
    pub project: String,

    /// qstat executable
    #[arg(long, env = "QBRIDGE_QSTAT", default_value = "qstat")]
    pub qstat: Utf8PathBuf,

    /// qconf executable
    #[arg(long, env = "QBRIDGE_QCONF", default_value = "qconf")]
    pub qconf: Utf8PathBuf,

    /// qstat timeout in seconds
    #[arg(long, default_value = "60")]
    pub timeout: u64,

    /// Shell passed to qsub with -S
    #[arg(long)]
    pub shell: Option<String>,

    /// Account passed to qsub with -A
    #[arg(long)]
    pub account: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the state of all jobs
    Status,
    /// List queues and their limits
    Queues,
    /// List host groups and their hosts
    Nodes,
    /// Print the qsub arguments for a job
    SubmitArgs(SubmitArgs),
    /// Extract the job ID from qsub output (stdin if omitted)
    ParseSubmit {
        output: Option<String>,
    },
    /// Print the qdel argument for a list of job IDs
    CancelArgs {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(clap::Args, Debug)]
pub struct SubmitArgs {
    /// Job number within the task
    #[arg(long, default_value = "0")]
    pub job_num: u32,

    /// Job name
    #[arg(long)]
    pub name: String,

    /// Memory in MB
    #[arg(long)]
    pub memory: Option<u64>,

    /// Wall time (HH:MM:SS or seconds)
    #[arg(long, value_parser = parse_seconds)]
    pub walltime: Option<u64>,

    /// CPU time (HH:MM:SS or seconds)
    #[arg(long, value_parser = parse_seconds)]
    pub cputime: Option<u64>,

    /// Queue candidate, only the first one is used
    #[arg(long = "queue")]
    pub queues: Vec<String>,

    /// Node to run on, needs --queue
    #[arg(long = "node")]
    pub nodes: Vec<String>,

    /// Sandbox directory
    #[arg(long, default_value = ".")]
    pub sandbox: Utf8PathBuf,

    /// Stdout file
    #[arg(long, default_value = "gc.stdout")]
    pub stdout: Utf8PathBuf,

    /// Stderr file
    #[arg(long, default_value = "gc.stderr")]
    pub stderr: Utf8PathBuf,
}

fn parse_seconds(s: &str) -> Result<u64, String> {
    parse_duration_secs(s).ok_or_else(|| format!("invalid duration: {}", s))
}

impl Args {
    /// Backend configuration from the command line.
    pub fn config(&self) -> GridEngineConfig {
        GridEngineConfig {
            user: non_empty_string(&self.user),
            project: non_empty_string(&self.project),
            qstat: self.qstat.clone(),
            qconf: self.qconf.clone(),
            status_timeout: Duration::from_secs(self.timeout),
            shell: self.shell.as_deref().and_then(non_empty_string),
            account: self.account.as_deref().and_then(non_empty_string),
        }
    }
}

impl SubmitArgs {
    pub fn requirements(&self) -> Requirements {
        Requirements {
            memory_mb: self.memory,
            walltime_secs: self.walltime,
            cputime_secs: self.cputime,
            queues: self.queues.clone(),
            sites: self.nodes.clone(),
        }
    }
}
