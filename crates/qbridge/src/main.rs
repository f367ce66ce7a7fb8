//! qbridge - Grid Engine adapter command line.

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use qbridge_cli::{Args, Commands, SubmitArgs};
use qbridge_gridengine::{GridEngine, JobStatusRecord, SubmitJob};
use qbridge_parsers::TokioRunner;
use qbridge_state::{JobState, ToJobState};
use serde::Serialize;
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

type Backend = GridEngine<TokioRunner>;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let backend = GridEngine::new(args.config(), TokioRunner);

    match &args.command {
        Commands::Status => print_status(&backend, args.json).await,
        Commands::Queues => print_queues(&backend, args.json).await,
        Commands::Nodes => print_nodes(&backend, args.json).await,
        Commands::SubmitArgs(submit) => print_submit_args(&backend, submit),
        Commands::ParseSubmit { output } => {
            let data = match output {
                Some(output) => output.clone(),
                None => {
                    let mut data = String::new();
                    io::stdin().read_to_string(&mut data).into_diagnostic()?;
                    data
                }
            };
            println!("{}", backend.parse_submit_output(&data).into_diagnostic()?);
            Ok(())
        }
        Commands::CancelArgs { ids } => {
            println!("{}", backend.cancel_arguments(ids.as_slice()));
            Ok(())
        }
    }
}

/// Log to stderr, filtered by RUST_LOG (warnings by default).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[derive(Serialize)]
struct JobLine<'a> {
    #[serde(flatten)]
    record: &'a JobStatusRecord,
    state: JobState,
}

async fn print_status(backend: &Backend, json: bool) -> Result<()> {
    let listing = backend.check_jobs().await.into_diagnostic()?;
    for record in listing.jobs().into_diagnostic()? {
        let record = record.into_diagnostic()?;
        let state = record.to_job_state();
        if json {
            let line = JobLine {
                record: &record,
                state,
            };
            println!("{}", serde_json::to_string(&line).into_diagnostic()?);
        } else {
            println!(
                "{}\t{}\t{}\t{}\t{}",
                record.wms_id,
                record.raw_status,
                state,
                record.queue.as_deref().unwrap_or("-"),
                record.node.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

async fn print_queues(backend: &Backend, json: bool) -> Result<()> {
    let queues = backend.queues().await.into_diagnostic()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&queues).into_diagnostic()?);
        return Ok(());
    }
    for (name, limits) in &queues {
        let limits = limits
            .iter()
            .map(|(kind, value)| format!("{}={}", kind, value))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{}\t{}", name, limits);
    }
    Ok(())
}

async fn print_nodes(backend: &Backend, json: bool) -> Result<()> {
    let nodes = backend.nodes().await.into_diagnostic()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&nodes).into_diagnostic()?);
        return Ok(());
    }
    match nodes {
        Some(nodes) => {
            for node in nodes {
                println!("{}", node);
            }
        }
        None => tracing::info!("No host groups defined"),
    }
    Ok(())
}

fn print_submit_args(backend: &Backend, submit: &SubmitArgs) -> Result<()> {
    let requirements = submit.requirements();
    let job = SubmitJob {
        job_num: submit.job_num,
        job_name: &submit.name,
        requirements: &requirements,
        sandbox: &submit.sandbox,
        stdout: &submit.stdout,
        stderr: &submit.stderr,
    };
    let args = backend.submit_arguments(&job).into_diagnostic()?;
    println!("{}", args.trim_start());
    Ok(())
}
