//! Grid Engine integration for qbridge.
//!
//! Query job status via qstat, build qsub/qdel arguments and discover
//! queues and host groups via qconf.

pub mod backend;
pub mod qconf;
pub mod qstat;
pub mod qsub;
pub mod state;
pub mod types;

#[cfg(test)]
mod testing;

pub use backend::{ALIASES, GridEngine, GridEngineConfig};
pub use qconf::{QconfError, query_nodes, query_queues};
pub use qstat::{JobRecords, QstatError, StatusListing, query_qstat, repair_qstat_xml};
pub use qsub::{
    PbsGeCommon, QsubError, ResourceFlag, SharedSubmitArguments, SubmitJob, cancel_arguments,
    parse_submit_output, submit_arguments,
};
pub use state::parse_state;
pub use types::{JobStatusRecord, Topology};
