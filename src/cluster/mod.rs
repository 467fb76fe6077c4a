//! Batch-system and storage collaborators
//!
//! The launcher only talks to the traits in this module. The concrete
//! implementations shell out to the job script and `squeue`, and copy run
//! directories on the local filesystem.

mod archive;
mod slurm;
mod traits;
mod wait;

pub use archive::{matching_dirs, renamed, FsArchive, Transfer, TransferReport};
pub use slurm::{parse_squeue, ScriptRunner, SlurmStatus};
pub use traits::{ArchivalMover, JobRunner, JobStatusProvider};
pub use wait::{wait_for_slot, wait_for_slot_with, WaitPolicy};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Job script for {run} failed: {status}")]
    JobFailed { run: String, status: String },

    #[error("Gave up waiting for {run} after {polls} polls")]
    WaitTimeout { run: String, polls: u32 },
}

pub type ClusterResult<T> = Result<T, ClusterError>;
