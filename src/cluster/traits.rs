//! Seams to the batch system and to long-term storage

use super::{ClusterResult, TransferReport};
use std::path::Path;

/// Starts a simulation job
pub trait JobRunner {
    /// Run `script` for the run named `run`
    fn launch(&self, script: &Path, run: &str) -> ClusterResult<()>;
}

/// Reports which runs the scheduler currently holds
pub trait JobStatusProvider {
    /// Output directory names of the user's active jobs
    fn active_runs(&self) -> ClusterResult<Vec<String>>;

    fn is_running(&self, run: &str) -> ClusterResult<bool> {
        Ok(self.active_runs()?.iter().any(|r| r == run))
    }

    fn active_count(&self) -> ClusterResult<usize> {
        Ok(self.active_runs()?.len())
    }
}

/// Moves run directories between scratch and permanent storage
pub trait ArchivalMover {
    /// Copy scratch directories starting with `prefix` to the archive
    fn archive(&self, prefix: &str, rename: Option<&str>) -> ClusterResult<TransferReport>;

    /// Copy archived directories starting with `prefix` back to scratch
    fn restore(&self, prefix: &str, rename: Option<&str>) -> ClusterResult<TransferReport>;
}
