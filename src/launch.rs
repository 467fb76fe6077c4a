//! Starting runs: edit the job script, submit it, record what was run
//!
//! A launch refuses run names that were used before, applies the session to
//! the job script, starts the job and then writes the run's snapshot and
//! log row. Restart runs (`RESTART<n>_<run>`) are submitted under their
//! original run name so the job continues in the same output directory.

use crate::cluster::{matching_dirs, ClusterError, JobRunner, JobStatusProvider};
use crate::descriptor::{DescriptorRegistry, RegistryError};
use crate::locate::SearchMode;
use crate::runlog::{RunLog, RunLogError};
use crate::session::{Session, SessionError, SessionOutcome};
use crate::snapshot::{self, export_path, strip_restart_prefix, SnapshotError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Run name already used: {0}")]
    DuplicateRun(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    RunLog(#[from] RunLogError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LaunchResult<T> = Result<T, LaunchError>;

/// Which side effects a launch performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Apply modify requests; when off the script is only inspected
    pub modify: bool,
    pub export: bool,
    pub log: bool,
    pub notes: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            modify: true,
            export: true,
            log: true,
            notes: String::new(),
        }
    }
}

impl LaunchOptions {
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Result of one launch
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub run: String,
    /// Name the job was submitted under
    pub job: String,
    pub outcome: SessionOutcome,
    pub snapshot: Option<PathBuf>,
}

pub struct Launcher<'a> {
    source: PathBuf,
    output_dir: PathBuf,
    run_log: RunLog,
    runner: &'a dyn JobRunner,
    status: &'a dyn JobStatusProvider,
    mode: SearchMode,
}

impl<'a> Launcher<'a> {
    pub fn new(
        source: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        run_log: RunLog,
        runner: &'a dyn JobRunner,
        status: &'a dyn JobStatusProvider,
    ) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            run_log,
            runner,
            status,
            mode: SearchMode::Safe,
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Whether `run` is in the log or names part of an output directory
    pub fn is_duplicate(&self, run: &str) -> LaunchResult<bool> {
        if self.run_log.contains_run(run)? {
            info!(run, log = %self.run_log.path().display(), "run already logged");
            return Ok(true);
        }
        if !self.output_dir.is_dir() {
            return Ok(false);
        }
        for entry in std::fs::read_dir(&self.output_dir)? {
            let name = entry?.file_name();
            if name.to_string_lossy().contains(run) {
                info!(run, dir = %name.to_string_lossy(), "output directory already exists");
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn launch(
        &self,
        session: &Session,
        run: &str,
        options: &LaunchOptions,
    ) -> LaunchResult<LaunchReport> {
        if self.is_duplicate(run)? {
            return Err(LaunchError::DuplicateRun(run.to_string()));
        }

        let outcome = if options.modify {
            session.process(&self.source)?
        } else {
            session.inspect(&self.source)?
        };

        let job = strip_restart_prefix(run);
        self.runner.launch(&self.source, &job)?;
        info!(run, job = %job, "run launched");

        let snapshot = if options.export {
            let path = export_path(&self.output_dir, run, snapshot::SNAPSHOT_FILE);
            snapshot::export(&outcome, &path, true)?;
            Some(path)
        } else {
            None
        };
        if options.log {
            self.run_log.append(run, &options.notes, &outcome)?;
        }

        Ok(LaunchReport {
            run: run.to_string(),
            job,
            outcome,
            snapshot,
        })
    }

    /// Restart every idle run whose directory starts with `prefix`
    ///
    /// Each run's own snapshot is replayed, then `overrides` are applied on
    /// top, and the result is launched as `RESTART<number>_<run>`.
    pub fn restart(
        &self,
        registry: &DescriptorRegistry,
        prefix: &str,
        number: u32,
        overrides: &[(String, String)],
        options: &LaunchOptions,
    ) -> LaunchResult<Vec<LaunchReport>> {
        let mut reports = Vec::new();
        for dir in self.restart_candidates(prefix)? {
            if self.status.is_running(&dir)? {
                info!(run = %dir, "already running; not restarted");
                continue;
            }
            let mut session = Session::new().with_mode(self.mode);
            session.read_all(registry);
            session.extend(snapshot::import(&self.output_dir.join(&dir), registry)?);
            for (key, value) in overrides {
                session.set(registry, key, value)?;
            }
            let run = format!("RESTART{}_{}", number, dir);
            reports.push(self.launch(&session, &run, options)?);
        }
        Ok(reports)
    }

    /// Output directories a restart with `prefix` would consider
    pub fn restart_candidates(&self, prefix: &str) -> LaunchResult<Vec<String>> {
        Ok(matching_dirs(&self.output_dir, prefix)?)
    }
}
