//! Job script runner and Slurm queue status

use super::{ClusterError, ClusterResult, JobRunner, JobStatusProvider};
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

/// Runs the job script with the run name as its only argument
#[derive(Debug, Clone, Default)]
pub struct ScriptRunner {
    interpreter: Option<String>,
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the script through `interpreter` (e.g. `csh`) instead of executing it
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }
}

impl JobRunner for ScriptRunner {
    fn launch(&self, script: &Path, run: &str) -> ClusterResult<()> {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(script);
                cmd
            }
            None => Command::new(script),
        };
        let status = cmd.arg(run).status()?;
        if !status.success() {
            return Err(ClusterError::JobFailed {
                run: run.to_string(),
                status: status.to_string(),
            });
        }
        info!(run, script = %script.display(), "job started");
        Ok(())
    }
}

/// Active jobs as reported by `squeue`
#[derive(Debug, Clone)]
pub struct SlurmStatus {
    user: String,
    program: String,
}

impl SlurmStatus {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            program: "squeue".to_string(),
        }
    }

    /// Query the jobs of the user running this process
    pub fn current_user() -> ClusterResult<Self> {
        if let Ok(user) = std::env::var("USER") {
            if !user.is_empty() {
                return Ok(Self::new(user));
            }
        }
        let output = Command::new("whoami").output()?;
        Ok(Self::new(String::from_utf8_lossy(&output.stdout).trim()))
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl JobStatusProvider for SlurmStatus {
    fn active_runs(&self) -> ClusterResult<Vec<String>> {
        let output = Command::new(&self.program)
            .args(["-u", &self.user, "-o", "%j %Z"])
            .output()?;
        if !output.status.success() {
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "squeue failed; assuming no active jobs"
            );
            return Ok(Vec::new());
        }
        Ok(parse_squeue(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Output directory names from `squeue -o "%j %Z"` output
///
/// The first line is the header. The run name is the last path segment of
/// each job's working directory.
pub fn parse_squeue(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _job = fields.next()?;
            let dir = fields.last()?;
            dir.trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
        .collect()
}
