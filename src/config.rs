//! Deployment configuration
//!
//! One YAML file per deployment, by default
//! `<config_dir>/setpoint/config.yaml`:
//!
//! ```yaml
//! source: /home/me/EULAG/src/sunCAR30506.csh
//! output_dir: /scratch/me/EULAG_out
//! log: /home/me/EULAG/config/log.csv
//! archive_dir: /work/EULAG/archive
//! config_dir: /home/me/EULAG/config
//! testcase: "19"
//! ```

use crate::cluster::{FsArchive, WaitPolicy};
use crate::descriptor::{Catalog, CatalogError, ContextDefaults, DescriptorRegistry};
use crate::locate::SearchMode;
use crate::runlog::RunLog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const APP_DIR: &str = "setpoint";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("No platform config directory; pass --config")]
    NoConfigDir,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Overrides for the section-marker context; unset fields use the defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub pattern: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
}

fn default_safe() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The job script whose parameters are edited
    pub source: PathBuf,
    /// Scratch directory holding one subdirectory per run
    pub output_dir: PathBuf,
    /// Run log table
    pub log: PathBuf,
    /// Permanent storage for finished runs
    pub archive_dir: PathBuf,
    /// Where named snapshots are saved
    pub config_dir: PathBuf,
    /// Parameter catalog; the built-in one when unset
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Snapshot applied by `restore`
    #[serde(default)]
    pub default_snapshot: Option<PathBuf>,
    pub testcase: String,
    #[serde(default)]
    pub context: ContextSettings,
    /// Reject parameters that match more than one line
    #[serde(default = "default_safe")]
    pub safe: bool,
    #[serde(default)]
    pub scheduler: WaitPolicy,
    /// Program used to run `source`, if it is not executable itself
    #[serde(default)]
    pub interpreter: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading config");
        Self::from_yaml(&text)
    }

    /// Load `explicit` if given, otherwise the default location
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load(&Self::default_path()?),
        }
    }

    pub fn context_defaults(&self) -> ContextDefaults {
        let mut defaults = ContextDefaults::for_testcase(self.testcase.clone());
        if let Some(pattern) = &self.context.pattern {
            defaults.pattern = pattern.clone();
        }
        if let Some(key) = &self.context.key {
            defaults.key = Some(key.clone());
        }
        if let Some(value) = &self.context.value {
            defaults.value = Some(value.clone());
        }
        defaults
    }

    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        Ok(match &self.catalog {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin()?,
        })
    }

    /// Registry for the configured testcase
    ///
    /// A testcase without its own catalog section gets the common entries only.
    pub fn registry(&self) -> Result<DescriptorRegistry, ConfigError> {
        let catalog = self.catalog()?;
        let testcase = if catalog.testcases.contains_key(&self.testcase) {
            Some(self.testcase.as_str())
        } else {
            warn!(testcase = %self.testcase, "no catalog section for testcase; common parameters only");
            None
        };
        Ok(catalog.build(&self.context_defaults(), testcase)?)
    }

    pub fn search_mode(&self) -> SearchMode {
        if self.safe {
            SearchMode::Safe
        } else {
            SearchMode::Fast
        }
    }

    pub fn run_log(&self) -> RunLog {
        RunLog::new(&self.log)
    }

    pub fn archive(&self) -> FsArchive {
        FsArchive::new(&self.output_dir, &self.archive_dir)
    }
}
