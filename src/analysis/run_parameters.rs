//! Parameter values recorded in a finished run's snapshot

use super::expr::{evaluate, ExprError, Number};
use crate::snapshot::{import_path, read_entries, SnapshotEntry, SnapshotError};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunParametersError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parameter not recorded: {0}")]
    Missing(String),

    #[error("Cannot evaluate {key}: {source}")]
    Expr {
        key: String,
        #[source]
        source: ExprError,
    },
}

/// Extent of the output grid along each axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DomainSizes {
    pub t: Number,
    pub x: Number,
    pub y: Number,
    pub z: Number,
}

/// Raw values from a run directory's snapshot
#[derive(Debug, Clone)]
pub struct RunParameters {
    source: PathBuf,
    by_key: HashMap<String, String>,
    by_name: HashMap<String, String>,
}

impl RunParameters {
    /// Read `run_dir/parameters.csv` (or a snapshot file directly)
    pub fn load(run_dir: &Path) -> Result<Self, RunParametersError> {
        let source = import_path(run_dir);
        let file = std::fs::File::open(&source)?;
        let entries = read_entries(file)?;
        Ok(Self::from_entries(source, &entries))
    }

    /// Later rows win; rows without a value are ignored
    pub fn from_entries(source: PathBuf, entries: &[SnapshotEntry]) -> Self {
        let mut by_key = HashMap::new();
        let mut by_name = HashMap::new();
        for entry in entries.iter().filter(|e| !e.value.is_empty()) {
            by_key.insert(entry.key.clone(), entry.value.clone());
            if let Some(name) = entry.name.as_ref().filter(|n| !n.is_empty()) {
                by_name.insert(name.clone(), entry.value.clone());
            }
        }
        Self {
            source,
            by_key,
            by_name,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Recorded text for `key`, falling back to a parameter name
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.by_key
            .get(key)
            .or_else(|| self.by_name.get(key))
            .map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Result<Number, RunParametersError> {
        let raw = self
            .raw(key)
            .ok_or_else(|| RunParametersError::Missing(key.to_string()))?;
        evaluate(raw).map_err(|source| RunParametersError::Expr {
            key: key.to_string(),
            source,
        })
    }

    /// `nt / min(nplot, nstore)`, floor-divided
    pub fn total_timesteps(&self) -> Result<Number, RunParametersError> {
        let nt = self.get("nt")?;
        let every = self.get("nplot")?.min(self.get("nstore")?);
        nt.floor_div(every).map_err(|source| RunParametersError::Expr {
            key: "nt".to_string(),
            source,
        })
    }

    pub fn domain_sizes(&self) -> Result<DomainSizes, RunParametersError> {
        Ok(DomainSizes {
            t: self.total_timesteps()?,
            x: self.get("n")?,
            y: self.get("m")?,
            z: self.get("l")?,
        })
    }
}
