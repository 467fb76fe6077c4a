//! Append-only run log
//!
//! One row per run. The header starts with `Started, Name, Notes` and gains
//! a column the first time a parameter key is logged; older rows keep their
//! original width and are padded only when read.

use crate::edit::write_atomic;
use crate::session::SessionOutcome;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const FIXED_COLUMNS: [&str; 3] = ["Started", "Name", "Notes"];

/// Format of the `Started` column
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%y %H:%M";

#[derive(Debug, Error)]
pub enum RunLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type RunLogResult<T> = Result<T, RunLogError>;

/// The log file's contents, rows unpadded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LogTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Cell of `row` under `column`; short rows read as empty
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column(column)?;
        let row = self.rows.get(row)?;
        Some(row.get(col).map(|s| s.as_str()).unwrap_or_default())
    }
}

/// Handle on a run log file
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the log; a missing file is an empty log
    pub fn read(&self) -> RunLogResult<LogTable> {
        if !self.path.exists() {
            return Ok(LogTable::default());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;
        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => Vec::new(),
        };
        let mut rows = Vec::new();
        for record in records {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(LogTable { header, rows })
    }

    /// Whether any logged cell equals `run`
    pub fn contains_run(&self, run: &str) -> RunLogResult<bool> {
        let table = self.read()?;
        Ok(table.rows.iter().any(|row| row.iter().any(|cell| cell == run)))
    }

    pub fn append(&self, run: &str, notes: &str, outcome: &SessionOutcome) -> RunLogResult<()> {
        self.append_at(run, notes, outcome, Local::now())
    }

    /// Add one row for `run`, growing the header with unseen keys
    pub fn append_at(
        &self,
        run: &str,
        notes: &str,
        outcome: &SessionOutcome,
        started: DateTime<Local>,
    ) -> RunLogResult<()> {
        let mut table = self.read()?;

        let fixed = [started.format(TIMESTAMP_FORMAT).to_string(), run.to_string(), notes.to_string()];
        let mut values: Vec<(String, String)> = FIXED_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .zip(fixed)
            .collect();
        for record in outcome.records() {
            values.push((record.key().to_string(), record.value.clone().unwrap_or_default()));
        }

        for (key, _) in &values {
            if !table.header.contains(key) {
                table.header.push(key.clone());
            }
        }

        let row: Vec<&str> = table
            .header
            .iter()
            .map(|column| {
                values
                    .iter()
                    .find(|(key, _)| key == column)
                    .map(|(_, value)| value.as_str())
                    .unwrap_or_default()
            })
            .collect();

        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
        writer.write_record(&table.header)?;
        for existing in &table.rows {
            writer.write_record(existing)?;
        }
        writer.write_record(&row)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| RunLogError::Io(e.into_error()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        write_atomic(&self.path, &bytes)?;
        info!(run, columns = table.header.len(), rows = table.rows.len() + 1, "run logged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParameterDescriptor, ParameterRequest};
    use crate::locate::ResolutionRecord;
    use chrono::TimeZone;

    fn outcome(pairs: &[(&str, Option<&str>)]) -> SessionOutcome {
        let read = pairs
            .iter()
            .map(|(key, value)| {
                let mut rec = ResolutionRecord::new(&ParameterRequest::read(ParameterDescriptor::new(
                    *key, "x", "y",
                )));
                rec.value = value.map(str::to_string);
                rec
            })
            .collect();
        SessionOutcome {
            lines_changed: 0,
            modified: Vec::new(),
            read,
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap()
    }

    #[test]
    fn first_run_creates_header() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.csv"));
        log.append_at("A", "", &outcome(&[("X", Some("1"))]), at()).unwrap();
        let table = log.read().unwrap();
        assert_eq!(table.header, vec!["Started", "Name", "Notes", "X"]);
        assert_eq!(table.rows[0], vec!["05.03.24 14:07", "A", "", "1"]);
    }

    #[test]
    fn unresolved_values_log_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.csv"));
        log.append_at("A", "note", &outcome(&[("X", None)]), at()).unwrap();
        let table = log.read().unwrap();
        assert_eq!(table.cell(0, "Notes"), Some("note"));
        assert_eq!(table.cell(0, "X"), Some(""));
    }

    #[test]
    fn contains_run_matches_whole_cells() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.csv"));
        assert!(!log.contains_run("A").unwrap());
        log.append_at("DIANA_1", "", &outcome(&[]), at()).unwrap();
        assert!(log.contains_run("DIANA_1").unwrap());
        assert!(!log.contains_run("DIANA").unwrap());
    }
}
