//! Snapshot table encoding
//!
//! Two labeled blocks, each a header row followed by one row per record:
//!
//! ```text
//! Changed parameters
//! anchor,line_number,para_name,value,...,key_name
//! parameter ,42,n,256,...,n
//!
//! Read parameters
//! anchor,line_number,para_name,value,...,key_name
//! ...
//! ```
//!
//! Readers locate `key_name` (or `para_name`) and `value` by column name, so
//! tables written with extra or reordered columns still import.

use crate::descriptor::{DescriptorRegistry, ParameterRequest};
use crate::locate::ResolutionRecord;
use crate::session::SessionOutcome;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const MODIFIED_LABEL: &str = "Changed parameters";
pub const READ_LABEL: &str = "Read parameters";

pub const HEADER: [&str; 11] = [
    "anchor",
    "line_number",
    "para_name",
    "value",
    "context_pattern",
    "context_key",
    "context_value",
    "occurrence",
    "whole_line",
    "numeric",
    "key_name",
];

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Snapshot already exists: {0}")]
    Exists(PathBuf),

    #[error("Snapshot header has no {0} column")]
    MissingColumn(&'static str),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// One data row of a snapshot table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub key: String,
    pub name: Option<String>,
    pub value: String,
    /// 1-based row in the table
    pub row: usize,
}

fn record_row(record: &ResolutionRecord) -> Vec<String> {
    let d = &record.descriptor;
    vec![
        d.anchor.clone(),
        record.line_number.map(|n| n.to_string()).unwrap_or_default(),
        d.name.clone(),
        record.value.clone().unwrap_or_default(),
        d.context_pattern.clone(),
        d.context_key.clone().unwrap_or_default(),
        d.context_value.clone().unwrap_or_default(),
        d.occurrence.map(|n| n.to_string()).unwrap_or_default(),
        d.whole_line.to_string(),
        d.numeric.to_string(),
        d.key.clone(),
    ]
}

/// Encode an outcome; unresolved reads are left out of the read block
pub fn write<W: Write>(outcome: &SessionOutcome, mut writer: W) -> SnapshotResult<()> {
    let mut out = csv::WriterBuilder::new().flexible(true).from_writer(&mut writer);

    out.write_record([MODIFIED_LABEL])?;
    out.write_record(HEADER)?;
    for record in &outcome.modified {
        out.write_record(record_row(record))?;
    }

    // csv writes an empty record as `""`, the separator must be a bare newline
    out.flush()?;
    drop(out);
    writer.write_all(b"\n")?;
    let mut out = csv::WriterBuilder::new().flexible(true).from_writer(&mut writer);
    out.write_record([READ_LABEL])?;
    out.write_record(HEADER)?;
    for record in outcome.read.iter().filter(|r| r.value.is_some()) {
        out.write_record(record_row(record))?;
    }

    out.flush()?;
    Ok(())
}

/// Write a snapshot file, refusing to replace one unless `overwrite` is set
pub fn export(outcome: &SessionOutcome, path: &Path, overwrite: bool) -> SnapshotResult<()> {
    if path.exists() && !overwrite {
        return Err(SnapshotError::Exists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut bytes = Vec::new();
    write(outcome, &mut bytes)?;
    crate::edit::write_atomic(path, &bytes)?;
    info!(path = %path.display(), modified = outcome.modified.len(), "snapshot exported");
    Ok(())
}

struct Columns {
    key: usize,
    name: Option<usize>,
    value: usize,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> SnapshotResult<Self> {
        let find = |name: &str| header.iter().position(|h| h.trim() == name);
        let key = match find("key_name") {
            Some(i) => i,
            None => {
                warn!("snapshot has no key_name column, using para_name");
                find("para_name").ok_or(SnapshotError::MissingColumn("key_name"))?
            }
        };
        let value = find("value").ok_or(SnapshotError::MissingColumn("value"))?;
        Ok(Self {
            key,
            name: find("para_name"),
            value,
        })
    }
}

/// Decode every data row, empty values included
pub fn read_entries<R: Read>(reader: R) -> SnapshotResult<Vec<SnapshotEntry>> {
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut columns: Option<Columns> = None;
    let mut entries = Vec::new();
    for (i, result) in rows.records().enumerate() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let first = record.get(0).unwrap_or_default();
        if first == MODIFIED_LABEL || first == READ_LABEL {
            columns = None;
            continue;
        }
        if columns.is_none() {
            columns = Some(Columns::from_header(&record)?);
            continue;
        }
        let Some(cols) = columns.as_ref() else {
            continue;
        };
        entries.push(SnapshotEntry {
            key: record.get(cols.key).unwrap_or_default().trim().to_string(),
            name: cols.name.and_then(|n| record.get(n)).map(str::to_string),
            value: record.get(cols.value).unwrap_or_default().to_string(),
            row: i + 1,
        });
    }
    Ok(entries)
}

/// Turn snapshot rows into modify requests against the live registry
///
/// Rows without a value and keys the registry no longer knows are skipped
/// with a warning. Numeric formatting is applied again on the way in.
pub fn to_requests(entries: &[SnapshotEntry], registry: &DescriptorRegistry) -> Vec<ParameterRequest> {
    let mut requests = Vec::new();
    for entry in entries {
        if entry.value.is_empty() {
            warn!(key = %entry.key, row = entry.row, "snapshot row has no value; skipped");
            continue;
        }
        let Some(descriptor) = registry.get(&entry.key) else {
            warn!(key = %entry.key, row = entry.row, "unknown parameter in snapshot; skipped");
            continue;
        };
        let request = ParameterRequest::modify(descriptor.clone(), &entry.value);
        info!(
            key = %entry.key,
            value = request.target.as_deref().unwrap_or_default(),
            "imported"
        );
        requests.push(request);
    }
    requests
}

/// Read a snapshot file (or a run directory's `parameters.csv`)
pub fn import(path: &Path, registry: &DescriptorRegistry) -> SnapshotResult<Vec<ParameterRequest>> {
    let path = super::import_path(path);
    let file = std::fs::File::open(&path)?;
    let entries = read_entries(file)?;
    Ok(to_requests(&entries, registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ParameterDescriptor;

    fn registry() -> DescriptorRegistry {
        let mut reg = DescriptorRegistry::new();
        reg.register(ParameterDescriptor::new("n", "parameter ", "HELPER"));
        reg.register(ParameterDescriptor::new("dx00", "parameter ", "HELPER").numeric());
        reg
    }

    fn outcome(reg: &DescriptorRegistry) -> SessionOutcome {
        let mut modified = ResolutionRecord::new(&reg.instantiate("n", Some("256")).unwrap());
        modified.found = true;
        modified.line_number = Some(42);
        let mut read = ResolutionRecord::new(&reg.instantiate("dx00", None).unwrap());
        read.value = Some("600.".into());
        let unresolved = ResolutionRecord::for_read(&ParameterDescriptor::new("x", "y", "z"));
        SessionOutcome {
            lines_changed: 1,
            modified: vec![modified],
            read: vec![read, unresolved],
        }
    }

    #[test]
    fn layout_has_two_labeled_blocks() {
        let reg = registry();
        let mut bytes = Vec::new();
        write(&outcome(&reg), &mut bytes).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], MODIFIED_LABEL);
        assert_eq!(lines[1], HEADER.join(","));
        assert_eq!(lines[2], "parameter ,42,n,256,HELPER,,,,false,false,n");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], READ_LABEL);
        assert_eq!(lines.len(), 7, "unresolved read must be omitted");
    }

    #[test]
    fn empty_outcome_still_separates_blocks_with_a_blank_line() {
        let mut bytes = Vec::new();
        write(&SessionOutcome::default(), &mut bytes).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = HEADER.join(",");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![MODIFIED_LABEL, header.as_str(), "", READ_LABEL, header.as_str()]);
        assert!(read_entries(text.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn entries_found_by_column_name() {
        let table = "Changed parameters\nvalue,key_name\n5,n\n\nRead parameters\nkey_name,extra,value\ndx00,?,3\n";
        let entries = read_entries(table.as_bytes()).unwrap();
        let pairs: Vec<_> = entries.iter().map(|e| (e.key.as_str(), e.value.as_str())).collect();
        assert_eq!(pairs, vec![("n", "5"), ("dx00", "3")]);
    }

    #[test]
    fn para_name_column_is_the_fallback_key() {
        let table = "Changed parameters\npara_name,value\nn,5\n";
        let entries = read_entries(table.as_bytes()).unwrap();
        assert_eq!(entries[0].key, "n");
    }

    #[test]
    fn missing_value_column_is_an_error() {
        let table = "Changed parameters\nkey_name,other\nn,5\n";
        let err = read_entries(table.as_bytes()).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingColumn("value")));
    }

    #[test]
    fn requests_skip_unknown_and_empty_and_reformat_numeric() {
        let table = "Changed parameters\nkey_name,value\nn,\nghost,1\ndx00,600\n";
        let entries = read_entries(table.as_bytes()).unwrap();
        let requests = to_requests(&entries, &registry());
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].key(), "dx00");
        assert_eq!(requests[0].target.as_deref(), Some("600."));
    }

    #[test]
    fn export_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("parameters.csv");
        let reg = registry();
        export(&outcome(&reg), &path, false).unwrap();
        let err = export(&outcome(&reg), &path, false).unwrap_err();
        assert!(matches!(err, SnapshotError::Exists(_)));
        export(&outcome(&reg), &path, true).unwrap();
    }

    #[test]
    fn import_reads_run_directory() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry();
        export(&outcome(&reg), &dir.path().join("parameters.csv"), false).unwrap();
        let requests = import(dir.path(), &reg).unwrap();
        let keys: Vec<_> = requests.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["n", "dx00"]);
    }
}
