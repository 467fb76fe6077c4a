//! Snapshots: replayable transcripts of resolved parameter values
//!
//! A snapshot stores values, not file text. Importing one looks every key
//! up in the current registry, so a snapshot taken against an older file
//! layout still applies as long as its keys exist.

mod codec;
mod paths;

pub use codec::{
    export, import, read_entries, to_requests, write, SnapshotEntry, SnapshotError,
    SnapshotResult, HEADER, MODIFIED_LABEL, READ_LABEL,
};
pub use paths::{export_path, import_path, is_restart, strip_restart_prefix, SNAPSHOT_FILE};
