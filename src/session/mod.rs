//! Session: one batch of read/modify requests against one file
//!
//! A session runs the mutator pass, then the reader pass, over a single
//! in-memory copy of the target. The file on disk is only replaced once
//! both passes succeed, so every fatal error leaves it byte-identical.
//!
//! Missing parameters are treated asymmetrically: a modify request that
//! cannot be located aborts the session, a read request that cannot be
//! located only logs a warning and stays unresolved.

use crate::descriptor::{DescriptorRegistry, ParameterRequest, RegistryError};
use crate::edit::{mutator, reader, LineBuffer};
use crate::locate::{LocateError, Locator, Resolution, ResolutionRecord, SearchMode};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a session without writing
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("Parameter {key}/{name} matches both line {first} and line {second}")]
    AmbiguousMatch {
        key: String,
        name: String,
        first: usize,
        second: usize,
    },

    #[error("Value {value:?} for {key} cannot be written back as a single value")]
    InvalidValue { key: String, value: String },

    #[error("Parameter {key}/{name} not located; nothing was written")]
    ParameterNotLocated { key: String, name: String },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// What a completed pass changed and resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionOutcome {
    /// Lines whose text actually changed
    pub lines_changed: usize,
    /// One record per modify request, in session order
    pub modified: Vec<ResolutionRecord>,
    /// One record per read request not shadowed by a modify request
    pub read: Vec<ResolutionRecord>,
}

impl SessionOutcome {
    /// Value for `key`, preferring the modified block
    pub fn value(&self, key: &str) -> Option<&str> {
        self.records()
            .find(|r| r.key() == key)
            .and_then(|r| r.value.as_deref())
    }

    pub fn records(&self) -> impl Iterator<Item = &ResolutionRecord> {
        self.modified.iter().chain(self.read.iter())
    }

    /// Read records that were never located
    pub fn unresolved(&self) -> impl Iterator<Item = &ResolutionRecord> {
        self.read.iter().filter(|r| !r.found)
    }
}

/// Ordered read/modify requests keyed by descriptor key
#[derive(Debug, Clone, Default)]
pub struct Session {
    to_modify: Vec<ParameterRequest>,
    to_read: Vec<ParameterRequest>,
    mode: SearchMode,
}

fn upsert(requests: &mut Vec<ParameterRequest>, request: ParameterRequest) {
    match requests.iter_mut().find(|r| r.key() == request.key()) {
        Some(existing) => *existing = request,
        None => requests.push(request),
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Queue a request; re-adding a key replaces it in place
    pub fn add(&mut self, request: ParameterRequest) {
        if request.is_modify() {
            upsert(&mut self.to_modify, request);
        } else {
            upsert(&mut self.to_read, request);
        }
    }

    pub fn extend(&mut self, requests: impl IntoIterator<Item = ParameterRequest>) {
        for request in requests {
            self.add(request);
        }
    }

    /// Queue a write of `value` for `key`
    pub fn set(
        &mut self,
        registry: &DescriptorRegistry,
        key: &str,
        value: &str,
    ) -> Result<(), RegistryError> {
        self.add(registry.instantiate(key, Some(value))?);
        Ok(())
    }

    /// Queue a read of `key`
    pub fn get(&mut self, registry: &DescriptorRegistry, key: &str) -> Result<(), RegistryError> {
        self.add(registry.instantiate(key, None)?);
        Ok(())
    }

    /// Queue a read of every registered parameter
    pub fn read_all(&mut self, registry: &DescriptorRegistry) {
        for descriptor in registry.iter() {
            self.add(ParameterRequest::read(descriptor.clone()));
        }
    }

    pub fn to_modify(&self) -> &[ParameterRequest] {
        &self.to_modify
    }

    pub fn to_read(&self) -> &[ParameterRequest] {
        &self.to_read
    }

    pub fn is_modified(&self, key: &str) -> bool {
        self.to_modify.iter().any(|r| r.key() == key)
    }

    pub fn is_empty(&self) -> bool {
        self.to_modify.is_empty() && self.to_read.is_empty()
    }

    /// Run both passes against `buffer` without touching disk
    pub fn apply(&self, buffer: &mut LineBuffer) -> SessionResult<SessionOutcome> {
        for request in &self.to_modify {
            if let Some(value) = request.target.as_deref() {
                if !request.descriptor.accepts_value(value) {
                    return Err(SessionError::InvalidValue {
                        key: request.key().to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }

        let mut outcome = SessionOutcome::default();
        for request in &self.to_modify {
            let locator = Locator::compile(&request.descriptor)?;
            let mut record = ResolutionRecord::new(request);
            let mutation = mutator::modify(&locator, buffer, &mut record, self.mode);
            match mutation.resolution {
                Resolution::Found(hit) => {
                    let value = record.value.as_deref().unwrap_or_default();
                    if mutation.changed {
                        outcome.lines_changed += 1;
                        info!(key = record.key(), line = hit.line_number(), value, "modified");
                    } else {
                        info!(key = record.key(), line = hit.line_number(), value, "already set");
                    }
                }
                Resolution::NotFound => {
                    return Err(SessionError::ParameterNotLocated {
                        key: request.key().to_string(),
                        name: request.descriptor.name.clone(),
                    })
                }
                Resolution::Ambiguous { first, second } => {
                    return Err(ambiguous(request, first.line_number(), second.line_number()))
                }
            }
            outcome.modified.push(record);
        }

        for request in self.to_read.iter().filter(|r| !self.is_modified(r.key())) {
            outcome.read.push(self.resolve_read(request, buffer)?);
        }

        Ok(outcome)
    }

    /// Apply the session to the file at `path`
    ///
    /// The file is rewritten (temp file + rename) only when both passes
    /// succeed and at least one line changed.
    pub fn process(&self, path: &Path) -> SessionResult<SessionOutcome> {
        let mut buffer = LineBuffer::read(path)?;
        let outcome = self.apply(&mut buffer)?;
        if outcome.lines_changed > 0 {
            buffer.persist(path)?;
        }
        info!(path = %path.display(), lines_changed = outcome.lines_changed, "session complete");
        Ok(outcome)
    }

    /// Resolve every request read-only, modify requests included
    pub fn inspect(&self, path: &Path) -> SessionResult<SessionOutcome> {
        let buffer = LineBuffer::read(path)?;
        let mut outcome = SessionOutcome::default();
        let reads = self.to_read.iter().filter(|r| !self.is_modified(r.key()));
        for request in self.to_modify.iter().chain(reads) {
            let request = ParameterRequest::read(request.descriptor.clone());
            outcome.read.push(self.resolve_read(&request, &buffer)?);
        }
        Ok(outcome)
    }

    fn resolve_read(
        &self,
        request: &ParameterRequest,
        buffer: &LineBuffer,
    ) -> SessionResult<ResolutionRecord> {
        let locator = Locator::compile(&request.descriptor)?;
        let mut record = ResolutionRecord::new(request);
        match reader::read(&locator, buffer.lines(), &mut record, self.mode) {
            Resolution::Found(hit) => {
                debug!(
                    key = record.key(),
                    line = hit.line_number(),
                    value = record.value.as_deref().unwrap_or_default(),
                    "read"
                );
            }
            Resolution::NotFound => {
                let d = &request.descriptor;
                warn!(
                    key = %d.key,
                    name = %d.name,
                    context = %d.context_pattern,
                    context_key = d.context_key.as_deref().unwrap_or_default(),
                    context_value = d.context_value.as_deref().unwrap_or_default(),
                    occurrence = ?d.occurrence,
                    "parameter not found; value left unresolved"
                );
            }
            Resolution::Ambiguous { first, second } => {
                return Err(ambiguous(request, first.line_number(), second.line_number()))
            }
        }
        Ok(record)
    }
}

fn ambiguous(request: &ParameterRequest, first: usize, second: usize) -> SessionError {
    SessionError::AmbiguousMatch {
        key: request.key().to_string(),
        name: request.descriptor.name.clone(),
        first,
        second,
    }
}
