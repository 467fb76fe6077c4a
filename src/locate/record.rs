//! Per-pass resolution state

use crate::descriptor::{ParameterDescriptor, ParameterRequest};
use serde::Serialize;

/// Outcome of resolving one request during one pass
///
/// Records are built fresh for every pass; nothing carries over between
/// sessions or between repeated passes of the same session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionRecord {
    pub descriptor: ParameterDescriptor,
    /// Whether the request wants to write `value`
    pub modify: bool,
    pub found: bool,
    /// 1-based line number of the selected line
    pub line_number: Option<usize>,
    /// Target value for modify requests, resolved value for reads
    pub value: Option<String>,
    #[serde(skip)]
    remaining_occurrences: Option<i64>,
}

impl ResolutionRecord {
    pub fn new(request: &ParameterRequest) -> Self {
        Self {
            descriptor: request.descriptor.clone(),
            modify: request.is_modify(),
            found: false,
            line_number: None,
            value: request.target.clone(),
            remaining_occurrences: request.descriptor.occurrence.map(i64::from),
        }
    }

    /// Read-only record for a descriptor, ignoring any target value
    pub fn for_read(descriptor: &ParameterDescriptor) -> Self {
        Self::new(&ParameterRequest::read(descriptor.clone()))
    }

    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    /// Qualifying context lines still to pass before a candidate is selected
    ///
    /// Goes negative once the selected occurrence has been consumed, which
    /// keeps later candidates from ever being selected.
    pub fn remaining_occurrences(&self) -> Option<i64> {
        self.remaining_occurrences
    }

    /// Count one qualifying context line; true when the candidate is selected
    pub(crate) fn take_occurrence(&mut self) -> bool {
        match self.remaining_occurrences.as_mut() {
            None => true,
            Some(remaining) => {
                *remaining -= 1;
                *remaining == 0
            }
        }
    }
}
