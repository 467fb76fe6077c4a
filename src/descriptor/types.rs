//! Parameter descriptors and the requests built from them

use serde::{Deserialize, Serialize};

/// How to find and recognize one parameter in a source file
///
/// Descriptors are templates: they are built once when the registry is
/// assembled and never change afterwards. Per-pass working state lives in
/// [`crate::locate::ResolutionRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Unique identifier within a registry
    pub key: String,
    /// Literal text the candidate line starts with (after leading whitespace)
    pub anchor: String,
    /// Literal parameter name as it appears in the line
    pub name: String,
    /// Regex identifying the section line above the candidate
    pub context_pattern: String,
    /// Name checked for equality inside the context line
    pub context_key: Option<String>,
    /// Value the context key must equal
    pub context_value: Option<String>,
    /// 1-based ordinal of the qualifying context line to honor
    pub occurrence: Option<u32>,
    /// Value is the rest of the line instead of a single token
    pub whole_line: bool,
    /// Value must be written as a float literal
    pub numeric: bool,
}

impl ParameterDescriptor {
    /// Create a descriptor whose key equals its name
    pub fn new(
        name: impl Into<String>,
        anchor: impl Into<String>,
        context_pattern: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            anchor: anchor.into(),
            name,
            context_pattern: context_pattern.into(),
            context_key: None,
            context_value: None,
            occurrence: None,
            whole_line: false,
            numeric: false,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Require `key == value` inside the context line
    pub fn with_condition(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_key = Some(key.into());
        self.context_value = Some(value.into());
        self
    }

    pub fn with_occurrence(mut self, occurrence: u32) -> Self {
        self.occurrence = Some(occurrence);
        self
    }

    pub fn whole_line(mut self) -> Self {
        self.whole_line = true;
        self
    }

    pub fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    /// Whether the context line must also satisfy an equality condition
    pub fn has_condition(&self) -> bool {
        self.context_key.is_some() || self.context_value.is_some()
    }

    /// Whether `value` can be written and then located again unchanged
    ///
    /// Token values stop at whitespace or the delimiters `/`, `,` and `)`;
    /// no value may span lines.
    pub fn accepts_value(&self, value: &str) -> bool {
        if value.contains(['\r', '\n']) {
            return false;
        }
        self.whole_line
            || !(value.is_empty() || value.chars().any(|c| c.is_whitespace() || matches!(c, '/' | ',' | ')')))
    }

    /// Apply the float-literal rule if this descriptor is numeric
    pub fn format_value(&self, value: &str) -> String {
        if self.numeric {
            format_numeric(value)
        } else {
            value.to_string()
        }
    }
}

/// Append a `.` to values that would otherwise be read as integers
///
/// Only a lowercase `e` counts as an exponent marker.
pub fn format_numeric(value: &str) -> String {
    if value.contains('.') || value.contains('e') {
        value.to_string()
    } else {
        format!("{}.", value)
    }
}

/// A descriptor instance queued in a session
///
/// With a target value it is a modify request, without one a read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRequest {
    pub descriptor: ParameterDescriptor,
    pub target: Option<String>,
}

impl ParameterRequest {
    pub fn read(descriptor: ParameterDescriptor) -> Self {
        Self {
            descriptor,
            target: None,
        }
    }

    /// Build a modify request; numeric formatting is applied here
    pub fn modify(descriptor: ParameterDescriptor, value: impl AsRef<str>) -> Self {
        let target = descriptor.format_value(value.as_ref());
        Self {
            descriptor,
            target: Some(target),
        }
    }

    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub fn is_modify(&self) -> bool {
        self.target.is_some()
    }
}
