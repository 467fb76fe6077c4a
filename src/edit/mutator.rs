//! Rewriting parameter values in place

use super::buffer::LineBuffer;
use crate::locate::{Hit, Locator, Resolution, ResolutionRecord, SearchMode};

/// Result of one mutation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub resolution: Resolution,
    /// The selected line's text actually changed
    pub changed: bool,
}

/// Splice `value` into `line` at the located span
///
/// Whole-line parameters get everything after the name replaced; token
/// parameters keep their separator and spacing and swap only the token.
pub fn rewrite(line: &str, hit: &Hit, whole_line: bool, value: &str) -> String {
    if whole_line {
        format!("{}{}", &line[..hit.name_end], value)
    } else {
        format!("{}{}{}", &line[..hit.value_start], value, &line[hit.value_end..])
    }
}

/// Locate the record's parameter and write its target value into `buffer`
///
/// Nothing is written when the parameter is missing or ambiguous; the caller
/// decides what that means for the rest of the session.
pub fn modify(
    locator: &Locator,
    buffer: &mut LineBuffer,
    record: &mut ResolutionRecord,
    mode: SearchMode,
) -> Mutation {
    let resolution = locator.locate(buffer.lines(), record, mode);
    let Resolution::Found(hit) = resolution else {
        return Mutation {
            resolution,
            changed: false,
        };
    };

    let value = record.value.as_deref().unwrap_or_default();
    let line = buffer.line(hit.index).unwrap_or_default();
    let updated = rewrite(line, &hit, record.descriptor.whole_line, value);
    let changed = buffer.replace(hit.index, updated);
    Mutation {
        resolution,
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParameterDescriptor, ParameterRequest};

    fn modify_text(desc: ParameterDescriptor, value: &str, text: &str) -> (Mutation, String) {
        let locator = Locator::compile(&desc).unwrap();
        let mut buffer = LineBuffer::parse(text);
        let mut record = ResolutionRecord::new(&ParameterRequest::modify(desc, value));
        let mutation = modify(&locator, &mut buffer, &mut record, SearchMode::Safe);
        (mutation, buffer.to_text())
    }

    #[test]
    fn token_keeps_separator_and_spacing() {
        let desc = ParameterDescriptor::new("n", "parameter", r"TESTCASE").with_condition("TESTCASE", "19");
        let (m, text) = modify_text(
            desc,
            "256",
            "c(TESTCASE == 19)\n      parameter (n = 128, m = 64)\n",
        );
        assert!(m.changed);
        assert_eq!(text, "c(TESTCASE == 19)\n      parameter (n = 256, m = 64)\n");
    }

    #[test]
    fn slash_separator_preserved() {
        let desc = ParameterDescriptor::new("zab", "data", "HELPER").numeric();
        let (_, text) = modify_text(desc, "200", "HELPER\n      data zab/150./\n");
        assert_eq!(text, "HELPER\n      data zab/200./\n");
    }

    #[test]
    fn whole_line_replaces_rest_of_line() {
        let desc = ParameterDescriptor::new("DIR", "setenv DIR /work", "#HELPER LINE").whole_line();
        let (m, text) = modify_text(
            desc,
            " /work/new/path",
            "#HELPER LINE\nsetenv DIR /work/old/path\nnext\n",
        );
        assert!(m.changed);
        assert_eq!(text, "#HELPER LINE\nsetenv DIR /work/new/path\nnext\n");
    }

    #[test]
    fn same_value_is_not_a_change() {
        let desc = ParameterDescriptor::new("NPX", "setenv NPX", "#HELPER LINE");
        let (m, text) = modify_text(desc, "8", "#HELPER LINE\nsetenv NPX 8\n");
        assert!(matches!(m.resolution, Resolution::Found(_)));
        assert!(!m.changed);
        assert_eq!(text, "#HELPER LINE\nsetenv NPX 8\n");
    }

    #[test]
    fn missing_parameter_leaves_buffer_alone() {
        let desc = ParameterDescriptor::new("NPY", "setenv NPY", "#HELPER LINE");
        let (m, text) = modify_text(desc, "2", "#HELPER LINE\nsetenv NPX 8\n");
        assert_eq!(m.resolution, Resolution::NotFound);
        assert_eq!(text, "#HELPER LINE\nsetenv NPX 8\n");
    }
}
