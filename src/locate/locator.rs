//! Contextual locator: anchor match, backward context scan, occurrence selection

use super::record::ResolutionRecord;
use crate::descriptor::ParameterDescriptor;
use regex_lite::{escape, Regex};
use thiserror::Error;

/// Lines scanned backward (candidate included) when looking for a context line
pub const CONTEXT_WINDOW: usize = 30;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("Invalid pattern for {key}: {message}")]
    InvalidPattern { key: String, message: String },
}

/// Whether a pass keeps scanning after the first selected line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Scan the whole file and report a second selected line as ambiguous
    #[default]
    Safe,
    /// Stop at the first selected line
    Fast,
}

/// A selected line and the byte spans of the name and value inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// 0-based line index
    pub index: usize,
    pub name_start: usize,
    pub name_end: usize,
    pub value_start: usize,
    pub value_end: usize,
}

impl Hit {
    pub fn line_number(&self) -> usize {
        self.index + 1
    }

    pub fn value<'a>(&self, line: &'a str) -> &'a str {
        &line[self.value_start..self.value_end]
    }
}

/// Result of a locate pass for one descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(Hit),
    NotFound,
    Ambiguous { first: Hit, second: Hit },
}

/// Compiled matchers for one descriptor
#[derive(Debug)]
pub struct Locator {
    anchor: Regex,
    value: Regex,
    context: Regex,
    condition: Option<Regex>,
}

impl Locator {
    /// Compile the matchers; literals from the descriptor are always escaped
    pub fn compile(descriptor: &ParameterDescriptor) -> Result<Self, LocateError> {
        let invalid = |e: regex_lite::Error| LocateError::InvalidPattern {
            key: descriptor.key.clone(),
            message: e.to_string(),
        };

        let anchor = Regex::new(&format!(r"^\s*{}", escape(&descriptor.anchor))).map_err(invalid)?;
        let name = escape(&descriptor.name);
        let value_pattern = if descriptor.whole_line {
            format!(r"(?:^|[ ,(])({})(.*)", name)
        } else {
            format!(r"(?:^|[ ,(])({})\s*[=/ ]\s*([^ /,)\r\n]+)", name)
        };
        let value = Regex::new(&value_pattern).map_err(invalid)?;
        let context = Regex::new(&descriptor.context_pattern).map_err(invalid)?;
        let condition = if descriptor.has_condition() {
            let key = descriptor.context_key.as_deref().unwrap_or_default();
            let value = descriptor.context_value.as_deref().unwrap_or_default();
            Some(Regex::new(&format!(r"{}\s*==\s*{}", escape(key), escape(value))).map_err(invalid)?)
        } else {
            None
        };

        Ok(Self {
            anchor,
            value,
            context,
            condition,
        })
    }

    /// Match the anchor and the value grammar on a single line
    ///
    /// Returns the hit spans with `index` left at 0.
    pub fn candidate(&self, line: &str) -> Option<Hit> {
        if !self.anchor.is_match(line) {
            return None;
        }
        let caps = self.value.captures(line)?;
        let name = caps.get(1)?;
        let value = caps.get(2)?;
        Some(Hit {
            index: 0,
            name_start: name.start(),
            name_end: name.end(),
            value_start: value.start(),
            value_end: value.end(),
        })
    }

    /// Scan backward from `index` for the context line that qualifies it
    ///
    /// The nearest context line decides: if it fails the equality
    /// condition the candidate is rejected without looking further back.
    /// Each qualifying context line consumes one occurrence from `record`.
    pub fn context_established<S: AsRef<str>>(
        &self,
        lines: &[S],
        index: usize,
        record: &mut ResolutionRecord,
    ) -> bool {
        let start = index.saturating_sub(CONTEXT_WINDOW - 1);
        for j in (start..=index).rev() {
            let line = lines[j].as_ref();
            if !self.context.is_match(line) {
                continue;
            }
            if let Some(condition) = &self.condition {
                if !condition.is_match(line) {
                    return false;
                }
            }
            if record.take_occurrence() {
                return true;
            }
        }
        false
    }

    /// Find the line encoding the record's parameter
    ///
    /// Marks the record found at the first selected line. In safe mode the
    /// scan continues to the end of the file to catch a second selection.
    pub fn locate<S: AsRef<str>>(
        &self,
        lines: &[S],
        record: &mut ResolutionRecord,
        mode: SearchMode,
    ) -> Resolution {
        let mut first: Option<Hit> = None;
        for (index, line) in lines.iter().enumerate() {
            let Some(span) = self.candidate(line.as_ref()) else {
                continue;
            };
            if !self.context_established(lines, index, record) {
                continue;
            }
            let hit = Hit { index, ..span };
            if let Some(first) = first {
                return Resolution::Ambiguous { first, second: hit };
            }
            record.found = true;
            record.line_number = Some(hit.line_number());
            first = Some(hit);
            if mode == SearchMode::Fast {
                break;
            }
        }
        match first {
            Some(hit) => Resolution::Found(hit),
            None => Resolution::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DEFAULT_CONTEXT_PATTERN;

    fn testcase(name: &str, anchor: &str) -> ParameterDescriptor {
        ParameterDescriptor::new(name, anchor, DEFAULT_CONTEXT_PATTERN).with_condition("TESTCASE", "19")
    }

    fn run(desc: &ParameterDescriptor, lines: &[&str], mode: SearchMode) -> (Resolution, ResolutionRecord) {
        let locator = Locator::compile(desc).unwrap();
        let mut record = ResolutionRecord::for_read(desc);
        let res = locator.locate(lines, &mut record, mode);
        (res, record)
    }

    fn fortran_block() -> Vec<String> {
        let mut lines: Vec<String> = (0..39).map(|i| format!("c filler {}", i)).collect();
        lines.push("c(TESTCASE == 19)".to_string()); // line 40
        lines.push("      implicit none".to_string());
        lines.push("      parameter (n = 128, m = 64)".to_string()); // line 42
        lines
    }

    #[test]
    fn resolves_token_below_matching_testcase() {
        let lines = fortran_block();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let (res, record) = run(&testcase("n", "parameter"), &refs, SearchMode::Safe);
        let Resolution::Found(hit) = res else {
            panic!("expected a hit, got {:?}", res)
        };
        assert_eq!(hit.line_number(), 42);
        assert_eq!(hit.value(&lines[41]), "128");
        assert!(record.found);
        assert_eq!(record.line_number, Some(42));
    }

    #[test]
    fn second_token_on_same_line() {
        let lines = fortran_block();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let (res, _) = run(&testcase("m", "parameter"), &refs, SearchMode::Safe);
        let Resolution::Found(hit) = res else {
            panic!("expected a hit")
        };
        assert_eq!(hit.value(&lines[41]), "64");
    }

    #[test]
    fn nearest_context_line_failing_condition_rejects() {
        let lines = [
            "c(TESTCASE == 19)",
            "      parameter (n = 1)",
            "c(TESTCASE == 7)",
            "      parameter (n = 2)",
        ];
        let (res, _) = run(&testcase("n", "parameter"), &lines, SearchMode::Safe);
        let Resolution::Found(hit) = res else {
            panic!("expected a hit")
        };
        assert_eq!(hit.index, 1);
    }

    #[test]
    fn no_context_line_in_window_rejects() {
        let mut lines = vec!["c(TESTCASE == 19)".to_string()];
        lines.extend((0..CONTEXT_WINDOW).map(|_| "c".to_string()));
        lines.push("      parameter (n = 3)".to_string());
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let (res, record) = run(&testcase("n", "parameter"), &refs, SearchMode::Safe);
        assert_eq!(res, Resolution::NotFound);
        assert!(!record.found);
    }

    #[test]
    fn context_line_at_window_edge_still_counts() {
        let mut lines = vec!["c(TESTCASE == 19)".to_string()];
        lines.extend((0..CONTEXT_WINDOW - 2).map(|_| "c".to_string()));
        lines.push("      parameter (n = 3)".to_string());
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let (res, _) = run(&testcase("n", "parameter"), &refs, SearchMode::Safe);
        assert!(matches!(res, Resolution::Found(hit) if hit.index == CONTEXT_WINDOW - 1));
    }

    #[test]
    fn name_inside_longer_identifier_is_not_a_match() {
        let lines = ["c(TESTCASE == 19)", "      parameter (ndx00=5.)"];
        let (res, _) = run(&testcase("dx00", "parameter"), &lines, SearchMode::Safe);
        assert_eq!(res, Resolution::NotFound);
    }

    #[test]
    fn anchor_must_start_the_line() {
        let lines = ["c(TESTCASE == 19)", "      x = 1 ! parameter (n = 5)"];
        let (res, _) = run(&testcase("n", "parameter"), &lines, SearchMode::Safe);
        assert_eq!(res, Resolution::NotFound);
    }

    #[test]
    fn occurrence_selects_nth_qualifying_context_across_candidates() {
        let lines = [
            "#HELPER LINE",
            "set    NNP = 4",
            "#HELPER LINE",
            "set    NNP = 8",
        ];
        let first = ParameterDescriptor::new("NNP", "set    NNP", "#HELPER LINE").with_occurrence(1);
        let second = first.clone().with_occurrence(2);

        let (res, _) = run(&first, &lines, SearchMode::Safe);
        assert!(matches!(res, Resolution::Found(hit) if hit.index == 1));

        let (res, record) = run(&second, &lines, SearchMode::Safe);
        assert!(matches!(res, Resolution::Found(hit) if hit.index == 3));
        assert_eq!(record.remaining_occurrences(), Some(0));
    }

    #[test]
    fn occurrence_counts_context_lines_within_one_window() {
        let lines = ["#HELPER LINE", "#HELPER LINE", "set    NNP 4"];
        let desc = ParameterDescriptor::new("NNP", "set    NNP", "#HELPER LINE").with_occurrence(2);
        let (res, _) = run(&desc, &lines, SearchMode::Safe);
        assert!(matches!(res, Resolution::Found(hit) if hit.index == 2));
    }

    #[test]
    fn safe_mode_reports_two_qualifying_lines() {
        let lines = [
            "c(TESTCASE == 19)",
            "      parameter (n = 1)",
            "c(TESTCASE == 19)",
            "      parameter (n = 2)",
        ];
        let (res, _) = run(&testcase("n", "parameter"), &lines, SearchMode::Safe);
        let Resolution::Ambiguous { first, second } = res else {
            panic!("expected ambiguity")
        };
        assert_eq!((first.line_number(), second.line_number()), (2, 4));
    }

    #[test]
    fn fast_mode_stops_at_first() {
        let lines = [
            "c(TESTCASE == 19)",
            "      parameter (n = 1)",
            "c(TESTCASE == 19)",
            "      parameter (n = 2)",
        ];
        let (res, _) = run(&testcase("n", "parameter"), &lines, SearchMode::Fast);
        assert!(matches!(res, Resolution::Found(hit) if hit.index == 1));
    }

    #[test]
    fn whole_line_value_is_rest_of_line() {
        let lines = ["#HELPER LINE", "setenv DIR /Net/Groups/run"];
        let desc = ParameterDescriptor::new("DIR", "setenv DIR /Net", "#HELPER LINE").whole_line();
        let (res, _) = run(&desc, &lines, SearchMode::Safe);
        let Resolution::Found(hit) = res else {
            panic!("expected a hit")
        };
        assert_eq!(hit.value(lines[1]), " /Net/Groups/run");
    }

    #[test]
    fn literals_with_regex_metacharacters_are_escaped() {
        let lines = ["!HELPER LINE", "        zo(i,j) = 0.1"];
        let desc = ParameterDescriptor::new("zo(i,j)", "zo(i,j)", "!HELPER LINE");
        let (res, _) = run(&desc, &lines, SearchMode::Safe);
        let Resolution::Found(hit) = res else {
            panic!("expected a hit")
        };
        assert_eq!(hit.value(lines[1]), "0.1");
    }

    #[test]
    fn invalid_context_pattern_is_reported() {
        let desc = ParameterDescriptor::new("n", "parameter", "(unclosed");
        let err = Locator::compile(&desc).unwrap_err();
        assert!(matches!(err, LocateError::InvalidPattern { ref key, .. } if key == "n"));
    }
}
