//! Declarative descriptor catalogs
//!
//! A deployment describes its parameters in YAML instead of Rust. Entries
//! that omit a context pattern inherit the deployment's [`ContextDefaults`];
//! entries with their own pattern and no explicit condition match on the
//! pattern alone.
//!
//! ```yaml
//! common:
//!   - name: NNP
//!     key: bgc_NNP
//!     anchor: "set    NNP"
//!     context: "#HELPER LINE"
//!     occurrence: 1
//! testcases:
//!   "19":
//!     - { name: dx00, anchor: "parameter ", numeric: true }
//! ```

use super::registry::DescriptorRegistry;
use super::types::ParameterDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Catalog compiled into the binary (EULAG `sunCAR30506.csh` layout)
pub const BUILTIN_CATALOG: &str = include_str!("default_catalog.yaml");

/// Section pattern used when an entry names none
pub const DEFAULT_CONTEXT_PATTERN: &str = r"[^ ]+\s*\(\s*TESTCASE \s*==.*";

/// Condition key used when an entry names no context pattern
pub const DEFAULT_CONTEXT_KEY: &str = "TESTCASE";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Unknown testcase: {0}")]
    UnknownTestcase(String),

    #[error("Invalid context pattern for {key}: {message}")]
    InvalidPattern { key: String, message: String },
}

/// Deployment-wide context used by entries without their own pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDefaults {
    pub pattern: String,
    pub key: Option<String>,
    pub value: Option<String>,
}

impl ContextDefaults {
    /// The usual `c(TESTCASE == <testcase>)` section marker
    pub fn for_testcase(testcase: impl Into<String>) -> Self {
        Self {
            pattern: DEFAULT_CONTEXT_PATTERN.to_string(),
            key: Some(DEFAULT_CONTEXT_KEY.to_string()),
            value: Some(testcase.into()),
        }
    }
}

/// One catalog line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub anchor: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub context_key: Option<String>,
    #[serde(default)]
    pub context_value: Option<String>,
    #[serde(default)]
    pub occurrence: Option<u32>,
    #[serde(default)]
    pub whole_line: bool,
    #[serde(default)]
    pub numeric: bool,
}

impl CatalogEntry {
    fn to_descriptor(&self, defaults: &ContextDefaults) -> ParameterDescriptor {
        let (pattern, key, value) = match &self.context {
            Some(pattern) if *pattern != defaults.pattern => (
                pattern.clone(),
                self.context_key.clone(),
                self.context_value.clone(),
            ),
            _ => (
                defaults.pattern.clone(),
                self.context_key.clone().or_else(|| defaults.key.clone()),
                self.context_value.clone().or_else(|| defaults.value.clone()),
            ),
        };
        ParameterDescriptor {
            key: self.key.clone().unwrap_or_else(|| self.name.clone()),
            anchor: self.anchor.clone(),
            name: self.name.clone(),
            context_pattern: pattern,
            context_key: key,
            context_value: value,
            occurrence: self.occurrence,
            whole_line: self.whole_line,
            numeric: self.numeric,
        }
    }
}

/// A parsed catalog file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub common: Vec<CatalogEntry>,
    #[serde(default)]
    pub testcases: BTreeMap<String, Vec<CatalogEntry>>,
}

impl Catalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Build a registry from the common entries plus those of `testcase`
    ///
    /// Context patterns are compiled once here so a bad catalog fails at
    /// startup rather than mid-session.
    pub fn build(
        &self,
        defaults: &ContextDefaults,
        testcase: Option<&str>,
    ) -> Result<DescriptorRegistry, CatalogError> {
        let specific: &[CatalogEntry] = match testcase {
            Some(tc) => self
                .testcases
                .get(tc)
                .ok_or_else(|| CatalogError::UnknownTestcase(tc.to_string()))?,
            None => &[],
        };

        let mut registry = DescriptorRegistry::new();
        for entry in self.common.iter().chain(specific) {
            let descriptor = entry.to_descriptor(defaults);
            if let Err(e) = regex_lite::Regex::new(&descriptor.context_pattern) {
                return Err(CatalogError::InvalidPattern {
                    key: descriptor.key,
                    message: e.to_string(),
                });
            }
            registry.register(descriptor);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r##"
common:
  - name: NNP
    key: bgc_NNP
    anchor: "set    NNP"
    context: "#HELPER LINE"
    occurrence: 1
testcases:
  "19":
    - name: dx00
      anchor: "parameter "
      numeric: true
    - name: nspc
      anchor: "parameter "
      context: "!HELPER LINE"
      context_key: MARK
      context_value: "1"
"##;

    #[test]
    fn custom_context_drops_default_condition() {
        let cat = Catalog::from_yaml(SMALL).unwrap();
        let reg = cat.build(&ContextDefaults::for_testcase("19"), Some("19")).unwrap();
        let nnp = reg.get("bgc_NNP").unwrap();
        assert_eq!(nnp.name, "NNP");
        assert_eq!(nnp.context_pattern, "#HELPER LINE");
        assert!(!nnp.has_condition());
        assert_eq!(nnp.occurrence, Some(1));
    }

    #[test]
    fn entry_without_context_inherits_defaults() {
        let cat = Catalog::from_yaml(SMALL).unwrap();
        let reg = cat.build(&ContextDefaults::for_testcase("19"), Some("19")).unwrap();
        let dx = reg.get("dx00").unwrap();
        assert_eq!(dx.context_pattern, DEFAULT_CONTEXT_PATTERN);
        assert_eq!(dx.context_key.as_deref(), Some("TESTCASE"));
        assert_eq!(dx.context_value.as_deref(), Some("19"));
        assert!(dx.numeric);
    }

    #[test]
    fn explicit_condition_survives_custom_context() {
        let cat = Catalog::from_yaml(SMALL).unwrap();
        let reg = cat.build(&ContextDefaults::for_testcase("19"), Some("19")).unwrap();
        let nspc = reg.get("nspc").unwrap();
        assert_eq!(nspc.context_key.as_deref(), Some("MARK"));
        assert_eq!(nspc.context_value.as_deref(), Some("1"));
    }

    #[test]
    fn unknown_testcase_is_rejected() {
        let cat = Catalog::from_yaml(SMALL).unwrap();
        let err = cat.build(&ContextDefaults::for_testcase("7"), Some("7")).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTestcase(ref t) if t == "7"));
    }

    #[test]
    fn without_testcase_only_common_entries_load() {
        let cat = Catalog::from_yaml(SMALL).unwrap();
        let reg = cat.build(&ContextDefaults::for_testcase("19"), None).unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn bad_context_pattern_fails_the_build() {
        let yaml = "common:\n  - { name: x, anchor: y, context: \"(unclosed\" }\n";
        let cat = Catalog::from_yaml(yaml).unwrap();
        let err = cat.build(&ContextDefaults::for_testcase("19"), None).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPattern { ref key, .. } if key == "x"));
    }

    #[test]
    fn builtin_catalog_parses_and_builds() {
        let cat = Catalog::builtin().unwrap();
        let reg = cat.build(&ContextDefaults::for_testcase("19"), Some("19")).unwrap();
        assert!(reg.contains("bgc_NNP"));
        assert!(reg.contains("levante_DIR"));
        assert!(reg.contains("LC0_chmflx1"));
        assert!(reg.get("levante_DIR").unwrap().whole_line);
        assert_eq!(reg.get("ibcx").unwrap().occurrence, Some(2));
    }
}
