//! Validation verdicts

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// The three files every component must ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// `index.ts`
    EntryPoint,
    /// `wmconfig.json`
    Descriptor,
    /// `icon.svg`
    Icon,
}

impl Artifact {
    pub const ALL: [Artifact; 3] = [Artifact::EntryPoint, Artifact::Descriptor, Artifact::Icon];

    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::EntryPoint => "index.ts",
            Artifact::Descriptor => "wmconfig.json",
            Artifact::Icon => "icon.svg",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Artifact::EntryPoint => "Component entry file (React Native implementation)",
            Artifact::Descriptor => "WMX component configuration file",
            Artifact::Icon => "Component icon (SVG format)",
        }
    }
}

/// Verdict for one component directory
///
/// `marketplace_ready` is not stored: it is always derived from the other
/// fields by [`ValidationResult::marketplace_ready`], including when the
/// result is serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Every hard requirement passed
    pub valid: bool,
    pub component_name: String,
    pub component_path: String,
    /// Blocking problems
    pub issues: Vec<String>,
    /// Non-blocking problems
    pub warnings: Vec<String>,
    /// Mandatory artifact file name -> present
    pub requirements_met: BTreeMap<String, bool>,
    pub suggested_improvements: Vec<String>,
    /// Tree-level checks passed (non-empty, readable)
    pub structure_valid: bool,
    /// Parsed descriptor, when it was valid JSON
    pub metadata: Option<serde_json::Value>,
    /// Mode the validation ran in
    pub strict: bool,
}

impl ValidationResult {
    pub(crate) fn new(component_name: String, component_path: String, strict: bool) -> Self {
        Self {
            valid: true,
            component_name,
            component_path,
            issues: Vec::new(),
            warnings: Vec::new(),
            requirements_met: BTreeMap::new(),
            suggested_improvements: Vec::new(),
            structure_valid: true,
            metadata: None,
            strict,
        }
    }

    /// Record a blocking problem; flips `valid`
    pub(crate) fn fail(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
        self.valid = false;
    }

    pub(crate) fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub(crate) fn suggest(&mut self, suggestion: impl Into<String>) {
        if self.strict {
            self.suggested_improvements.push(suggestion.into());
        }
    }

    /// Whether a mandatory artifact was found
    pub fn has_artifact(&self, artifact: Artifact) -> bool {
        self.requirements_met
            .get(artifact.file_name())
            .copied()
            .unwrap_or(false)
    }

    /// Ready to publish: valid, no issues, sound structure, all artifacts present
    pub fn marketplace_ready(&self) -> bool {
        self.valid
            && self.issues.is_empty()
            && self.structure_valid
            && Artifact::ALL.iter().all(|a| self.has_artifact(*a))
    }

    /// Descriptor string field, if present
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
    }
}

/// Serialized form, with the derived readiness flag
#[derive(Serialize)]
struct ValidationReport<'a> {
    valid: bool,
    component_name: &'a str,
    component_path: &'a str,
    issues: &'a [String],
    warnings: &'a [String],
    requirements_met: &'a BTreeMap<String, bool>,
    suggested_improvements: &'a [String],
    marketplace_ready: bool,
    structure_valid: bool,
    metadata: &'a Option<serde_json::Value>,
    strict: bool,
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ValidationReport {
            valid: self.valid,
            component_name: &self.component_name,
            component_path: &self.component_path,
            issues: &self.issues,
            warnings: &self.warnings,
            requirements_met: &self.requirements_met,
            suggested_improvements: &self.suggested_improvements,
            marketplace_ready: self.marketplace_ready(),
            structure_valid: self.structure_valid,
            metadata: &self.metadata,
            strict: self.strict,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ValidationResult {
        let mut result = ValidationResult::new("c".into(), "/tmp/c".into(), true);
        for artifact in Artifact::ALL {
            result
                .requirements_met
                .insert(artifact.file_name().to_string(), true);
        }
        result
    }

    #[test]
    fn test_ready_when_everything_passes() {
        assert!(complete().marketplace_ready());
    }

    #[test]
    fn test_each_condition_blocks_readiness() {
        let mut r = complete();
        r.fail("boom");
        assert!(!r.marketplace_ready());

        let mut r = complete();
        r.structure_valid = false;
        assert!(!r.marketplace_ready());

        let mut r = complete();
        r.requirements_met.insert("icon.svg".to_string(), false);
        assert!(!r.marketplace_ready());

        let mut r = complete();
        r.valid = false;
        assert!(!r.marketplace_ready());
    }

    #[test]
    fn test_warnings_do_not_block_readiness() {
        let mut r = complete();
        r.warn("minor");
        assert!(r.marketplace_ready());
    }

    #[test]
    fn test_serialized_readiness_is_derived() {
        let mut r = complete();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["marketplace_ready"], true);

        r.fail("boom");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["marketplace_ready"], false);
        assert_eq!(json["valid"], false);
    }

    #[test]
    fn test_suggestions_only_in_strict_mode() {
        let mut advisory = ValidationResult::new("c".into(), "/tmp/c".into(), false);
        advisory.suggest("Add README.md");
        assert!(advisory.suggested_improvements.is_empty());

        let mut strict = complete();
        strict.suggest("Add README.md");
        assert_eq!(strict.suggested_improvements.len(), 1);
    }
}
