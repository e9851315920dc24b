//! Component structure validation
//!
//! Scores a directory against the WMX packaging rules. Every rule runs on
//! every call so the report is complete; nothing here returns an error.
//! Unreadable files and malformed descriptors become issues or warnings in
//! the [`ValidationResult`].
//!
//! Rule groups:
//! - mandatory artifacts (`index.ts`, `wmconfig.json`, `icon.svg`)
//! - descriptor content (required keys, version grammar, recommended keys)
//! - entry-point heuristics
//! - icon checks
//! - tree hygiene (artifact directories, file counts)

mod result;

pub use result::{Artifact, ValidationResult};

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// Keys every descriptor must define with a non-blank value
pub const REQUIRED_DESCRIPTOR_FIELDS: &[&str] =
    &["name", "displayName", "version", "description", "category"];

/// Keys that only produce suggestions when absent
pub const RECOMMENDED_DESCRIPTOR_FIELDS: &[&str] =
    &["author", "license", "tags", "dependencies", "reactNativeVersion"];

/// Files that only produce suggestions when absent
pub const RECOMMENDED_FILES: &[(&str, &str)] = &[
    ("README.md", "Component documentation"),
    ("CHANGELOG.md", "Version history"),
    ("LICENSE", "License file"),
    ("demo.tsx", "Component demo/example page"),
    (
        "package.json",
        "NPM package configuration (if using external dependencies)",
    ),
    ("types.ts", "TypeScript type definitions"),
];

/// Directories that must never ship inside a component
pub const FORBIDDEN_DIRECTORIES: &[&str] =
    &["node_modules", ".git", "dist", "build", "android", "ios"];

/// App-level React Native config files that do not belong in a component
const APP_CONFIG_FILES: &[&str] = &["metro.config.js", "babel.config.js"];

/// Tokens suggesting a React Native component
const RN_PATTERNS: &[&str] = &[
    "react-native",
    "view",
    "text",
    "touchableopacity",
    "component",
    "props",
];

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\d+\.\d+\.\d+(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?$",
    )
    .expect("semver pattern is valid")
});

static RN_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[><=~^]*\d+\.\d+\.\d+$").expect("version range pattern is valid"));

/// Whether `version` follows `MAJOR.MINOR.PATCH[-pre][+build]`
pub fn is_semver(version: &str) -> bool {
    SEMVER.is_match(version)
}

/// Structure validator with tunable thresholds
#[derive(Debug, Clone)]
pub struct StructureValidator {
    /// Icons above this many bytes produce a warning
    pub icon_size_limit: u64,
    /// Trees with more files than this produce a warning
    pub file_count_ceiling: usize,
    /// Trees with more TypeScript files than this produce a warning
    pub typescript_file_ceiling: usize,
}

impl Default for StructureValidator {
    fn default() -> Self {
        Self {
            icon_size_limit: 10 * 1024,
            file_count_ceiling: 100,
            typescript_file_ceiling: 20,
        }
    }
}

impl StructureValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `directory`
    ///
    /// `strict` selects publishing mode; advisory mode (used by the
    /// installer) runs the same rules but skips suggestions.
    pub fn validate(&self, directory: &Path, strict: bool) -> ValidationResult {
        let display_path = directory.display().to_string();

        if !directory.is_dir() {
            let mut result = ValidationResult::new("Unknown".to_string(), display_path, strict);
            result.fail(format!(
                "Component directory not found: {}",
                directory.display()
            ));
            result.structure_valid = false;
            return result;
        }

        let component_name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown".to_string());
        let mut result = ValidationResult::new(component_name, display_path, strict);

        self.check_required_files(directory, &mut result);

        if result.has_artifact(Artifact::Descriptor) {
            self.check_descriptor(directory, &mut result);
        }
        if result.has_artifact(Artifact::EntryPoint) {
            self.check_entry_point(directory, &mut result);
        }
        if result.has_artifact(Artifact::Icon) {
            self.check_icon(directory, &mut result);
        }

        self.check_recommended_files(directory, &mut result);
        self.check_tree(directory, &mut result);

        tracing::debug!(
            "Validated {}: {} issue(s), {} warning(s), marketplace_ready={}",
            result.component_path,
            result.issues.len(),
            result.warnings.len(),
            result.marketplace_ready()
        );

        result
    }

    fn check_required_files(&self, directory: &Path, result: &mut ValidationResult) {
        for artifact in Artifact::ALL {
            let present = directory.join(artifact.file_name()).is_file();
            result
                .requirements_met
                .insert(artifact.file_name().to_string(), present);

            if !present {
                result.fail(format!(
                    "Missing required file: {} ({})",
                    artifact.file_name(),
                    artifact.description()
                ));
            }
        }
    }

    fn check_descriptor(&self, directory: &Path, result: &mut ValidationResult) {
        let path = directory.join(Artifact::Descriptor.file_name());

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                result.fail(format!("Error reading wmconfig.json: {e}"));
                return;
            }
        };

        let metadata: serde_json::Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                result.fail(format!("Invalid JSON in wmconfig.json: {e}"));
                return;
            }
        };

        let Some(fields) = metadata.as_object() else {
            result.fail("wmconfig.json must contain a JSON object");
            result.metadata = Some(metadata);
            return;
        };

        for field in REQUIRED_DESCRIPTOR_FIELDS {
            match fields.get(*field) {
                None => result.fail(format!("Missing required field in wmconfig.json: {field}")),
                Some(value) if is_blank(value) => {
                    result.fail(format!("Empty required field in wmconfig.json: {field}"))
                }
                Some(_) => {}
            }
        }

        match fields.get("version") {
            Some(serde_json::Value::String(version)) if !is_semver(version) => {
                result.warn(format!(
                    "Version '{version}' should follow semantic versioning (e.g., 1.0.0)"
                ));
            }
            Some(value) if !value.is_string() && !value.is_null() => {
                result.warn(format!(
                    "Version {value} should be a string following semantic versioning (e.g., 1.0.0)"
                ));
            }
            _ => {}
        }

        for field in RECOMMENDED_DESCRIPTOR_FIELDS {
            if !fields.contains_key(*field) {
                result.suggest(format!("Consider adding '{field}' to wmconfig.json"));
            }
        }
        if !fields.contains_key("type") {
            result.suggest(
                "Consider adding 'type' field to wmconfig.json (e.g., 'component', 'widget')",
            );
        }
        if !fields.contains_key("properties") {
            result.suggest("Consider adding 'properties' configuration for component props");
        }

        if let Some(rn_version) = fields.get("reactNativeVersion") {
            let valid = rn_version
                .as_str()
                .map(|v| RN_VERSION.is_match(v))
                .unwrap_or(false);
            if !valid {
                result.warn(format!(
                    "React Native version {rn_version} format should be like '>=0.72.0'"
                ));
            }
        }

        result.metadata = Some(metadata);
    }

    fn check_entry_point(&self, directory: &Path, result: &mut ValidationResult) {
        let path = directory.join(Artifact::EntryPoint.file_name());

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                result.warn(format!("Could not validate index.ts content: {e}"));
                return;
            }
        };

        if content.trim().is_empty() {
            result.fail("index.ts appears to be empty");
            return;
        }

        let lower = content.to_lowercase();

        if !lower.contains("export") {
            result.warn("index.ts should have at least one export statement");
        }
        if !lower.contains("react") {
            result.warn("index.ts should import React");
        }
        if !RN_PATTERNS.iter().any(|p| lower.contains(p)) {
            result.warn("index.ts doesn't seem to follow React Native component patterns");
        }
        let imports_framework = [
            "from 'react'",
            "from 'react-native'",
            "from \"react\"",
            "from \"react-native\"",
        ]
        .iter()
        .any(|stmt| lower.contains(stmt));
        if !imports_framework {
            result.warn("Consider importing React and React Native components");
        }
    }

    fn check_icon(&self, directory: &Path, result: &mut ValidationResult) {
        let path = directory.join(Artifact::Icon.file_name());

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                result.warn(format!("Could not validate icon.svg: {e}"));
                return;
            }
        };

        if content.trim().is_empty() {
            result.fail("icon.svg appears to be empty");
            return;
        }

        if !content.trim_start().starts_with("<svg") {
            result.warn("icon.svg should start with <svg> tag");
        }
        if !content.contains("</svg>") {
            result.warn("icon.svg should end with </svg> tag");
        }

        match std::fs::metadata(&path) {
            Ok(meta) if meta.len() > self.icon_size_limit => {
                result.warn(format!(
                    "icon.svg is {} bytes. Consider optimizing for smaller file size.",
                    meta.len()
                ));
            }
            Ok(_) => {}
            Err(e) => result.warn(format!("Could not read icon.svg size: {e}")),
        }
    }

    fn check_recommended_files(&self, directory: &Path, result: &mut ValidationResult) {
        for (file_name, description) in RECOMMENDED_FILES {
            if !directory.join(file_name).exists() {
                result.suggest(format!("Add {file_name}: {description}"));
            }
        }
    }

    fn check_tree(&self, directory: &Path, result: &mut ValidationResult) {
        let mut total_files = 0usize;
        let mut typescript_files = 0usize;
        let mut unreadable = 0usize;

        for entry in WalkDir::new(directory).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => {
                    unreadable += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            total_files += 1;

            let is_typescript = entry
                .path()
                .extension()
                .map(|ext| ext == "ts" || ext == "tsx")
                .unwrap_or(false);
            if is_typescript {
                typescript_files += 1;
            }
        }

        if unreadable > 0 {
            result.warn(format!(
                "Could not fully validate component structure: {unreadable} entries were unreadable"
            ));
        }

        if typescript_files == 0 {
            result.warn("No TypeScript files found besides index.ts");
        } else if typescript_files > self.typescript_file_ceiling {
            result.warn(format!(
                "Component has {typescript_files} TypeScript files. Consider reducing complexity."
            ));
        }

        for dir_name in FORBIDDEN_DIRECTORIES {
            if directory.join(dir_name).exists() {
                result.warn(format!(
                    "{dir_name} directory found. This should not be included in published components."
                ));
            }
        }

        if total_files == 0 {
            result.fail("Component directory is empty");
            result.structure_valid = false;
        } else if total_files > self.file_count_ceiling {
            result.warn(format!(
                "Component has {total_files} files. Consider reducing complexity."
            ));
        }

        for file_name in APP_CONFIG_FILES {
            if directory.join(file_name).exists() {
                result.warn(format!(
                    "{file_name} found. This is typically not needed for WMX components."
                ));
            }
        }
    }
}

/// Null, blank strings, `false` and empty containers count as missing
fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::String(s) => s.trim().is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
        serde_json::Value::Number(_) => false,
    }
}
