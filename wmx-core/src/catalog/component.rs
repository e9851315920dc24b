//! Catalog component records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry in a component's release history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentVersion {
    pub version: String,
    pub release_date: DateTime<Utc>,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub compatibility: Vec<String>,
}

/// Component author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentAuthor {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

/// An installable marketplace component
///
/// `name` doubles as the install directory name, so it must be a single
/// filesystem-safe path segment (see [`Component::has_safe_name`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,

    /// Source repository
    pub repository_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Directory inside the repository holding the component, if not the root
    #[serde(default)]
    pub subpath: Option<String>,

    pub version: String,
    #[serde(default)]
    pub versions: Vec<ComponentVersion>,
    pub author: ComponentAuthor,
    #[serde(default = "default_license")]
    pub license: String,

    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub screenshot_urls: Vec<String>,
    #[serde(default)]
    pub demo_url: Option<String>,

    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,

    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default = "default_wavemaker_version")]
    pub wavemaker_version: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_license() -> String {
    "MIT".to_string()
}

fn default_wavemaker_version() -> String {
    ">=11.0.0".to_string()
}

impl Component {
    /// Whether `name` can be used verbatim as one directory component
    pub fn has_safe_name(&self) -> bool {
        let name = self.name.as_str();
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\')
            && !name.contains('\0')
    }

    /// Search summary shape
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "display_name": self.display_name,
            "description": self.description,
            "category": self.category,
            "tags": self.tags,
            "version": self.version,
            "author": self.author.name,
            "rating": self.rating,
            "downloads": self.downloads,
            "repository_url": self.repository_url,
        })
    }

    /// Truncate description to first line
    pub fn short_description(&self) -> &str {
        self.description
            .lines()
            .next()
            .unwrap_or(&self.description)
            .trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component_named(name: &str) -> Component {
        let yaml = format!(
            r#"
id: test
name: "{name}"
display_name: Test
description: Test component
category: Input
repository_url: https://example.com/test.git
version: 1.0.0
author:
  name: Tester
created_at: "2024-01-01T00:00:00Z"
updated_at: "2024-01-01T00:00:00Z"
"#
        );
        serde_yaml_ng::from_str(&yaml).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let component = component_named("Test");
        assert_eq!(component.branch, "main");
        assert_eq!(component.license, "MIT");
        assert!(component.subpath.is_none());
        assert!(component.tags.is_empty());
    }

    #[test]
    fn test_safe_names() {
        assert!(component_named("DataTable").has_safe_name());
        assert!(component_named("data-table_2").has_safe_name());
        assert!(!component_named("").has_safe_name());
        assert!(!component_named("..").has_safe_name());
        assert!(!component_named("a/b").has_safe_name());
        assert!(!component_named("a\\\\b").has_safe_name());
    }
}
